use crate::error::{Result, ScrapeError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// An ordered set of named columns over rows of JSON scalar cells.
///
/// Every adapter returns one of these. Columns keep the order in which they
/// were first seen and rows keep arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn str(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(cell_f64)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// Numeric value of a cell, accepting numbers stored as text.
pub fn cell_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from JSON records. Objects contribute their keys as
    /// columns; anything else lands in a single `value` column.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut table = Self::default();
        for record in records {
            match record {
                Value::Object(map) => table.push_record(map),
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other.clone());
                    table.push_record(&map);
                }
            }
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[index])
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    /// Appends a positional row. The row must have one cell per column.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ScrapeError::Parse(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn push_record(&mut self, record: &Map<String, Value>) {
        let indices: Vec<usize> = record.keys().map(|k| self.ensure_column(k)).collect();
        let mut row = vec![Value::Null; self.columns.len()];
        for (index, value) in indices.into_iter().zip(record.values()) {
            row[index] = value.clone();
        }
        self.rows.push(row);
    }

    pub fn rename(mut self, renames: &[(&str, &str)]) -> Self {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| *from == column.as_str()) {
                *column = to.to_string();
            }
        }
        self
    }

    pub fn rename_with(mut self, mut f: impl FnMut(&str) -> String) -> Self {
        for column in &mut self.columns {
            *column = f(column);
        }
        self
    }

    pub fn drop_columns(mut self, names: &[&str]) -> Self {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        self.columns = retain_by_mask(std::mem::take(&mut self.columns), &keep);
        self.rows = self
            .rows
            .into_iter()
            .map(|row| retain_by_mask(row, &keep))
            .collect();
        self
    }

    /// Keeps only the named columns, in the given order. Unknown names become empty columns.
    pub fn select(self, names: &[&str]) -> Self {
        let indices: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|i| i.map(|i| row[i].clone()).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        }
    }

    pub fn with_constant(self, name: &str, value: Value) -> Self {
        self.derive_column(name, |_| value.clone())
    }

    /// Adds (or overwrites) a column computed from each row.
    pub fn derive_column(mut self, name: &str, mut f: impl FnMut(Row<'_>) -> Value) -> Self {
        let values: Vec<Value> = self.rows().map(&mut f).collect();
        let index = self.ensure_column(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[index] = value;
        }
        self
    }

    pub fn insert_column(mut self, at: usize, name: &str, values: Vec<Value>) -> Self {
        let at = at.min(self.columns.len());
        self.columns.insert(at, name.to_string());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(at, values.next().unwrap_or(Value::Null));
        }
        self
    }

    pub fn map_column(mut self, name: &str, mut f: impl FnMut(&Value) -> Value) -> Self {
        if let Some(index) = self.column_index(name) {
            for row in &mut self.rows {
                row[index] = f(&row[index]);
            }
        }
        self
    }

    /// Replaces an object-valued column with one column per nested key.
    ///
    /// `renames` maps nested keys to output names. A nested key that clashes
    /// with an existing column is emitted as `<column>_<key>`.
    pub fn flatten_column(self, name: &str, renames: &[(&str, &str)]) -> Self {
        let Some(index) = self.column_index(name) else {
            return self;
        };
        let nested: Vec<Value> = self.rows.iter().map(|row| row[index].clone()).collect();
        let mut table = self.drop_columns(&[name]);
        let existing: Vec<String> = table.columns.clone();

        for (row_index, value) in nested.into_iter().enumerate() {
            let Value::Object(map) = value else {
                continue;
            };
            for (key, value) in map {
                let target = renames
                    .iter()
                    .find(|(from, _)| *from == key)
                    .map(|(_, to)| to.to_string())
                    .unwrap_or(key);
                let target = if existing.contains(&target) {
                    format!("{name}_{target}")
                } else {
                    target
                };
                let column = table.ensure_column(&target);
                table.rows[row_index][column] = value;
            }
        }
        table
    }

    /// Replaces an object column with a single nested field, keeping its position.
    pub fn pluck(self, name: &str, field: &str) -> Self {
        self.map_column(name, |value| value.get(field).cloned().unwrap_or(Value::Null))
    }

    pub fn filter_rows(mut self, mut keep: impl FnMut(Row<'_>) -> bool) -> Self {
        let columns = self.columns.clone();
        self.rows.retain(|values| {
            keep(Row {
                columns: &columns,
                values,
            })
        });
        self
    }

    /// Drops repeated rows, keeping the first occurrence.
    pub fn dedup(mut self) -> Self {
        let mut seen: Vec<Vec<Value>> = Vec::new();
        self.rows.retain(|row| {
            if seen.contains(row) {
                false
            } else {
                seen.push(row.clone());
                true
            }
        });
        self
    }

    /// Drops rows whose `keys` cells repeat an earlier row, keeping the first.
    pub fn dedup_by(mut self, keys: &[&str]) -> Self {
        let indices: Vec<Option<usize>> = keys.iter().map(|k| self.column_index(k)).collect();
        let mut seen: Vec<Vec<Value>> = Vec::new();
        self.rows.retain(|row| {
            let key: Vec<Value> = indices
                .iter()
                .map(|i| i.map(|i| row[i].clone()).unwrap_or(Value::Null))
                .collect();
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        self
    }

    /// Left join on pairs of `(left, right)` key columns.
    ///
    /// Each left row takes the cells of the first right row with equal keys,
    /// or nulls when none matches. Right key columns and right columns whose
    /// name is already present are not carried over.
    pub fn left_join(mut self, other: &Table, on: &[(&str, &str)]) -> Self {
        let left_keys: Vec<Option<usize>> =
            on.iter().map(|(l, _)| self.column_index(l)).collect();
        let right_keys: Vec<Option<usize>> =
            on.iter().map(|(_, r)| other.column_index(r)).collect();
        let carried: Vec<usize> = other
            .columns
            .iter()
            .enumerate()
            .filter(|(i, name)| !right_keys.contains(&Some(*i)) && !self.has_column(name))
            .map(|(i, _)| i)
            .collect();

        let key_of = |row: &[Value], indices: &[Option<usize>]| -> Vec<Value> {
            indices
                .iter()
                .map(|i| i.map(|i| row[i].clone()).unwrap_or(Value::Null))
                .collect()
        };
        let right: Vec<(Vec<Value>, &Vec<Value>)> = other
            .rows
            .iter()
            .map(|row| (key_of(row, &right_keys), row))
            .collect();

        for index in &carried {
            self.columns.push(other.columns[*index].clone());
        }
        for row in &mut self.rows {
            let key = key_of(row, &left_keys);
            let matched = right.iter().find(|(k, _)| *k == key).map(|(_, r)| *r);
            for index in &carried {
                row.push(matched.map(|r| r[*index].clone()).unwrap_or(Value::Null));
            }
        }
        self
    }

    /// Appends `other` below this table; columns are the union in first-seen order.
    pub fn extend(&mut self, other: Table) {
        let indices: Vec<usize> = other.columns.iter().map(|c| self.ensure_column(c)).collect();
        for values in other.rows {
            let mut row = vec![Value::Null; self.columns.len()];
            for (index, value) in indices.iter().zip(values) {
                row[*index] = value;
            }
            self.rows.push(row);
        }
    }

    pub fn concat(mut self, other: Table) -> Self {
        self.extend(other);
        self
    }

    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_text))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.to_records())?)?;
        Ok(())
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_keep_first_seen_column_order() {
        let records = json!([
            {"id": 1, "name": "Boca"},
            {"name": "River", "value": 3, "id": 2}
        ]);
        let table = Table::from_records(records.as_array().unwrap());
        assert_eq!(table.columns(), ["id", "name", "value"]);
        assert_eq!(table.get(0, "value"), Some(&Value::Null));
        assert_eq!(table.get(1, "id"), Some(&json!(2)));
    }

    #[test]
    fn flatten_renames_and_prefixes_clashes() {
        let records = json!([
            {"id": 10, "player": {"id": 7, "name": "Salah"}, "onGoalShot": {"x": 1.2, "y": 0.3}}
        ]);
        let table = Table::from_records(records.as_array().unwrap())
            .flatten_column("player", &[])
            .flatten_column("onGoalShot", &[("x", "goalMouthY"), ("y", "goalMouthZ")]);
        assert_eq!(
            table.columns(),
            ["id", "player_id", "name", "goalMouthY", "goalMouthZ"]
        );
        assert_eq!(table.get(0, "player_id"), Some(&json!(7)));
        assert_eq!(table.get(0, "goalMouthZ"), Some(&json!(0.3)));
    }

    #[test]
    fn extend_unions_columns_and_keeps_order() {
        let mut first = Table::new(["a", "b"]);
        first.push_row(vec![json!(1), json!(2)]).unwrap();
        let mut second = Table::new(["b", "c"]);
        second.push_row(vec![json!(3), json!(4)]).unwrap();
        first.extend(second);
        assert_eq!(first.columns(), ["a", "b", "c"]);
        assert_eq!(first.get(1, "a"), Some(&Value::Null));
        assert_eq!(first.get(1, "b"), Some(&json!(3)));
    }

    #[test]
    fn select_drop_and_insert() {
        let mut table = Table::new(["Rk", "Player", "Matches"]);
        table.push_row(vec![json!("1"), json!("Messi"), json!("Matches")]).unwrap();
        let table = table
            .drop_columns(&["Matches"])
            .insert_column(1, "Comp", vec![json!("MLS")]);
        assert_eq!(table.columns(), ["Rk", "Comp", "Player"]);
        let selected = table.select(&["Player", "Missing"]);
        assert_eq!(selected.get(0, "Player"), Some(&json!("Messi")));
        assert_eq!(selected.get(0, "Missing"), Some(&Value::Null));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut table = Table::new(["a"]);
        for v in [1, 2, 1, 3, 2] {
            table.push_row(vec![json!(v)]).unwrap();
        }
        let values: Vec<_> = table.dedup().column("a").unwrap().into_iter().cloned().collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn rows_must_match_the_column_count() {
        let mut table = Table::new(["a", "b"]);
        assert!(matches!(
            table.push_row(vec![json!(1), json!(2), json!(3)]),
            Err(ScrapeError::Parse(_))
        ));
        assert!(table.push_row(vec![json!(1)]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn dedup_by_compares_only_the_keys() {
        let mut table = Table::new(["Player", "Squad", "Gls"]);
        table.push_row(vec![json!("Bou"), json!("Lanús"), json!(5)]).unwrap();
        table.push_row(vec![json!("Bou"), json!("Lanús"), json!(6)]).unwrap();
        table.push_row(vec![json!("Bou"), json!("Boca"), json!(1)]).unwrap();
        let table = table.dedup_by(&["Player", "Squad"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Gls"), Some(&json!(5)));
        assert_eq!(table.get(1, "Squad"), Some(&json!("Boca")));
    }

    #[test]
    fn left_join_keeps_left_rows_and_appends_right_columns() {
        let mut left = Table::new(["Player", "stats_Squad", "stats_Gls"]);
        left.push_row(vec![json!("Bou"), json!("Lanús"), json!(5)]).unwrap();
        left.push_row(vec![json!("Soler"), json!("Lanús"), json!(0)]).unwrap();
        let mut right = Table::new(["Player", "shooting_Squad", "shooting_Sh", "stats_Gls"]);
        right.push_row(vec![json!("Bou"), json!("Boca"), json!(9), json!(99)]).unwrap();
        right.push_row(vec![json!("Bou"), json!("Lanús"), json!(30), json!(99)]).unwrap();

        let joined = left.left_join(
            &right,
            &[("Player", "Player"), ("stats_Squad", "shooting_Squad")],
        );

        assert_eq!(joined.columns(), ["Player", "stats_Squad", "stats_Gls", "shooting_Sh"]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.get(0, "shooting_Sh"), Some(&json!(30)));
        assert_eq!(joined.get(0, "stats_Gls"), Some(&json!(5)));
        assert_eq!(joined.get(1, "shooting_Sh"), Some(&Value::Null));
    }

    #[test]
    fn csv_export_writes_header_and_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut table = Table::new(["name", "value", "missing"]);
        table.push_row(vec![json!("Lanús"), json!(1.5), Value::Null]).unwrap();
        table.write_csv(&path).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, "name,value,missing\nLanús,1.5,\n");
    }
}
