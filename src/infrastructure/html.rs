use crate::domain::Table;
use crate::error::{Result, ScrapeError};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static HEAD_ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("thead tr").unwrap());
static BODY_ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(e.to_string()))
}

/// How multi-row table headers become column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Keep only the bottom header row.
    #[default]
    Last,
    /// Join the group row and the bottom row as `Group_Column`.
    Joined,
}

/// Visible text of an element with whitespace collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The `src` of the first image in a cell, or its text when there is none.
pub fn text_or_image(element: ElementRef<'_>) -> String {
    element
        .select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string)
        .unwrap_or_else(|| text_of(element))
}

pub fn tables(document: &Html) -> Vec<ElementRef<'_>> {
    document.select(&TABLE).collect()
}

pub fn rows(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element.select(&ROWS).collect()
}

pub fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table.select(&BODY_ROWS).collect()
}

pub fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.select(&CELLS).collect()
}

pub fn data_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.select(&TD).collect()
}

pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element
        .value()
        .attr("class")
        .is_some_and(|c| c.split_whitespace().any(|c| c == class))
}

/// Text of every HTML comment in the document, in document order.
pub fn comments(document: &Html) -> Vec<String> {
    document
        .tree
        .values()
        .filter_map(|node| match node {
            Node::Comment(comment) => Some(comment.comment.to_string()),
            _ => None,
        })
        .collect()
}

fn expand_row(row: ElementRef<'_>) -> Vec<String> {
    let mut out = Vec::new();
    for cell in cells(row) {
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let text = text_of(cell);
        out.extend(std::iter::repeat(text).take(span));
    }
    out
}

fn build_columns(levels: &[Vec<String>], mode: HeaderMode) -> Vec<String> {
    let Some(last) = levels.last() else {
        return Vec::new();
    };
    let columns: Vec<String> = match (mode, levels.len()) {
        (HeaderMode::Joined, n) if n > 1 => last
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let group = levels[0].get(i).map(String::as_str).unwrap_or_default();
                if group.is_empty() {
                    column.clone()
                } else {
                    format!("{}_{}", group.replace(' ', ""), column.replace(' ', ""))
                }
            })
            .collect(),
        _ => last.clone(),
    };
    dedupe_names(columns)
}

/// Repeated names get a `.1`, `.2`, ... suffix so every column stays addressable.
fn dedupe_names(columns: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let mut name = column.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{column}.{n}");
            n += 1;
        }
        seen.push(name);
    }
    seen
}

fn is_repeated_header(row: ElementRef<'_>) -> bool {
    has_class(row, "thead") || has_class(row, "over_header")
}

/// Reads one `<table>` into a [`Table`]. Empty cells become nulls, as do the
/// missing trailing cells of rows narrower than the widest one.
pub fn read_table(table: ElementRef<'_>, mode: HeaderMode) -> Result<Table> {
    let mut levels: Vec<Vec<String>> = table.select(&HEAD_ROWS).map(expand_row).collect();
    let mut body = body_rows(table);

    if levels.is_empty() {
        let header_row = body.first().copied().filter(|row| {
            let cells = cells(*row);
            !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th")
        });
        if let Some(row) = header_row {
            levels.push(expand_row(row));
            body.remove(0);
        }
    }

    let mut columns = build_columns(&levels, mode);
    let width = body.iter().map(|r| cells(*r).len()).max().unwrap_or(0);
    while columns.len() < width {
        columns.push(columns.len().to_string());
    }

    let mut out = Table::new(columns);
    for row in body.into_iter().filter(|r| !is_repeated_header(*r)) {
        let mut values: Vec<Value> = cells(row)
            .into_iter()
            .map(|cell| {
                let text = text_of(cell);
                if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text)
                }
            })
            .collect();
        values.resize(out.columns().len(), Value::Null);
        out.push_row(values)?;
    }
    Ok(out)
}

/// Every table in a page, in document order.
pub fn read_tables(html: &str, mode: HeaderMode) -> Result<Vec<Table>> {
    let document = Html::parse_document(html);
    tables(&document)
        .into_iter()
        .map(|table| read_table(table, mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GROUPED: &str = r#"
        <table>
          <thead>
            <tr class="over_header"><th colspan="2"></th><th colspan="2">Playing Time</th></tr>
            <tr><th>Squad</th><th># Pl</th><th>MP</th><th>Min</th></tr>
          </thead>
          <tbody>
            <tr><th>Arsenal</th><td>24</td><td>38</td><td>3,420</td></tr>
            <tr class="thead"><th>Squad</th><th># Pl</th><th>MP</th><th>Min</th></tr>
            <tr><th>Chelsea</th><td></td><td>38</td><td>3,420</td></tr>
          </tbody>
        </table>"#;

    #[test]
    fn last_level_headers() {
        let tables = read_tables(GROUPED, HeaderMode::Last).unwrap();
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.columns(), ["Squad", "# Pl", "MP", "Min"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "Squad"), Some(&json!("Chelsea")));
        assert_eq!(table.get(1, "# Pl"), Some(&Value::Null));
    }

    #[test]
    fn joined_headers_keep_ungrouped_names() {
        let table = &read_tables(GROUPED, HeaderMode::Joined).unwrap()[0];
        assert_eq!(
            table.columns(),
            ["Squad", "# Pl", "PlayingTime_MP", "PlayingTime_Min"]
        );
    }

    #[test]
    fn headerless_table_uses_leading_th_row() {
        let html = "<table><tr><th>Position</th><th>Matches</th></tr>\
                    <tr><td>Centre-Forward</td><td>120</td></tr></table>";
        let table = &read_tables(html, HeaderMode::Last).unwrap()[0];
        assert_eq!(table.columns(), ["Position", "Matches"]);
        assert_eq!(table.get(0, "Matches"), Some(&json!("120")));
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let html = "<table><thead><tr><th>Club</th><th>Pts</th></tr></thead>\
                    <tbody><tr><td>Lanús</td></tr>\
                    <tr><td>Boca</td><td>40</td></tr></tbody></table>";
        let table = &read_tables(html, HeaderMode::Last).unwrap()[0];
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Pts"), Some(&Value::Null));
        assert_eq!(table.get(1, "Pts"), Some(&json!("40")));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        assert_eq!(
            dedupe_names(vec!["Gls".into(), "Ast".into(), "Gls".into()]),
            vec!["Gls", "Ast", "Gls.1"]
        );
    }

    #[test]
    fn comments_are_collected_in_order() {
        let document = Html::parse_document("<div><!-- first --><p>x</p><!-- second --></div>");
        assert_eq!(comments(&document), vec![" first ", " second "]);
    }

    #[test]
    fn image_cells_yield_src() {
        let document = Html::parse_fragment(
            r#"<table><tr><td><img src="https://img/crest.png"></td>
               <td> Lanús </td></tr></table>"#,
        );
        let row = rows(tables(&document)[0])[0];
        let values: Vec<String> = cells(row).into_iter().map(text_or_image).collect();
        assert_eq!(values, vec!["https://img/crest.png", "Lanús"]);
    }
}
