//! Chart-ready series built from adapter tables.
//!
//! Nothing here draws; each type carries exactly what a plotting front end
//! needs (labels, values, colours) and can be exported as a [`Table`].

use crate::domain::{cell_f64, Table};
use crate::error::{Result, ScrapeError};
use serde::Serialize;
use serde_json::Value;

/// Bordeaux-to-white ramp, lightest first.
pub const GRANATE_BLANCO: [&str; 14] = [
    "#FFFFFF", "#fff5f5", "#ffe0e0", "#ffd1d1", "#ffb8b8", "#ffadad", "#d34a60", "#cd324a",
    "#b92d42", "#a8293d", "#a0273a", "#942435", "#83202f", "#6f1b28",
];

/// Grey-to-teal ramp.
pub const SOC: [&str; 17] = [
    "#d0d6d4", "#c5d0cd", "#bbcac7", "#b0c3c1", "#a6bdbb", "#9bb7b5", "#91b1af", "#86aaa8",
    "#7ca4a2", "#719e9c", "#679896", "#5c9190", "#528b8a", "#478583", "#3d7f7d", "#327877",
    "#287271",
];

const SLICE_COLORS: [&str; 3] = ["#2a6f97", "#588b8b", "#8d0801"];
const TEXT_COLORS: [&str; 3] = ["#FFFFFF", "#000000", "#FFFFFF"];

const SHORT_PARAMS: &[(&str, &str)] = &[
    ("npxG: Goles esperados (xG) sin contar penaltis", "npxG"),
    ("npxG: Non-Penalty xG", "npxG"),
];

fn short_param(name: &str) -> String {
    let name = SHORT_PARAMS
        .iter()
        .find(|(long, _)| *long == name)
        .map_or(name, |(_, short)| *short);
    let words: Vec<&str> = name.split(' ').collect();
    if words.len() > 2 {
        format!("{}\n{}", words[..2].join(" "), words[2..].join(" "))
    } else {
        name.to_string()
    }
}

/// Percentile pizza: one slice per statistic, coloured by the block of the
/// scouting report it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PizzaChart {
    pub params: Vec<String>,
    pub values: Vec<i64>,
    pub slice_colors: Vec<&'static str>,
    pub text_colors: Vec<&'static str>,
}

impl PizzaChart {
    /// Builds from a scouting report table: names in the first column,
    /// percentiles in the third, blocks separated by blank rows.
    pub fn from_percentiles(table: &Table) -> Result<Self> {
        let columns = table.columns();
        let (Some(name_col), Some(value_col)) = (columns.first(), columns.get(2)) else {
            return Err(ScrapeError::Parse("percentile table needs three columns".into()));
        };

        let mut chart = PizzaChart {
            params: Vec::new(),
            values: Vec::new(),
            slice_colors: Vec::new(),
            text_colors: Vec::new(),
        };
        let mut group = 0;
        let mut in_group = false;
        for row in table.rows() {
            let Some(name) = row.str(name_col).filter(|n| !n.is_empty()) else {
                if in_group {
                    group += 1;
                    in_group = false;
                }
                continue;
            };
            let value = row
                .f64(value_col)
                .ok_or_else(|| ScrapeError::Parse(format!("no percentile for {name}")))?;
            let slot = group.min(SLICE_COLORS.len() - 1);
            chart.params.push(short_param(name));
            chart.values.push(value as i64);
            chart.slice_colors.push(SLICE_COLORS[slot]);
            chart.text_colors.push(TEXT_COLORS[slot]);
            in_group = true;
        }
        Ok(chart)
    }

    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(["param", "value", "slice_color", "text_color"]);
        for i in 0..self.params.len() {
            table.push_row(vec![
                Value::from(self.params[i].as_str()),
                Value::from(self.values[i]),
                Value::from(self.slice_colors[i]),
                Value::from(self.text_colors[i]),
            ])?;
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotPoint {
    pub x: f64,
    pub y: f64,
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShotMap {
    pub shots: Vec<ShotPoint>,
}

impl ShotMap {
    /// Shots with both coordinates; rows without them are skipped.
    pub fn from_table(table: &Table, x: &str, y: &str, outcome: &str) -> Self {
        let shots = table
            .rows()
            .filter_map(|row| {
                Some(ShotPoint {
                    x: row.f64(x)?,
                    y: row.f64(y)?,
                    outcome: row.str(outcome).map(str::to_string),
                })
            })
            .collect();
        Self { shots }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Heatmap {
    pub points: Vec<(f64, f64)>,
}

impl Heatmap {
    pub fn from_table(table: &Table) -> Self {
        let points = table
            .rows()
            .filter_map(|row| Some((row.f64("x")?, row.f64("y")?)))
            .collect();
        Self { points }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumBar {
    pub minute: f64,
    pub value: f64,
    pub side: Side,
}

/// Momentum bars and, when the source reports them, the team colours used to
/// paint each side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Momentum {
    pub bars: Vec<MomentumBar>,
    pub home_color: Option<String>,
    pub away_color: Option<String>,
}

impl Momentum {
    /// Positive values are home pressure, negative ones away. Level minutes are dropped.
    pub fn from_table(table: &Table) -> Self {
        let bars = table
            .rows()
            .filter_map(|row| {
                let minute = row.f64("minute")?;
                let value = row.f64("value")?;
                let side = if value > 0.0 {
                    Side::Home
                } else if value < 0.0 {
                    Side::Away
                } else {
                    return None;
                };
                Some(MomentumBar { minute, value, side })
            })
            .collect();
        Self {
            bars,
            ..Self::default()
        }
    }

    pub fn with_colors(mut self, home: impl Into<String>, away: impl Into<String>) -> Self {
        self.home_color = Some(home.into());
        self.away_color = Some(away.into());
        self
    }

    pub fn color(&self, side: Side) -> Option<&str> {
        match side {
            Side::Home => self.home_color.as_deref(),
            Side::Away => self.away_color.as_deref(),
        }
    }

    /// One row per bar; `color` is null when no team colours are known.
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::new(["minute", "value", "side", "color"]);
        for bar in &self.bars {
            table.push_row(vec![
                Value::from(bar.minute),
                Value::from(bar.value),
                serde_json::to_value(bar.side)?,
                self.color(bar.side).map(Value::from).unwrap_or(Value::Null),
            ])?;
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketValuePoint {
    pub date: String,
    pub value: f64,
    pub club: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketValueTimeline {
    pub points: Vec<MarketValuePoint>,
}

impl MarketValueTimeline {
    /// From a market value history: `datum_mw` labels, `y` values, `verein` clubs.
    pub fn from_table(table: &Table) -> Self {
        let points = table
            .rows()
            .filter_map(|row| {
                Some(MarketValuePoint {
                    date: row.str("datum_mw")?.to_string(),
                    value: row.get("y").and_then(cell_f64)?,
                    club: row.str("verein").map(str::to_string),
                })
            })
            .collect();
        Self { points }
    }
}
