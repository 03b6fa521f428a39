use super::{str_at, SourceContext};
use crate::domain::validate::require_known_stat;
use crate::domain::{Page, Row, Table};
use crate::error::{Result, ScrapeError};
use serde_json::{Map, Value};

pub const INCIDENCES: &[&str] = &[
    "goals",
    "substitutions",
    "clearances",
    "cornerKicks",
    "correctPasses",
    "fouls",
    "incorrectPasses",
    "offsides",
    "redCards",
    "shots",
    "status",
    "stealings",
    "yellowCards",
    "throwIn",
    "goalkick",
    "nutmegs",
    "sombreroFlick",
    "penaltyShootout",
    "var",
];

const EVENTS: &str = "https://panorama.datafactory.la/html/v3/htmlCenter/data/deportes/futbol";

pub fn match_url(slug: &str, match_id: &str) -> String {
    format!("{EVENTS}/{slug}/events/{match_id}.json?t=172730124")
}

/// Rows of one incidence kind, keyed by incidence id.
fn incidence_records(payload: &Value, kind: &str) -> Result<Table> {
    require_known_stat("incidence_type", kind, INCIDENCES)?;
    let mut table = Table::default();
    let Some(incidences) = payload
        .pointer(&format!("/incidences/{kind}"))
        .and_then(Value::as_object)
    else {
        return Ok(table);
    };
    for (id, incidence) in incidences {
        let mut record = Map::new();
        record.insert("incidenceId".to_string(), Value::String(id.clone()));
        if let Some(fields) = incidence.as_object() {
            record.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        table.push_record(&record);
    }
    Ok(table)
}

/// Pitch coordinate on a 0–100 scale, mirrored in the second half so both
/// halves attack the same way.
fn scale(value: Option<f64>, half: Option<u64>, flip: bool) -> Value {
    let Some(v) = value else {
        return Value::Null;
    };
    let mut scaled = (v + 1.0) * 50.0;
    if half == Some(2) {
        scaled = 100.0 - scaled;
    }
    if flip {
        scaled = 100.0 - scaled;
    }
    serde_json::Number::from_f64(scaled).map_or(Value::Null, Value::Number)
}

/// Replaces `coord` with `x, y, endX, endY`. An incidence with coordinates
/// but no start point means the feed is incomplete.
fn parse_coordinates(table: Table, path: &str) -> Result<Table> {
    let incomplete = table.rows().any(|row| {
        row.get("coord")
            .is_some_and(|coord| !coord.is_null() && coord.get("1").is_none())
    });
    if incomplete || !table.has_column("coord") {
        return Err(ScrapeError::match_missing(path));
    }

    let point = |row: Row<'_>, end: &str, axis: &str, flip: bool| {
        let half = row.get("t").and_then(|t| t.get("half")).and_then(Value::as_u64);
        let value = row
            .get("coord")
            .and_then(|c| c.get(end))
            .and_then(|p| p.get(axis))
            .and_then(Value::as_f64);
        scale(value, half, flip)
    };
    Ok(table
        .derive_column("x", |row| point(row, "1", "x", false))
        .derive_column("y", |row| point(row, "1", "y", true))
        .derive_column("endX", |row| point(row, "2", "x", false))
        .derive_column("endY", |row| point(row, "2", "y", true))
        .drop_columns(&["coord"]))
}

fn parse_minutes(table: Table) -> Table {
    let clock = |row: Row<'_>, key: &str| {
        row.get("t")
            .and_then(|t| t.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    };
    table
        .derive_column("minute", |row| clock(row, "m"))
        .derive_column("seconds", |row| clock(row, "s"))
        .drop_columns(&["t"])
}

fn add_home_away(table: Table, payload: &Value) -> Table {
    let home_id = payload.pointer("/match/homeTeamId").cloned().unwrap_or(Value::Null);
    let home = str_at(payload, "/match/homeTeamName").unwrap_or_default().to_string();
    let away = str_at(payload, "/match/awayTeamName").unwrap_or_default().to_string();
    let is_home = |row: Row<'_>| row.get("team") == Some(&home_id);
    table
        .derive_column("teamName", |row| {
            Value::String(if is_home(row) { home.clone() } else { away.clone() })
        })
        .derive_column("home/away", |row| {
            Value::from(if is_home(row) { "home" } else { "away" })
        })
}

fn surname(payload: &Value, id: Option<&Value>) -> Value {
    let key = match id {
        Some(Value::Number(n)) => n.as_f64().map(|n| (n as i64).to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    key.and_then(|key| {
        payload
            .get("players")
            .and_then(|players| players.get(&key))
            .and_then(|player| player.pointer("/name/last"))
            .cloned()
    })
    .unwrap_or(Value::Null)
}

/// One incidence kind with normalized coordinates (when the kind has any),
/// match clock and team columns.
pub fn parse_incidence(payload: &Value, kind: &str, path: &str) -> Result<Table> {
    let mut table = incidence_records(payload, kind)?;
    if table.has_column("coord") {
        table = parse_coordinates(table, path)?;
    }
    Ok(add_home_away(parse_minutes(table), payload))
}

pub fn parse_passes(payload: &Value, all_passes: bool, path: &str) -> Result<Table> {
    let mut table = incidence_records(payload, "correctPasses")?;
    if all_passes {
        table.extend(incidence_records(payload, "incorrectPasses")?);
    }
    let table = parse_minutes(parse_coordinates(table, path)?)
        .derive_column("recvName", |row| surname(payload, row.get("recvId")))
        .derive_column("plyrName", |row| surname(payload, row.get("plyrId")));
    Ok(add_home_away(table, payload))
}

pub struct DataFactory {
    ctx: SourceContext,
}

impl DataFactory {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    pub fn match_url(&self, league: &str, match_id: &str) -> Result<String> {
        let entry = self.ctx.league(Page::DataFactory, league)?;
        Ok(match_url(entry.slug()?, match_id))
    }

    pub async fn incidence(&self, league: &str, match_id: &str, kind: &str) -> Result<Table> {
        require_known_stat("incidence_type", kind, INCIDENCES)?;
        let url = self.match_url(league, match_id)?;
        parse_incidence(&self.ctx.get_json(&url).await?, kind, &url)
    }

    pub async fn match_passes(
        &self,
        league: &str,
        match_id: &str,
        all_passes: bool,
    ) -> Result<Table> {
        let url = self.match_url(league, match_id)?;
        parse_passes(&self.ctx.get_json(&url).await?, all_passes, &url)
    }
}
