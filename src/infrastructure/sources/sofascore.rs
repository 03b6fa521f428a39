use super::{array_at, required_array, SourceContext};
use crate::domain::validate::require_known_stat;
use crate::domain::{Page, Table};
use crate::error::{Result, ScrapeError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::info;

const API: &str = "https://api.sofascore.com/api/v1";

/// Upper bound on league statistics pages (100 players each).
pub const MAX_STAT_PAGES: usize = 20;

pub const ACCUMULATIONS: &[&str] = &["total", "per90", "perMatch"];

pub const POSITIONS: &[(&str, &str)] = &[
    ("Goalkeepers", "G"),
    ("Defenders", "D"),
    ("Midfielders", "M"),
    ("Forwards", "F"),
];

pub const LEAGUE_STATS_FIELDS: &[&str] = &[
    "goals",
    "yellowCards",
    "redCards",
    "groundDuelsWon",
    "groundDuelsWonPercentage",
    "aerialDuelsWon",
    "aerialDuelsWonPercentage",
    "successfulDribbles",
    "successfulDribblesPercentage",
    "tackles",
    "assists",
    "accuratePassesPercentage",
    "totalDuelsWon",
    "totalDuelsWonPercentage",
    "minutesPlayed",
    "wasFouled",
    "fouls",
    "dispossessed",
    "possesionLost",
    "appearances",
    "started",
    "saves",
    "cleanSheets",
    "savedShotsFromInsideTheBox",
    "savedShotsFromOutsideTheBox",
    "goalsConcededInsideTheBox",
    "goalsConcededOutsideTheBox",
    "highClaims",
    "successfulRunsOut",
    "punches",
    "runsOut",
    "accurateFinalThirdPasses",
    "bigChancesCreated",
    "accuratePasses",
    "keyPasses",
    "accurateCrosses",
    "accurateCrossesPercentage",
    "accurateLongBalls",
    "accurateLongBallsPercentage",
    "interceptions",
    "clearances",
    "dribbledPast",
    "bigChancesMissed",
    "totalShots",
    "shotsOnTarget",
    "blockedShots",
    "goalConversionPercentage",
    "hitWoodwork",
    "offsides",
    "expectedGoals",
    "errorLeadToGoal",
    "errorLeadToShot",
    "passToAssist",
];

const SIDES: [&str; 2] = ["home", "away"];

/// Match id from a SofaScore match link (`.../team-a-team-b/xYz#id:11352380`).
pub fn match_id(match_url: &str) -> &str {
    match_url.rsplit(':').next().unwrap_or(match_url)
}

/// Filter value for the position query parameter, e.g. `G~D~M~F`.
pub fn positions_filter<S: AsRef<str>>(selected: &[S]) -> Result<String> {
    let names: Vec<&str> = POSITIONS.iter().map(|(name, _)| *name).collect();
    let mut codes = Vec::with_capacity(selected.len());
    for position in selected {
        let position = position.as_ref();
        require_known_stat("selected_positions", position, &names)?;
        if let Some((_, code)) = POSITIONS.iter().find(|(name, _)| *name == position) {
            codes.push(*code);
        }
    }
    Ok(codes.join("~"))
}

pub fn league_stats_url(
    league_id: &str,
    season_id: &str,
    offset: usize,
    accumulation: &str,
    positions: &str,
) -> String {
    format!(
        "{API}/unique-tournament/{league_id}/season/{season_id}/statistics\
         ?limit=100&order=-rating&offset={offset}&accumulation={accumulation}\
         &fields={}&filters=position.in.{positions}",
        LEAGUE_STATS_FIELDS.join("%2C")
    )
}

pub fn parse_team_names(payload: &Value, match_url: &str) -> Result<(String, String)> {
    let name = |side: &str| {
        payload
            .pointer(&format!("/event/{side}Team/name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::match_missing(match_url))
    };
    Ok((name("home")?, name("away")?))
}

pub fn parse_momentum(payload: &Value, match_url: &str) -> Result<Table> {
    let points =
        array_at(payload, "/graphPoints").ok_or_else(|| ScrapeError::match_missing(match_url))?;
    Ok(Table::from_records(points))
}

/// Shot map with the nested `player` and `playerCoordinates` objects spread
/// into top-level columns.
pub fn parse_shotmap(payload: &Value, match_url: &str) -> Result<Table> {
    let shots = array_at(payload, "/shotmap").ok_or_else(|| ScrapeError::match_missing(match_url))?;
    Ok(Table::from_records(shots)
        .flatten_column("player", &[])
        .flatten_column("playerCoordinates", &[]))
}

/// One page of league statistics, with `player` and `team` reduced to their
/// names. The flag is true on the last page.
pub fn parse_stats_page(payload: &Value) -> Result<(Table, bool)> {
    let results = required_array(payload, "/results", "league statistics")?;
    let table = Table::from_records(results)
        .pluck("player", "name")
        .pluck("team", "name");
    let last = match (payload.get("page"), payload.get("pages")) {
        (Some(page), Some(pages)) => page == pages,
        _ => true,
    };
    Ok((table, last))
}

pub fn parse_player_ids(payload: &Value) -> BTreeMap<String, u64> {
    let mut ids = BTreeMap::new();
    for side in SIDES {
        for item in array_at(payload, &format!("/{side}/players")).into_iter().flatten() {
            let name = item.pointer("/player/name").and_then(Value::as_str);
            let id = item.pointer("/player/id").and_then(Value::as_u64);
            if let (Some(name), Some(id)) = (name, id) {
                ids.insert(name.to_string(), id);
            }
        }
    }
    ids
}

/// Per-player line-up statistics for one side.
pub fn parse_lineup_side(
    payload: &Value,
    side: &str,
    team: &str,
    match_url: &str,
) -> Result<Table> {
    let players = array_at(payload, &format!("/{side}/players"))
        .ok_or_else(|| ScrapeError::match_missing(match_url))?;
    if !players.iter().any(|p| p.get("statistics").is_some()) {
        return Err(ScrapeError::match_missing(match_url));
    }

    let mut table = Table::default();
    for item in players {
        let player = item
            .get("player")
            .and_then(Value::as_object)
            .ok_or_else(|| ScrapeError::match_missing(match_url))?;

        let mut record: Map<String, Value> = player.clone();
        for key in ["shirtNumber", "jerseyNumber", "position", "substitute"] {
            record.insert(key.to_string(), item.get(key).cloned().unwrap_or(Value::Null));
        }
        if let Some(stats) = item.get("statistics").and_then(Value::as_object) {
            for (key, value) in stats {
                let key = if record.contains_key(key) {
                    format!("statistics_{key}")
                } else {
                    key.clone()
                };
                record.insert(key, value.clone());
            }
        }
        record.insert(
            "captain".to_string(),
            item.get("captain").cloned().unwrap_or(Value::Null),
        );
        record.insert("team".to_string(), Value::String(team.to_string()));
        table.push_record(&record);
    }
    Ok(table)
}

pub fn parse_average_positions_side(
    payload: &Value,
    side: &str,
    team: &str,
    match_url: &str,
) -> Result<Table> {
    let players = array_at(payload, &format!("/{side}"))
        .ok_or_else(|| ScrapeError::match_missing(match_url))?;
    Ok(Table::from_records(players)
        .flatten_column("player", &[])
        .with_constant("team", Value::String(team.to_string())))
}

pub fn parse_heatmap(payload: &Value, match_url: &str) -> Result<Table> {
    let points =
        array_at(payload, "/heatmap").ok_or_else(|| ScrapeError::match_missing(match_url))?;
    Ok(Table::from_records(points))
}

pub fn parse_season_heatmap(payload: &Value, player_id: &str) -> Result<Table> {
    let points =
        array_at(payload, "/points").ok_or_else(|| ScrapeError::player_missing(player_id))?;
    Ok(Table::from_records(points))
}

pub struct Sofascore {
    ctx: SourceContext,
}

impl Sofascore {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    pub async fn match_data(&self, match_url: &str) -> Result<Value> {
        self.ctx
            .get_json(&format!("{API}/event/{}", match_id(match_url)))
            .await
    }

    pub async fn team_names(&self, match_url: &str) -> Result<(String, String)> {
        let payload = self.match_data(match_url).await?;
        parse_team_names(&payload, match_url)
    }

    pub async fn match_momentum(&self, match_url: &str) -> Result<Table> {
        let url = format!("{API}/event/{}/graph", match_id(match_url));
        parse_momentum(&self.ctx.get_json(&url).await?, match_url)
    }

    pub async fn match_shotmap(&self, match_url: &str) -> Result<Table> {
        let url = format!("{API}/event/{}/shotmap", match_id(match_url));
        parse_shotmap(&self.ctx.get_json(&url).await?, match_url)
    }

    /// Every player statistic from a league/season page, one request per 100 players.
    pub async fn league_player_stats<S: AsRef<str>>(
        &self,
        league: &str,
        season: &str,
        accumulation: &str,
        positions: &[S],
    ) -> Result<Table> {
        require_known_stat("accumulation", accumulation, ACCUMULATIONS)?;
        let positions = positions_filter(positions)?;
        let (entry, season_id) = self.ctx.league_season(Page::Sofascore, league, season)?;
        let (league_id, season_id) = (entry.id.to_string(), season_id.to_string());

        let mut table = Table::default();
        for page in 0..MAX_STAT_PAGES {
            let url =
                league_stats_url(&league_id, &season_id, page * 100, accumulation, &positions);
            let (rows, last) = parse_stats_page(&self.ctx.get_json(&url).await?)?;
            info!("Fetched {} players from page {}", rows.len(), page + 1);
            table.extend(rows);
            if last {
                info!("End of the pages");
                break;
            }
        }
        Ok(table)
    }

    pub async fn lineups(&self, match_url: &str) -> Result<Value> {
        self.ctx
            .get_json(&format!("{API}/event/{}/lineups", match_id(match_url)))
            .await
    }

    /// Home and away player statistics for a match.
    pub async fn players_match_stats(&self, match_url: &str) -> Result<(Table, Table)> {
        let (home, away) = self.team_names(match_url).await?;
        let payload = self.lineups(match_url).await?;
        Ok((
            parse_lineup_side(&payload, "home", &home, match_url)?,
            parse_lineup_side(&payload, "away", &away, match_url)?,
        ))
    }

    pub async fn players_average_positions(&self, match_url: &str) -> Result<(Table, Table)> {
        let (home, away) = self.team_names(match_url).await?;
        let url = format!("{API}/event/{}/average-positions", match_id(match_url));
        let payload = self.ctx.get_json(&url).await?;
        Ok((
            parse_average_positions_side(&payload, "home", &home, match_url)?,
            parse_average_positions_side(&payload, "away", &away, match_url)?,
        ))
    }

    pub async fn player_ids(&self, match_url: &str) -> Result<BTreeMap<String, u64>> {
        Ok(parse_player_ids(&self.lineups(match_url).await?))
    }

    /// Touch coordinates of one player in a match. `player` is the SofaScore name.
    pub async fn player_heatmap(&self, match_url: &str, player: &str) -> Result<Table> {
        let ids = self.player_ids(match_url).await?;
        let player_id = ids
            .get(player)
            .ok_or_else(|| ScrapeError::player_missing(player))?;
        let url = format!("{API}/event/{}/player/{player_id}/heatmap", match_id(match_url));
        parse_heatmap(&self.ctx.get_json(&url).await?, match_url)
    }

    pub async fn player_season_heatmap(
        &self,
        league: &str,
        season: &str,
        player_id: &str,
    ) -> Result<Table> {
        let (entry, season_id) = self.ctx.league_season(Page::Sofascore, league, season)?;
        let url = format!(
            "{API}/player/{player_id}/unique-tournament/{}/season/{season_id}/heatmap/overall",
            entry.id
        );
        parse_season_heatmap(&self.ctx.get_json(&url).await?, player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_id_is_last_colon_segment() {
        assert_eq!(
            match_id("https://www.sofascore.com/lanus-boca-juniors/rUbsVob#id:11352380"),
            "11352380"
        );
        assert_eq!(match_id("11352380"), "11352380");
    }

    #[test]
    fn positions_map_to_codes_and_reject_unknown() {
        assert_eq!(
            positions_filter(&["Goalkeepers", "Defenders", "Midfielders", "Forwards"]).unwrap(),
            "G~D~M~F"
        );
        assert_eq!(positions_filter(&["Forwards"]).unwrap(), "F");
        assert!(matches!(
            positions_filter(&["Wingers"]),
            Err(ScrapeError::Validation(_))
        ));
    }

    #[test]
    fn missing_shotmap_is_match_missing_data() {
        let err = parse_shotmap(&json!({"error": {"code": 404}}), "url#id:1").unwrap_err();
        assert!(matches!(err, ScrapeError::MatchMissingData { .. }));
    }

    #[test]
    fn shotmap_spreads_player_and_coordinates() {
        let payload = json!({"shotmap": [{
            "id": 99,
            "shotType": "goal",
            "player": {"id": 7, "name": "Walter Bou"},
            "playerCoordinates": {"x": 8.1, "y": 49.0, "z": 0}
        }]});
        let table = parse_shotmap(&payload, "m").unwrap();
        assert_eq!(
            table.columns(),
            ["id", "shotType", "player_id", "name", "x", "y", "z"]
        );
        assert_eq!(table.get(0, "name"), Some(&json!("Walter Bou")));
    }

    #[test]
    fn stats_page_reduces_player_and_team_to_names() {
        let payload = json!({
            "results": [{"player": {"name": "A", "id": 1}, "team": {"name": "Lanús"}, "goals": 3}],
            "page": 1,
            "pages": 2
        });
        let (table, last) = parse_stats_page(&payload).unwrap();
        assert!(!last);
        assert_eq!(table.columns(), ["player", "team", "goals"]);
        assert_eq!(table.get(0, "player"), Some(&json!("A")));
        assert_eq!(table.get(0, "team"), Some(&json!("Lanús")));
    }

    #[test]
    fn lineup_side_requires_statistics() {
        let payload = json!({"home": {"players": [
            {"player": {"name": "A", "id": 1}, "position": "G"}
        ]}});
        let err = parse_lineup_side(&payload, "home", "Lanús", "m").unwrap_err();
        assert!(matches!(err, ScrapeError::MatchMissingData { .. }));
    }

    #[test]
    fn lineup_side_flattens_player_and_statistics() {
        let payload = json!({"away": {"players": [
            {"player": {"name": "A", "id": 1}, "shirtNumber": 9, "jerseyNumber": "9",
             "position": "F", "substitute": false, "statistics": {"goals": 1, "minutesPlayed": 90},
             "captain": true},
            {"player": {"name": "B", "id": 2}, "shirtNumber": 22, "jerseyNumber": "22",
             "position": "M", "substitute": true, "statistics": {}}
        ]}});
        let table = parse_lineup_side(&payload, "away", "Boca", "m").unwrap();
        assert_eq!(
            table.columns(),
            ["name", "id", "shirtNumber", "jerseyNumber", "position", "substitute",
             "goals", "minutesPlayed", "captain", "team"]
        );
        assert_eq!(table.get(1, "goals"), Some(&Value::Null));
        assert_eq!(table.get(1, "team"), Some(&json!("Boca")));
    }

    #[test]
    fn player_ids_cover_both_sides() {
        let payload = json!({
            "home": {"players": [{"player": {"name": "A", "id": 1}}]},
            "away": {"players": [{"player": {"name": "B", "id": 2}}]}
        });
        let ids = parse_player_ids(&payload);
        assert_eq!(ids.get("A"), Some(&1));
        assert_eq!(ids.get("B"), Some(&2));
    }

    #[test]
    fn missing_season_heatmap_is_player_missing_data() {
        let err = parse_season_heatmap(&json!({}), "12345").unwrap_err();
        assert!(matches!(err, ScrapeError::PlayerMissingData { .. }));
    }
}
