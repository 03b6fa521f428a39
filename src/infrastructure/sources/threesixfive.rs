use super::{array_at, required_array, str_at, SourceContext};
use crate::domain::{Page, Table};
use crate::error::{Result, ScrapeError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const API: &str = "https://webws.365scores.com/web";
const QUERY: &str = "appTypeId=5&langId=29&timezoneName=America/Buenos_Aires&userCountryId=382";

static MATCHUP_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+-\d+-\d+)").unwrap());
static GAME_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"id=(\d+)").unwrap());

/// Matchup and game ids embedded in a 365Scores match link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchIds {
    pub matchup_id: Option<String>,
    pub game_id: Option<String>,
}

pub fn match_ids(match_url: &str) -> MatchIds {
    let capture = |re: &Regex| {
        re.captures(match_url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    MatchIds {
        matchup_id: capture(&MATCHUP_ID),
        game_id: capture(&GAME_ID),
    }
}

pub fn game_url(ids: &MatchIds) -> String {
    format!(
        "{API}/game/?{QUERY}&gameId={}&matchupId={}&topBookmaker=14",
        ids.game_id.as_deref().unwrap_or_default(),
        ids.matchup_id.as_deref().unwrap_or_default()
    )
}

/// Every leaderboard of the stats page, flattened to
/// `id, name, positionName, value, stat`.
pub fn parse_top_players(payload: &Value) -> Result<Table> {
    let blocks = required_array(payload, "/stats", "league stats")?;
    let mut table = Table::new(["id", "name", "positionName", "value", "stat"]);
    for block in blocks {
        let stat = block.get("name").cloned().unwrap_or(Value::Null);
        for row in array_at(block, "/rows").into_iter().flatten() {
            let entity = |key: &str| {
                row.pointer(&format!("/entity/{key}"))
                    .cloned()
                    .unwrap_or(Value::Null)
            };
            table.push_row(vec![
                entity("id"),
                entity("name"),
                entity("positionName"),
                row.pointer("/stats/0/value").cloned().unwrap_or(Value::Null),
                stat.clone(),
            ])?;
        }
    }
    Ok(table)
}

fn game<'a>(payload: &'a Value, match_url: &str) -> Result<&'a Value> {
    payload
        .get("game")
        .ok_or_else(|| ScrapeError::match_missing(match_url))
}

pub fn parse_shotmap(game: &Value, match_url: &str) -> Result<Table> {
    let events = array_at(game, "/chartEvents/events")
        .ok_or_else(|| ScrapeError::match_missing(match_url))?;
    Ok(Table::from_records(events))
}

pub fn parse_players_info(game: &Value, match_url: &str) -> Result<Table> {
    let members =
        array_at(game, "/members").ok_or_else(|| ScrapeError::match_missing(match_url))?;
    Ok(Table::from_records(members))
}

pub fn parse_team_names(game: &Value, match_url: &str) -> Result<(String, String)> {
    let name = |side: &str| {
        str_at(game, &format!("/{side}Competitor/name"))
            .map(str::to_string)
            .ok_or_else(|| ScrapeError::match_missing(match_url))
    };
    Ok((name("home")?, name("away")?))
}

pub fn parse_general_match_stats(game: &Value, match_url: &str) -> Result<Table> {
    let mut table = Table::new(["name", "categoryName", "value", "team"]);
    for side in ["home", "away"] {
        let team = str_at(game, &format!("/{side}Competitor/name")).unwrap_or_default();
        let stats = array_at(game, &format!("/{side}Competitor/statistics"))
            .ok_or_else(|| ScrapeError::match_missing(match_url))?;
        for stat in stats {
            let field = |key: &str| stat.get(key).cloned().unwrap_or(Value::Null);
            table.push_row(vec![
                field("name"),
                field("categoryName"),
                field("value"),
                Value::String(team.to_string()),
            ])?;
        }
    }
    Ok(table)
}

/// Heatmap image link of a player, looked up by name in the match members
/// and by id in either line-up.
pub fn parse_player_heatmap_url(game: &Value, player: &str) -> Result<String> {
    let member_id = array_at(game, "/members")
        .into_iter()
        .flatten()
        .find(|m| m.get("name").and_then(Value::as_str) == Some(player))
        .and_then(|m| m.get("id"))
        .ok_or_else(|| ScrapeError::player_missing(player))?;

    ["home", "away"]
        .iter()
        .flat_map(|side| {
            array_at(game, &format!("/{side}Competitor/lineups/members"))
                .into_iter()
                .flatten()
        })
        .find(|m| m.get("id") == Some(member_id))
        .and_then(|m| str_at(m, "/heatMap"))
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::player_missing(player))
}

pub struct ThreeSixFiveScores {
    ctx: SourceContext,
}

impl ThreeSixFiveScores {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    pub async fn league_top_players_stats(&self, league: &str) -> Result<Table> {
        let entry = self.ctx.league(Page::ThreeSixFiveScores, league)?;
        let url = format!(
            "{API}/stats/?{QUERY}&competitions={}&competitors=&withSeasons=true",
            entry.id
        );
        parse_top_players(&self.ctx.get_json(&url).await?)
    }

    /// The `game` object of a match.
    pub async fn match_data(&self, match_url: &str) -> Result<Value> {
        let payload = self.ctx.get_json(&game_url(&match_ids(match_url))).await?;
        game(&payload, match_url).cloned()
    }

    pub async fn match_shotmap(&self, match_url: &str) -> Result<Table> {
        parse_shotmap(&self.match_data(match_url).await?, match_url)
    }

    pub async fn players_info(&self, match_url: &str) -> Result<Table> {
        parse_players_info(&self.match_data(match_url).await?, match_url)
    }

    pub async fn team_names(&self, match_url: &str) -> Result<(String, String)> {
        parse_team_names(&self.match_data(match_url).await?, match_url)
    }

    pub async fn general_match_stats(&self, match_url: &str) -> Result<Table> {
        parse_general_match_stats(&self.match_data(match_url).await?, match_url)
    }

    pub async fn player_heatmap_url(&self, match_url: &str, player: &str) -> Result<String> {
        parse_player_heatmap_url(&self.match_data(match_url).await?, player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = concat!(
        "https://www.365scores.com/es/football/match/liga-profesional-de-futbol-72",
        "/lanus-boca-juniors-867-869-72#id=4043467"
    );

    #[test]
    fn ids_come_from_the_link() {
        assert_eq!(
            match_ids(URL),
            MatchIds {
                matchup_id: Some("867-869-72".to_string()),
                game_id: Some("4043467".to_string()),
            }
        );
        assert_eq!(
            match_ids("https://www.365scores.com/"),
            MatchIds { matchup_id: None, game_id: None }
        );
    }

    #[test]
    fn game_url_carries_both_ids() {
        let url = game_url(&match_ids(URL));
        assert!(url.contains("gameId=4043467&matchupId=867-869-72"));
    }

    #[test]
    fn top_players_flatten_every_block() {
        let payload = json!({"stats": [
            {"name": "Goles", "rows": [
                {"entity": {"id": 1, "name": "Bou", "positionName": "Delantero"},
                 "stats": [{"value": "9"}]},
                {"entity": {"id": 2, "name": "Cavani", "positionName": "Delantero"},
                 "stats": [{"value": "7"}]}
            ]},
            {"name": "Asistencias", "rows": [
                {"entity": {"id": 3, "name": "Moreno", "positionName": "Volante"},
                 "stats": [{"value": "5"}]}
            ]}
        ]});
        let table = parse_top_players(&payload).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2, "stat"), Some(&json!("Asistencias")));
        assert_eq!(table.get(1, "value"), Some(&json!("7")));
    }

    #[test]
    fn general_stats_tag_each_team() {
        let game = json!({
            "homeCompetitor": {"name": "Lanús", "statistics": [
                {"name": "Tiros", "categoryName": "Ataque", "value": "12"}
            ]},
            "awayCompetitor": {"name": "Boca", "statistics": [
                {"name": "Tiros", "categoryName": "Ataque", "value": "8"}
            ]}
        });
        let table = parse_general_match_stats(&game, URL).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "team"), Some(&json!("Boca")));
    }

    #[test]
    fn missing_game_is_match_missing_data() {
        assert!(matches!(
            game(&json!({}), URL),
            Err(ScrapeError::MatchMissingData { .. })
        ));
        assert!(matches!(
            parse_shotmap(&json!({}), URL),
            Err(ScrapeError::MatchMissingData { .. })
        ));
    }

    #[test]
    fn heatmap_url_is_found_by_name() {
        let game = json!({
            "members": [{"id": 10, "name": "Bou"}, {"id": 11, "name": "Cavani"}],
            "homeCompetitor": {"lineups": {"members": [
                {"id": 10, "heatMap": "https://img/10.png"}
            ]}},
            "awayCompetitor": {"lineups": {"members": [
                {"id": 11, "heatMap": "https://img/11.png"}
            ]}}
        });
        assert_eq!(parse_player_heatmap_url(&game, "Cavani").unwrap(), "https://img/11.png");
        assert!(matches!(
            parse_player_heatmap_url(&game, "Nobody"),
            Err(ScrapeError::PlayerMissingData { .. })
        ));
    }
}
