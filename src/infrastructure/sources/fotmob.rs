use super::{array_at, required_array, str_at, SourceContext};
use crate::domain::validate::require_known_stat;
use crate::domain::{Page, Table};
use crate::error::{Result, ScrapeError};
use serde_json::{Map, Value};
use tracing::info;

const API: &str = "https://www.fotmob.com/api";

pub const TABLE_KINDS: &[&str] = &["all", "home", "away", "form", "xg"];

pub const PLAYER_STATS: &[&str] = &[
    "goals",
    "goal_assist",
    "_goals_and_goal_assist",
    "rating",
    "goals_per_90",
    "expected_goals",
    "expected_goals_per_90",
    "expected_goalsontarget",
    "ontarget_scoring_att",
    "total_scoring_att",
    "accurate_pass",
    "big_chance_created",
    "total_att_assist",
    "accurate_long_balls",
    "expected_assists",
    "expected_assists_per_90",
    "_expected_goals_and_expected_assists_per_90",
    "won_contest",
    "big_chance_missed",
    "penalty_won",
    "won_tackle",
    "interception",
    "effective_clearance",
    "outfielder_block",
    "penalty_conceded",
    "poss_won_att_3rd",
    "clean_sheet",
    "_save_percentage",
    "saves",
    "_goals_prevented",
    "goals_conceded",
    "fouls",
    "yellow_card",
    "red_card",
];

pub const TEAM_STATS: &[&str] = &[
    "rating_team",
    "goals_team_match",
    "goals_conceded_team_match",
    "possession_percentage_team",
    "clean_sheet_team",
    "expected_goals_team",
    "ontarget_scoring_att_team",
    "big_chance_team",
    "big_chance_missed_team",
    "accurate_pass_team",
    "accurate_long_balls_team",
    "accurate_cross_team",
    "penalty_won_team",
    "touches_in_opp_box_team",
    "corner_taken_team",
    "expected_goals_conceded_team",
    "interception_team",
    "won_tackle_team",
    "effective_clearance_team",
    "poss_won_att_3rd_team",
    "penalty_conceded_team",
    "saves_team",
    "fk_foul_lost_team",
    "total_yel_card_team",
    "total_red_card_team",
];

const WHITE: &str = "#ffffff";

/// Season label as FotMob expects it in a query string.
pub fn season_query(season: &str) -> String {
    season.replace('/', "%2F")
}

/// One standings table. Leagues split in zones return one table per zone,
/// concatenated here with a `group` column naming the zone.
pub fn parse_season_tables(payload: &Value, kind: &str) -> Result<Table> {
    if let Some(rows) = array_at(payload, &format!("/table/0/data/table/{kind}")) {
        return Ok(Table::from_records(rows));
    }

    let groups = required_array(payload, "/table/0/data/tables", "standings")?;
    let mut table = Table::default();
    for group in groups {
        let name = group
            .get("leagueName")
            .cloned()
            .unwrap_or(Value::Null);
        let rows = array_at(group, &format!("/table/{kind}"))
            .map(|rows| Table::from_records(rows))
            .unwrap_or_default();
        table.extend(rows.with_constant("group", name));
    }
    Ok(table)
}

/// Deep-stat rows with the `statValue` object spread into columns.
pub fn parse_deep_stats(payload: &Value) -> Result<Table> {
    let rows = required_array(payload, "/statsData", "season stats")?;
    Ok(Table::from_records(rows).flatten_column("statValue", &[]))
}

pub fn parse_match_shotmap(payload: &Value, match_id: &str) -> Result<Table> {
    let shots = array_at(payload, "/content/shotmap/shots")
        .filter(|shots| !shots.is_empty())
        .ok_or_else(|| ScrapeError::match_missing(match_id))?;
    Ok(Table::from_records(shots)
        .flatten_column("onGoalShot", &[("x", "goalMouthY"), ("y", "goalMouthZ")]))
}

pub fn parse_team_colors(payload: &Value, match_id: &str) -> Result<(String, String)> {
    let color = |side: &str| {
        let dark = str_at(payload, &format!("/general/teamColors/darkMode/{side}"));
        let light = str_at(payload, &format!("/general/teamColors/lightMode/{side}"));
        match dark {
            Some(WHITE) => light.or(dark),
            Some(_) => dark,
            None => light,
        }
        .map(str::to_string)
        .ok_or_else(|| ScrapeError::match_missing(match_id))
    };
    Ok((color("home")?, color("away")?))
}

/// Every stat of every group with its `stats` pair split into `home`/`away`.
/// Rows missing either side are dropped.
pub fn parse_general_match_stats(payload: &Value, match_id: &str) -> Result<Table> {
    let groups = array_at(payload, "/content/stats/Periods/All/stats")
        .ok_or_else(|| ScrapeError::match_missing(match_id))?;

    let mut table = Table::default();
    for group in groups {
        for stat in array_at(group, "/stats").into_iter().flatten() {
            let Some(map) = stat.as_object() else {
                continue;
            };
            let pair = map.get("stats").and_then(Value::as_array);
            let side = |i: usize| {
                pair.and_then(|p| p.get(i))
                    .cloned()
                    .filter(|v| !v.is_null())
            };
            let (Some(home), Some(away)) = (side(0), side(1)) else {
                continue;
            };
            let mut record: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| key.as_str() != "stats")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            record.insert("home".to_string(), home);
            record.insert("away".to_string(), away);
            table.push_record(&record);
        }
    }
    Ok(table)
}

/// Momentum bars: positive values favour the home side.
pub fn parse_match_momentum(payload: &Value, match_id: &str) -> Result<Table> {
    let points = array_at(payload, "/content/matchFacts/momentum/main/data")
        .ok_or_else(|| ScrapeError::match_missing(match_id))?;
    Ok(Table::from_records(points))
}

pub fn parse_player_shotmap(payload: &Value, player_id: &str) -> Result<Table> {
    let shots =
        array_at(payload, "/shotmap").ok_or_else(|| ScrapeError::player_missing(player_id))?;
    Ok(Table::from_records(shots))
}

pub struct Fotmob {
    ctx: SourceContext,
}

impl Fotmob {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    pub async fn season_tables(&self, league: &str, season: &str, kind: &str) -> Result<Table> {
        require_known_stat("table", kind, TABLE_KINDS)?;
        let (entry, _) = self.ctx.league_season(Page::Fotmob, league, season)?;
        let url = format!(
            "{API}/leagues?id={}&ccode3=ARG&season={}",
            entry.id,
            season_query(season)
        );
        parse_season_tables(&self.ctx.get_json(&url).await?, kind)
    }

    pub async fn match_details(&self, match_id: &str) -> Result<Value> {
        self.ctx
            .get_json(&format!("{API}/matchDetails?matchId={match_id}"))
            .await
    }

    async fn deep_stats(
        &self,
        league: &str,
        season: &str,
        kind: &str,
        stat: &str,
    ) -> Result<Table> {
        let (entry, season_id) = self.ctx.league_season(Page::Fotmob, league, season)?;
        let url = format!(
            "{API}/leagueseasondeepstats?id={}&season={season_id}&type={kind}&stat={stat}",
            entry.id
        );
        let table = parse_deep_stats(&self.ctx.get_json(&url).await?)?;
        info!("{} {kind} rows for {stat} in {league} {season}", table.len());
        Ok(table)
    }

    pub async fn players_stats_season(
        &self,
        league: &str,
        season: &str,
        stat: &str,
    ) -> Result<Table> {
        require_known_stat("stat", stat, PLAYER_STATS)?;
        self.deep_stats(league, season, "players", stat).await
    }

    pub async fn teams_stats_season(
        &self,
        league: &str,
        season: &str,
        stat: &str,
    ) -> Result<Table> {
        require_known_stat("stat", stat, TEAM_STATS)?;
        self.deep_stats(league, season, "teams", stat).await
    }

    pub async fn match_shotmap(&self, match_id: &str) -> Result<Table> {
        parse_match_shotmap(&self.match_details(match_id).await?, match_id)
    }

    pub async fn team_colors(&self, match_id: &str) -> Result<(String, String)> {
        parse_team_colors(&self.match_details(match_id).await?, match_id)
    }

    pub async fn general_match_stats(&self, match_id: &str) -> Result<Table> {
        parse_general_match_stats(&self.match_details(match_id).await?, match_id)
    }

    pub async fn match_momentum(&self, match_id: &str) -> Result<Table> {
        parse_match_momentum(&self.match_details(match_id).await?, match_id)
    }

    /// Momentum bars and `(home, away)` team colours from one match request.
    pub async fn match_momentum_with_colors(
        &self,
        match_id: &str,
    ) -> Result<(Table, (String, String))> {
        let details = self.match_details(match_id).await?;
        Ok((
            parse_match_momentum(&details, match_id)?,
            parse_team_colors(&details, match_id)?,
        ))
    }

    pub async fn player_shotmap(
        &self,
        league: &str,
        season: &str,
        player_id: &str,
    ) -> Result<Table> {
        let (entry, _) = self.ctx.league_season(Page::Fotmob, league, season)?;
        let url = format!(
            "{API}/playerStats?playerId={player_id}&seasonId={}-{}",
            season_query(season),
            entry.id
        );
        parse_player_shotmap(&self.ctx.get_json(&url).await?, player_id)
    }
}
