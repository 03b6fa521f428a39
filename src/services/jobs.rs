use crate::domain::validate::require_string;
use crate::domain::{Page, Table};
use crate::error::{Result, ScrapeError, ValidationError};
use crate::infrastructure::sources::sofascore::POSITIONS;
use crate::infrastructure::{
    DataFactory, ExportFormat, Fbref, Fotmob, Sofascore, SourceContext, ThreeSixFiveScores,
    Transfermarkt,
};
use crate::services::charts::{Momentum, PizzaChart};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

pub const SOFASCORE_OPERATIONS: &[&str] = &[
    "team_names",
    "match_momentum",
    "momentum_bars",
    "match_shotmap",
    "league_player_stats",
    "players_match_stats",
    "players_average_positions",
    "player_ids",
    "player_heatmap",
    "player_season_heatmap",
];

pub const FOTMOB_OPERATIONS: &[&str] = &[
    "season_tables",
    "players_stats_season",
    "teams_stats_season",
    "match_shotmap",
    "team_colors",
    "general_match_stats",
    "match_momentum",
    "momentum_bars",
    "player_shotmap",
];

pub const THREESIXFIVE_OPERATIONS: &[&str] = &[
    "league_top_players_stats",
    "match_shotmap",
    "players_info",
    "team_names",
    "general_match_stats",
    "player_heatmap_url",
];

pub const TRANSFERMARKT_OPERATIONS: &[&str] = &[
    "league_teams_valuations",
    "head_coach_history",
    "player_transfer_history",
    "player_market_value",
    "player_positions_played",
    "keeper_penalties",
    "player_played_data",
    "squad_players",
    "players_for_teams",
];

pub const DATAFACTORY_OPERATIONS: &[&str] = &["incidence", "match_passes"];

pub const FBREF_OPERATIONS: &[&str] = &[
    "teams_season_stats",
    "vs_and_teams_season_stats",
    "player_season_stats",
    "all_teams_season_stats",
    "all_player_season_stats",
    "player_percentiles",
    "player_pizza",
    "player_similarities",
    "match_shots",
    "general_match_team_stats",
    "tournament_table",
];

fn default_save() -> bool {
    true
}

/// One adapter call as written in a jobs file. Parameters stay untyped until
/// the job runs so type errors surface as validation errors.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub page: String,
    pub operation: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default = "default_save")]
    pub save: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub format: ExportFormat,
}

impl Job {
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => format!("{}-{}-{label}", self.page, self.operation),
            None => format!("{}-{}", self.page, self.operation),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsFile {
    pub jobs: Vec<Job>,
}

impl JobsFile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// A result table, tagged with its part when an operation yields several.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub part: Option<&'static str>,
    pub table: Table,
}

fn single(table: Table) -> Vec<Output> {
    vec![Output { part: None, table }]
}

fn parts(first: (&'static str, Table), second: (&'static str, Table)) -> Vec<Output> {
    vec![
        Output {
            part: Some(first.0),
            table: first.1,
        },
        Output {
            part: Some(second.0),
            table: second.1,
        },
    ]
}

fn one_row(columns: [&str; 2], values: (String, String)) -> Result<Table> {
    let mut table = Table::new(columns);
    table.push_row(vec![Value::String(values.0), Value::String(values.1)])?;
    Ok(table)
}

fn unknown_operation(operation: &str, allowed: &[&str]) -> ScrapeError {
    ValidationError::InvalidStat {
        param: "operation".to_string(),
        value: operation.to_string(),
        allowed: allowed.iter().map(|op| op.to_string()).collect(),
    }
    .into()
}

/// Typed access to a job's untyped parameters.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a>(&'a Map<String, Value>);

impl<'a> Params<'a> {
    pub fn new(params: &'a Map<String, Value>) -> Self {
        Self(params)
    }

    pub fn optional(&self, name: &str) -> std::result::Result<Option<&'a str>, ValidationError> {
        require_string(name, self.0.get(name))
    }

    /// A string parameter that must be present.
    pub fn required(&self, name: &str) -> std::result::Result<&'a str, ValidationError> {
        self.optional(name)?.ok_or_else(|| ValidationError::InvalidType {
            param: name.to_string(),
        })
    }

    pub fn or(
        &self,
        name: &str,
        default: &'a str,
    ) -> std::result::Result<&'a str, ValidationError> {
        Ok(self.optional(name)?.unwrap_or(default))
    }

    /// Site ids are accepted as strings or bare numbers.
    pub fn id(&self, name: &str) -> std::result::Result<String, ValidationError> {
        match self.0.get(name) {
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Ok(self.required(name)?.to_string()),
        }
    }

    pub fn flag(&self, name: &str) -> std::result::Result<bool, ValidationError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ValidationError::InvalidType {
                param: format!("{name} ({other})"),
            }),
        }
    }

    /// A list of strings; a single string counts as a one-item list.
    pub fn list(&self, name: &str) -> std::result::Result<Option<Vec<&'a str>>, ValidationError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    require_string(&format!("{name}[{i}]"), Some(item))?.ok_or_else(|| {
                        ValidationError::InvalidType {
                            param: format!("{name}[{i}]"),
                        }
                    })
                })
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Some),
            Some(value) => Ok(require_string(name, Some(value))?.map(|s| vec![s])),
        }
    }
}

/// Every adapter behind one dispatcher keyed by page and operation name.
pub struct Sources {
    sofascore: Sofascore,
    fotmob: Fotmob,
    threesixfive: ThreeSixFiveScores,
    transfermarkt: Transfermarkt,
    datafactory: DataFactory,
    fbref: Fbref,
}

impl Sources {
    pub fn new(ctx: SourceContext) -> Self {
        Self {
            sofascore: Sofascore::new(ctx.clone()),
            fotmob: Fotmob::new(ctx.clone()),
            threesixfive: ThreeSixFiveScores::new(ctx.clone()),
            transfermarkt: Transfermarkt::new(ctx.clone()),
            datafactory: DataFactory::new(ctx.clone()),
            fbref: Fbref::new(ctx),
        }
    }

    pub async fn run(&self, job: &Job) -> Result<Vec<Output>> {
        let page: Page = job.page.parse()?;
        let params = Params::new(&job.params);
        debug!("Running {} {} with {:?}", page, job.operation, job.params);
        match page {
            Page::Sofascore => self.sofascore(&job.operation, params).await,
            Page::Fotmob => self.fotmob(&job.operation, params).await,
            Page::ThreeSixFiveScores => self.threesixfive(&job.operation, params).await,
            Page::Transfermarkt => self.transfermarkt(&job.operation, params).await,
            Page::DataFactory => self.datafactory(&job.operation, params).await,
            Page::Fbref => self.fbref(&job.operation, params).await,
        }
    }

    async fn sofascore(&self, operation: &str, p: Params<'_>) -> Result<Vec<Output>> {
        let s = &self.sofascore;
        Ok(match operation {
            "team_names" => {
                let names = s.team_names(p.required("match_url")?).await?;
                single(one_row(["home", "away"], names)?)
            }
            "match_momentum" => single(s.match_momentum(p.required("match_url")?).await?),
            "momentum_bars" => {
                let table = s.match_momentum(p.required("match_url")?).await?;
                single(Momentum::from_table(&table).to_table()?)
            }
            "match_shotmap" => single(s.match_shotmap(p.required("match_url")?).await?),
            "league_player_stats" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                let accumulation = p.or("accumulation", "total")?;
                let positions = p
                    .list("positions")?
                    .unwrap_or_else(|| POSITIONS.iter().map(|(name, _)| *name).collect());
                single(s.league_player_stats(league, season, accumulation, &positions).await?)
            }
            "players_match_stats" => {
                let (home, away) = s.players_match_stats(p.required("match_url")?).await?;
                parts(("home", home), ("away", away))
            }
            "players_average_positions" => {
                let (home, away) = s.players_average_positions(p.required("match_url")?).await?;
                parts(("home", home), ("away", away))
            }
            "player_ids" => {
                let mut table = Table::new(["name", "id"]);
                for (name, id) in s.player_ids(p.required("match_url")?).await? {
                    table.push_row(vec![Value::String(name), Value::from(id)])?;
                }
                single(table)
            }
            "player_heatmap" => {
                let match_url = p.required("match_url")?;
                let player = p.required("player")?;
                single(s.player_heatmap(match_url, player).await?)
            }
            "player_season_heatmap" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                let player_id = p.id("player_id")?;
                single(s.player_season_heatmap(league, season, &player_id).await?)
            }
            other => return Err(unknown_operation(other, SOFASCORE_OPERATIONS)),
        })
    }

    async fn fotmob(&self, operation: &str, p: Params<'_>) -> Result<Vec<Output>> {
        let f = &self.fotmob;
        Ok(match operation {
            "season_tables" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                let table = p.or("table", "all")?;
                single(f.season_tables(league, season, table).await?)
            }
            "players_stats_season" | "teams_stats_season" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                let stat = p.required("stat")?;
                single(if operation == "players_stats_season" {
                    f.players_stats_season(league, season, stat).await?
                } else {
                    f.teams_stats_season(league, season, stat).await?
                })
            }
            "match_shotmap" => single(f.match_shotmap(&p.id("match_id")?).await?),
            "team_colors" => {
                let colors = f.team_colors(&p.id("match_id")?).await?;
                single(one_row(["home", "away"], colors)?)
            }
            "general_match_stats" => single(f.general_match_stats(&p.id("match_id")?).await?),
            "match_momentum" => single(f.match_momentum(&p.id("match_id")?).await?),
            "momentum_bars" => {
                let (table, (home, away)) =
                    f.match_momentum_with_colors(&p.id("match_id")?).await?;
                single(Momentum::from_table(&table).with_colors(home, away).to_table()?)
            }
            "player_shotmap" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                let player_id = p.id("player_id")?;
                single(f.player_shotmap(league, season, &player_id).await?)
            }
            other => return Err(unknown_operation(other, FOTMOB_OPERATIONS)),
        })
    }

    async fn threesixfive(&self, operation: &str, p: Params<'_>) -> Result<Vec<Output>> {
        let t = &self.threesixfive;
        Ok(match operation {
            "league_top_players_stats" => {
                single(t.league_top_players_stats(p.required("league")?).await?)
            }
            "match_shotmap" => single(t.match_shotmap(p.required("match_url")?).await?),
            "players_info" => single(t.players_info(p.required("match_url")?).await?),
            "team_names" => {
                let names = t.team_names(p.required("match_url")?).await?;
                single(one_row(["home", "away"], names)?)
            }
            "general_match_stats" => {
                single(t.general_match_stats(p.required("match_url")?).await?)
            }
            "player_heatmap_url" => {
                let match_url = p.required("match_url")?;
                let player = p.required("player")?;
                let url = t.player_heatmap_url(match_url, player).await?;
                single(one_row(["player", "heatmap_url"], (player.to_string(), url))?)
            }
            other => return Err(unknown_operation(other, THREESIXFIVE_OPERATIONS)),
        })
    }

    async fn transfermarkt(&self, operation: &str, p: Params<'_>) -> Result<Vec<Output>> {
        let t = &self.transfermarkt;
        Ok(match operation {
            "league_teams_valuations" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                single(t.league_teams_valuations(league, season).await?)
            }
            "head_coach_history" => {
                let name = p.required("name")?;
                let coach_id = p.id("coach_id")?;
                single(t.head_coach_history(name, &coach_id).await?)
            }
            "player_transfer_history" => {
                single(t.player_transfer_history(&p.id("player_id")?).await?)
            }
            "player_market_value" => single(t.player_market_value(&p.id("player_id")?).await?),
            "player_positions_played" | "keeper_penalties" | "player_played_data" => {
                let name = p.required("name")?;
                let player_id = p.id("player_id")?;
                match operation {
                    "player_positions_played" => {
                        single(t.player_positions_played(name, &player_id).await?)
                    }
                    "keeper_penalties" => {
                        let (saved, conceded) = t.keeper_penalties(name, &player_id).await?;
                        parts(("saved", saved), ("conceded", conceded))
                    }
                    _ => single(t.player_played_data(name, &player_id).await?),
                }
            }
            "squad_players" => {
                let team = p.required("team")?;
                let team_id = p.id("team_id")?;
                let season = p.required("season")?;
                single(t.squad_players(team, &team_id, season).await?)
            }
            "players_for_teams" => {
                let league = p.required("league")?;
                let season = p.required("season")?;
                single(t.players_for_teams(league, season).await?)
            }
            other => return Err(unknown_operation(other, TRANSFERMARKT_OPERATIONS)),
        })
    }

    async fn datafactory(&self, operation: &str, p: Params<'_>) -> Result<Vec<Output>> {
        let d = &self.datafactory;
        Ok(match operation {
            "incidence" => {
                let league = p.required("league")?;
                let match_id = p.id("match_id")?;
                let kind = p.required("incidence_type")?;
                single(d.incidence(league, &match_id, kind).await?)
            }
            "match_passes" => {
                let league = p.required("league")?;
                let match_id = p.id("match_id")?;
                let all_passes = p.flag("all_passes")?;
                single(d.match_passes(league, &match_id, all_passes).await?)
            }
            other => return Err(unknown_operation(other, DATAFACTORY_OPERATIONS)),
        })
    }

    async fn fbref(&self, operation: &str, p: Params<'_>) -> Result<Vec<Output>> {
        let f = &self.fbref;
        Ok(match operation {
            "teams_season_stats" | "vs_and_teams_season_stats" => {
                let stat = p.required("stat")?;
                let league = p.required("league")?;
                let season = p.optional("season")?;
                let flatten = p.flag("flatten_headers")?;
                let prefix = p.flag("prefix")?;
                if operation == "teams_season_stats" {
                    let vs = p.flag("vs")?;
                    single(
                        f.teams_season_stats(stat, league, season, vs, flatten, prefix)
                            .await?,
                    )
                } else {
                    let (squads, opponents) = f
                        .vs_and_teams_season_stats(stat, league, season, flatten, prefix)
                        .await?;
                    parts(("squads", squads), ("vs", opponents))
                }
            }
            "player_season_stats" => {
                let stat = p.required("stat")?;
                let league = p.required("league")?;
                let season = p.optional("season")?;
                let prefix = p.flag("prefix")?;
                single(f.player_season_stats(stat, league, season, prefix).await?)
            }
            "all_teams_season_stats" => {
                let league = p.required("league")?;
                let season = p.optional("season")?;
                let vs = p.flag("vs")?;
                single(f.all_teams_season_stats(league, season, vs).await?)
            }
            "all_player_season_stats" => {
                let league = p.required("league")?;
                let season = p.optional("season")?;
                let (players, keepers) = f.all_player_season_stats(league, season).await?;
                parts(("players", players), ("keepers", keepers))
            }
            "player_percentiles" => single(f.player_percentiles(p.required("path")?).await?),
            "player_pizza" => {
                let table = f.player_percentiles(p.required("path")?).await?;
                single(PizzaChart::from_percentiles(&table)?.to_table()?)
            }
            "player_similarities" => single(f.player_similarities(p.required("path")?).await?),
            "match_shots" => single(f.match_shots(p.required("path")?).await?),
            "general_match_team_stats" => {
                let (home, away) = f.general_match_team_stats(p.required("path")?).await?;
                parts(("home", home), ("away", away))
            }
            "tournament_table" => single(f.tournament_table(p.required("path")?).await?),
            other => return Err(unknown_operation(other, FBREF_OPERATIONS)),
        })
    }
}
