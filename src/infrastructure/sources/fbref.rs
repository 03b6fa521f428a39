use super::SourceContext;
use crate::domain::validate::require_known_stat;
use crate::domain::{Page, Table};
use crate::error::{Result, ScrapeError};
use crate::infrastructure::html::{self, data_cells, read_tables, text_of, HeaderMode};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::info;

const COMPS: &str = "https://fbref.com/en/comps";
pub const BIG5: &str = "Big 5 European Leagues";

pub const STATS: &[&str] = &[
    "stats",
    "keepers",
    "keepersadv",
    "shooting",
    "passing",
    "passing_types",
    "gca",
    "defense",
    "possession",
    "playingtime",
    "misc",
];

const PLAYER_REPORT_HEADERS: [&str; 2] = ["Statistic", "Estadísticas"];

/// Index of the shots table on a match report; reports with fewer tables
/// have no detailed data.
const MATCH_SHOTS_TABLE: usize = 17;
const HOME_STATS_TABLE: usize = 3;
const AWAY_STATS_TABLE: usize = 10;

static COL_HEADERS: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"th[scope="col"]"#).unwrap());

/// Which table family a stat page URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Squads,
    Players,
}

impl Scope {
    fn segment(self) -> &'static str {
        match self {
            Scope::Squads => "squads",
            Scope::Players => "players",
        }
    }
}

/// Stat page URL. The Big 5 aggregate lives under its own `squads`/`players`
/// paths; other leagues serve both tables on one page.
pub fn stats_url(
    id: &str,
    slug: &str,
    stat: &str,
    season: Option<&str>,
    big5: bool,
    scope: Scope,
) -> String {
    match (big5, season) {
        (true, Some(season)) => format!(
            "{COMPS}/{id}/{season}/{stat}/{}/{season}-{slug}-Stats",
            scope.segment()
        ),
        (true, None) => format!("{COMPS}/{id}/{stat}/{}/{slug}-Stats", scope.segment()),
        (false, Some(season)) => format!("{COMPS}/{id}/{season}/{stat}/{season}-{slug}-Stats"),
        (false, None) => format!("{COMPS}/{id}/{stat}/{slug}-Stats"),
    }
}

fn prefixed(table: Table, stat: &str, keep: &[&str]) -> Table {
    table.rename_with(|column| {
        if keep.contains(&column) {
            column.to_string()
        } else {
            format!("{stat}_{column}")
        }
    })
}

/// Squad table (`vs == false`) or opponents table of a stat page.
pub fn parse_team_stats(
    page: &str,
    stat: &str,
    vs: bool,
    flatten_headers: bool,
    prefix: bool,
) -> Result<Table> {
    let (squads, opponents) = parse_both_team_stats(page, stat, flatten_headers, prefix)?;
    Ok(if vs { opponents } else { squads })
}

pub fn parse_both_team_stats(
    page: &str,
    stat: &str,
    flatten_headers: bool,
    prefix: bool,
) -> Result<(Table, Table)> {
    let mode = if flatten_headers {
        HeaderMode::Joined
    } else {
        HeaderMode::Last
    };
    let mut tables = read_tables(page, mode)?.into_iter();
    let (Some(squads), Some(opponents)) = (tables.next(), tables.next()) else {
        return Err(ScrapeError::Parse(format!("{stat}: squad tables not found")));
    };
    if flatten_headers && prefix {
        Ok((prefixed(squads, stat, &[]), prefixed(opponents, stat, &[])))
    } else {
        Ok((squads, opponents))
    }
}

/// The per-player table, which the site ships inside an HTML comment.
pub fn parse_player_stats(page: &str, stat: &str, league: &str, prefix: bool) -> Result<Table> {
    let document = Html::parse_document(page);
    let comment = html::comments(&document)
        .into_iter()
        .filter(|c| c.contains(r#"<div class="table_container""#))
        .last()
        .ok_or_else(|| ScrapeError::Parse(format!("{stat}: player table not found")))?;
    let start = comment.find("<table").unwrap_or(0);
    let fragment = Html::parse_fragment(&comment[start..]);

    let headings: Vec<String> = fragment.select(&COL_HEADERS).skip(1).map(text_of).collect();
    let table_el = html::tables(&fragment)
        .first()
        .copied()
        .ok_or_else(|| ScrapeError::Parse(format!("{stat}: player table not found")))?;

    let mut table = Table::new(headings.clone());
    for row in html::body_rows(table_el) {
        let cells = data_cells(row);
        if cells.len() != headings.len() {
            continue;
        }
        table.push_row(
            cells
                .into_iter()
                .map(|cell| match text_of(cell) {
                    text if text.is_empty() => Value::from(0),
                    text => Value::String(text),
                })
                .collect(),
        )?;
    }

    let rows = table.len();
    let table = table
        .drop_columns(&["Matches"])
        .insert_column(4, "Comp", vec![Value::from(league); rows]);
    Ok(if prefix {
        prefixed(table, stat, &["Player"])
    } else {
        table
    })
}

/// Stats the site reports for goalkeepers only.
const KEEPER_STATS: [&str; 2] = ["keepers", "keepersadv"];

/// Joins prefixed per-stat squad tables into one row per squad. The first
/// table's `{stat}_Squad` is the key; later squad columns are dropped.
pub fn merge_team_stats(tables: Vec<(&str, Table)>) -> Table {
    let mut tables = tables.into_iter();
    let Some((first, mut merged)) = tables.next() else {
        return Table::default();
    };
    let key = format!("{first}_Squad");
    for (stat, table) in tables {
        let squad = format!("{stat}_Squad");
        merged = merged.left_join(&table, &[(key.as_str(), squad.as_str())]);
    }
    merged
}

fn merge_by_player(tables: Vec<(&str, Table)>) -> Table {
    let mut tables = tables.into_iter();
    let Some((first, mut merged)) = tables.next() else {
        return Table::default();
    };
    let squad = format!("{first}_Squad");
    for (stat, table) in tables {
        let other = format!("{stat}_Squad");
        merged = merged.left_join(
            &table,
            &[("Player", "Player"), (squad.as_str(), other.as_str())],
        );
    }
    merged.dedup_by(&["Player", squad.as_str()])
}

/// Joins prefixed per-stat player tables on player and squad. Returns the
/// outfield table and the goalkeeper table; a player who moved clubs keeps
/// one row per squad.
pub fn merge_player_stats(tables: Vec<(&str, Table)>) -> (Table, Table) {
    let (keepers, outfield): (Vec<_>, Vec<_>) = tables
        .into_iter()
        .partition(|(stat, _)| KEEPER_STATS.contains(stat));
    (merge_by_player(outfield), merge_by_player(keepers))
}

fn player_report_tables(page: &str, path: &str) -> Result<Vec<Table>> {
    let tables = read_tables(page, HeaderMode::Last)?;
    let first_header = tables
        .first()
        .and_then(|t| t.columns().first())
        .map(String::as_str);
    match first_header {
        Some(header) if PLAYER_REPORT_HEADERS.contains(&header) => Ok(tables),
        _ => Err(ScrapeError::player_missing(path)),
    }
}

pub fn parse_player_percentiles(page: &str, path: &str) -> Result<Table> {
    let mut tables = player_report_tables(page, path)?;
    Ok(tables.swap_remove(0))
}

pub fn parse_player_similarities(page: &str, path: &str) -> Result<Table> {
    player_report_tables(page, path)?
        .into_iter()
        .nth(1)
        .ok_or_else(|| ScrapeError::player_missing(path))
}

fn match_report_tables(page: &str, path: &str) -> Result<Vec<Table>> {
    let tables = read_tables(page, HeaderMode::Last)?;
    if tables.len() <= MATCH_SHOTS_TABLE {
        return Err(ScrapeError::match_missing(path));
    }
    Ok(tables)
}

pub fn parse_match_shots(page: &str, path: &str) -> Result<Table> {
    Ok(match_report_tables(page, path)?.swap_remove(MATCH_SHOTS_TABLE))
}

pub fn parse_general_match_team_stats(page: &str, path: &str) -> Result<(Table, Table)> {
    let mut tables = match_report_tables(page, path)?;
    let away = tables.swap_remove(AWAY_STATS_TABLE);
    let home = tables.swap_remove(HOME_STATS_TABLE);
    Ok((home, away))
}

pub fn parse_tournament_table(page: &str, path: &str) -> Result<Table> {
    read_tables(page, HeaderMode::Last)?
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::match_missing(path))
}

pub struct Fbref {
    ctx: SourceContext,
}

impl Fbref {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn url(&self, stat: &str, league: &str, season: Option<&str>, scope: Scope) -> Result<String> {
        require_known_stat("stat", stat, STATS)?;
        let resolved = self.ctx.catalog().resolve(Page::Fbref, league, season)?;
        let season = resolved.season.map(ToString::to_string);
        Ok(stats_url(
            &resolved.entry.id.to_string(),
            resolved.entry.slug()?,
            stat,
            season.as_deref(),
            league == BIG5,
            scope,
        ))
    }

    async fn team_page(&self, stat: &str, league: &str, season: Option<&str>) -> Result<String> {
        let url = self.url(stat, league, season, Scope::Squads)?;
        info!("Scraping {stat} team stats for {league}");
        self.ctx.get_text(&url).await
    }

    pub async fn teams_season_stats(
        &self,
        stat: &str,
        league: &str,
        season: Option<&str>,
        vs: bool,
        flatten_headers: bool,
        prefix: bool,
    ) -> Result<Table> {
        let page = self.team_page(stat, league, season).await?;
        parse_team_stats(&page, stat, vs, flatten_headers, prefix)
    }

    /// Squad and opponents tables from a single request.
    pub async fn vs_and_teams_season_stats(
        &self,
        stat: &str,
        league: &str,
        season: Option<&str>,
        flatten_headers: bool,
        prefix: bool,
    ) -> Result<(Table, Table)> {
        let page = self.team_page(stat, league, season).await?;
        parse_both_team_stats(&page, stat, flatten_headers, prefix)
    }

    pub async fn player_season_stats(
        &self,
        stat: &str,
        league: &str,
        season: Option<&str>,
        prefix: bool,
    ) -> Result<Table> {
        let url = self.url(stat, league, season, Scope::Players)?;
        info!("Scraping {stat} player stats for {league}");
        parse_player_stats(&self.ctx.get_text(&url).await?, stat, league, prefix)
    }

    /// Every stat page's squad table, joined by squad.
    pub async fn all_teams_season_stats(
        &self,
        league: &str,
        season: Option<&str>,
        vs: bool,
    ) -> Result<Table> {
        let mut tables = Vec::with_capacity(STATS.len());
        for stat in STATS {
            let table = self
                .teams_season_stats(stat, league, season, vs, true, true)
                .await?;
            tables.push((*stat, table));
        }
        Ok(merge_team_stats(tables))
    }

    /// Every stat page's player table, as outfield and goalkeeper tables.
    pub async fn all_player_season_stats(
        &self,
        league: &str,
        season: Option<&str>,
    ) -> Result<(Table, Table)> {
        let mut tables = Vec::with_capacity(STATS.len());
        for stat in STATS {
            let table = self.player_season_stats(stat, league, season, true).await?;
            tables.push((*stat, table));
        }
        Ok(merge_player_stats(tables))
    }

    pub async fn player_percentiles(&self, path: &str) -> Result<Table> {
        parse_player_percentiles(&self.ctx.get_text(path).await?, path)
    }

    pub async fn player_similarities(&self, path: &str) -> Result<Table> {
        parse_player_similarities(&self.ctx.get_text(path).await?, path)
    }

    pub async fn match_shots(&self, path: &str) -> Result<Table> {
        parse_match_shots(&self.ctx.get_text(path).await?, path)
    }

    pub async fn general_match_team_stats(&self, path: &str) -> Result<(Table, Table)> {
        parse_general_match_team_stats(&self.ctx.get_text(path).await?, path)
    }

    pub async fn tournament_table(&self, path: &str) -> Result<Table> {
        parse_tournament_table(&self.ctx.get_text(path).await?, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SQUADS: &str = r#"
        <table id="stats_squads_standard_for">
          <thead>
            <tr class="over_header"><th colspan="2"></th><th colspan="2">Performance</th></tr>
            <tr><th>Squad</th><th># Pl</th><th>Gls</th><th>Ast</th></tr>
          </thead>
          <tbody><tr><th>Arsenal</th><td>24</td><td>88</td><td>64</td></tr></tbody>
        </table>
        <table id="stats_squads_standard_against">
          <thead>
            <tr class="over_header"><th colspan="2"></th><th colspan="2">Performance</th></tr>
            <tr><th>Squad</th><th># Pl</th><th>Gls</th><th>Ast</th></tr>
          </thead>
          <tbody><tr><th>vs Arsenal</th><td>25</td><td>28</td><td>20</td></tr></tbody>
        </table>"#;

    #[test]
    fn stats_urls() {
        assert_eq!(
            stats_url("9", "Premier-League", "shooting", None, false, Scope::Squads),
            "https://fbref.com/en/comps/9/shooting/Premier-League-Stats"
        );
        assert_eq!(
            stats_url("9", "Premier-League", "shooting", Some("2022-2023"), false, Scope::Players),
            "https://fbref.com/en/comps/9/2022-2023/shooting/2022-2023-Premier-League-Stats"
        );
        assert_eq!(
            stats_url("Big5", "Big-5-European-Leagues", "stats", None, true, Scope::Players),
            "https://fbref.com/en/comps/Big5/stats/players/Big-5-European-Leagues-Stats"
        );
        assert_eq!(
            stats_url(
                "Big5",
                "Big-5-European-Leagues",
                "stats",
                Some("2022-2023"),
                true,
                Scope::Squads,
            ),
            concat!(
                "https://fbref.com/en/comps/Big5/2022-2023/stats/squads",
                "/2022-2023-Big-5-European-Leagues-Stats"
            )
        );
    }

    #[test]
    fn team_stats_flattened_and_prefixed() {
        let table = parse_team_stats(SQUADS, "stats", false, true, true).unwrap();
        assert_eq!(
            table.columns(),
            ["stats_Squad", "stats_# Pl", "stats_Performance_Gls", "stats_Performance_Ast"]
        );
        let vs = parse_team_stats(SQUADS, "stats", true, false, false).unwrap();
        assert_eq!(vs.columns(), ["Squad", "# Pl", "Gls", "Ast"]);
        assert_eq!(vs.get(0, "Squad"), Some(&json!("vs Arsenal")));
    }

    #[test]
    fn player_table_is_read_from_comments() {
        let page = r#"<html><body>
            <div id="all_stats_standard"><!--
            <div class="table_container" id="div_stats_standard">
            <table id="stats_standard">
              <thead><tr><th scope="col">Rk</th><th scope="col">Player</th>
                <th scope="col">Nation</th><th scope="col">Pos</th><th scope="col">Squad</th>
                <th scope="col">Gls</th><th scope="col">Matches</th></tr></thead>
              <tbody>
                <tr><th>1</th><td>Lionel Messi</td><td>ar ARG</td><td>FW</td>
                  <td>Inter Miami</td><td></td><td>Matches</td></tr>
                <tr class="thead"><th>Rk</th></tr>
                <tr><th>2</th><td>Luis Suárez</td><td>uy URU</td><td>FW</td>
                  <td>Inter Miami</td><td>20</td><td>Matches</td></tr>
              </tbody>
            </table></div>
            --></div></body></html>"#;
        let table = parse_player_stats(page, "stats", "MLS", true).unwrap();
        assert_eq!(
            table.columns(),
            ["Player", "stats_Nation", "stats_Pos", "stats_Squad", "stats_Comp", "stats_Gls"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "stats_Gls"), Some(&json!(0)));
        assert_eq!(table.get(1, "stats_Comp"), Some(&json!("MLS")));
    }

    fn players(stat: &str, columns: &[&str], rows: &[&[Value]]) -> Table {
        let mut table = Table::new(columns.iter().copied());
        for row in rows {
            table.push_row(row.to_vec()).unwrap();
        }
        prefixed(table, stat, &["Player"])
    }

    #[test]
    fn player_stats_merge_on_player_and_squad() {
        let stats = players(
            "stats",
            &["Player", "Squad", "Gls"],
            &[
                &[json!("Julián Álvarez"), json!("Atlético"), json!("17")],
                &[json!("Jan Oblak"), json!("Atlético"), json!("0")],
                &[json!("Jorge Carrascal"), json!("Dinamo"), json!("2")],
                &[json!("Jorge Carrascal"), json!("Flamengo"), json!("1")],
            ],
        );
        let keepers = players(
            "keepers",
            &["Player", "Squad", "Saves"],
            &[&[json!("Jan Oblak"), json!("Atlético"), json!("98")]],
        );
        let shooting = players(
            "shooting",
            &["Player", "Squad", "Sh"],
            &[
                &[json!("Jorge Carrascal"), json!("Flamengo"), json!("9")],
                &[json!("Jorge Carrascal"), json!("Dinamo"), json!("14")],
                &[json!("Julián Álvarez"), json!("Atlético"), json!("80")],
                &[json!("Julián Álvarez"), json!("Atlético"), json!("80")],
            ],
        );
        let keepersadv = players(
            "keepersadv",
            &["Player", "Squad", "PSxG"],
            &[&[json!("Jan Oblak"), json!("Atlético"), json!("40.1")]],
        );

        let (outfield, gk) = merge_player_stats(vec![
            ("stats", stats),
            ("keepers", keepers),
            ("shooting", shooting),
            ("keepersadv", keepersadv),
        ]);

        assert_eq!(outfield.columns(), ["Player", "stats_Squad", "stats_Gls", "shooting_Sh"]);
        assert_eq!(outfield.len(), 4);
        assert_eq!(outfield.get(0, "shooting_Sh"), Some(&json!("80")));
        assert_eq!(outfield.get(1, "shooting_Sh"), Some(&Value::Null));
        assert_eq!(outfield.get(2, "shooting_Sh"), Some(&json!("14")));
        assert_eq!(outfield.get(3, "shooting_Sh"), Some(&json!("9")));

        assert_eq!(gk.columns(), ["Player", "keepers_Squad", "keepers_Saves", "keepersadv_PSxG"]);
        assert_eq!(gk.len(), 1);
        assert_eq!(gk.get(0, "keepersadv_PSxG"), Some(&json!("40.1")));
    }

    #[test]
    fn team_stats_merge_on_the_first_squad_column() {
        let standard = parse_team_stats(SQUADS, "stats", false, true, true).unwrap();
        let shooting = parse_team_stats(SQUADS, "shooting", false, true, true).unwrap();
        let merged = merge_team_stats(vec![("stats", standard), ("shooting", shooting)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.columns()[0], "stats_Squad");
        assert!(!merged.has_column("shooting_Squad"));
        assert_eq!(merged.get(0, "shooting_Performance_Gls"), Some(&json!("88")));
        assert!(merge_team_stats(Vec::new()).is_empty());
    }

    #[test]
    fn player_reports_must_start_with_statistic() {
        let page = "<table><thead><tr><th>Statistic</th><th>Per 90</th><th>Percentile</th></tr>\
                    </thead><tbody><tr><td>npxG: Non-Penalty xG</td><td>0.41</td><td>88</td></tr>\
                    </tbody></table><table><thead><tr><th>Rk</th><th>Player</th></tr></thead>\
                    <tbody><tr><td>1</td><td>X</td></tr></tbody></table>";
        assert_eq!(parse_player_percentiles(page, "p").unwrap().len(), 1);
        assert_eq!(
            parse_player_similarities(page, "p").unwrap().get(0, "Player"),
            Some(&json!("X"))
        );

        let other = "<table><thead><tr><th>Season</th></tr></thead></table>";
        assert!(matches!(
            parse_player_percentiles(other, "p"),
            Err(ScrapeError::PlayerMissingData { .. })
        ));
    }

    #[test]
    fn short_match_reports_are_match_missing_data() {
        let page = "<table><tr><th>a</th></tr></table>".repeat(5);
        assert!(matches!(
            parse_match_shots(&page, "p"),
            Err(ScrapeError::MatchMissingData { .. })
        ));
    }

    #[test]
    fn match_report_tables_by_position() {
        let page: String = (0..18)
            .map(|i| format!("<table><tr><th>t{i}</th></tr><tr><td>{i}</td></tr></table>"))
            .collect();
        assert_eq!(parse_match_shots(&page, "p").unwrap().columns(), ["t17"]);
        let (home, away) = parse_general_match_team_stats(&page, "p").unwrap();
        assert_eq!(home.columns(), ["t3"]);
        assert_eq!(away.columns(), ["t10"]);
    }
}
