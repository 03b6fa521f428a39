use super::{array_at, str_at, SourceContext};
use crate::domain::{Page, Table};
use crate::error::{Result, ScrapeError, ValidationError};
use crate::infrastructure::html::{
    self, cells, data_cells, has_class, rows, selector, text_of, text_or_image,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::info;

const AR: &str = "https://www.transfermarkt.com.ar";
const UK: &str = "https://www.transfermarkt.co.uk";
const PLAYED_FILTERS: &str = "saison//verein/0/liga/0/wettbewerb//pos/0/trainer_id/0/plus/1";

static ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse("table.items").unwrap());
static RESPONSIVE_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.responsive-table table").unwrap());
static LAST_PAGE_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.pager li.tm-pagination__list-item--icon-last-page a.tm-pagination__link")
        .unwrap()
});
static PAGER: Lazy<Selector> = Lazy::new(|| Selector::parse("div.pager").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static SQUAD_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.items > tbody > tr").unwrap());
static SHIRT_NUMBER: Lazy<Selector> = Lazy::new(|| Selector::parse(".rn_nummer").unwrap());
static MAIN_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("td.hauptlink a").unwrap());
static INLINE_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.inline-table tr").unwrap());
static FLAGS: Lazy<Selector> = Lazy::new(|| Selector::parse("img.flaggenrahmen").unwrap());
static MARKET_VALUE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.rechts.hauptlink").unwrap());
static BIRTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*\((\d+)\)$").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());
static CLUB_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([^/]+)/startseite/verein/(\d+)").unwrap());

pub const VALUATION_COLUMNS: [&str; 6] = [
    "Club",
    "Squad size",
    "Mean age",
    "Foreigners",
    "Mean market value",
    "Total market value",
];

pub const SQUAD_COLUMNS: [&str; 10] = [
    "Number",
    "Player",
    "Position",
    "Date of birth",
    "Age",
    "Birth year",
    "Nationality",
    "Second nationality",
    "Market value",
    "Team",
];

pub const POSITION_COLUMNS: [&str; 4] = ["Position", "Matches", "Goals", "Assists"];

pub const PENALTY_COLUMNS: [&str; 7] = [
    "Seasons",
    "Competition",
    "Date",
    "Final Result",
    "Minute",
    "Result after the penalty",
    "Penalty Kicker",
];

pub const PLAYED_COLUMNS: [&str; 18] = [
    "Season",
    "",
    "Competition",
    "Club",
    "Was in squad",
    "Played",
    "PPP",
    "Goals",
    "Assists",
    "Own goals",
    "Subbed In",
    "Subbed out",
    "Yellow Cards",
    "Double yellow",
    "Red Cards",
    "Penalty Kicks",
    "Minutes per goal",
    "Minutes played",
];

pub const KEEPER_PLAYED_COLUMNS: [&str; 17] = [
    "Season",
    "",
    "Competition",
    "Club",
    "Was in squad",
    "Played",
    "PPP",
    "Goals",
    "Own goals",
    "Subbed In",
    "Subbed out",
    "Yellow Cards",
    "Double yellow",
    "Red Cards",
    "Goals Conceded",
    "Clean Sheets",
    "Minutes played",
];

/// URL form of a player, coach or team name.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Transfermarkt keys a season by its starting year: `2023/2024` and `2024`
/// both resolve to `2023`.
pub fn season_id(season: &str) -> std::result::Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidSeason {
        season: season.to_string(),
        valid: Vec::new(),
    };
    match season.split_once('/') {
        Some((start, _)) => start.trim().parse().map_err(|_| invalid()),
        None => season
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|year| year.checked_sub(1))
            .ok_or_else(invalid),
    }
}

fn string_row(values: impl IntoIterator<Item = String>) -> Vec<Value> {
    values.into_iter().map(Value::String).collect()
}

pub fn parse_teams_valuations(page: &str, url: &str) -> Result<Table> {
    let document = Html::parse_document(page);
    let table = document
        .select(&RESPONSIVE_TABLE)
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("no valuation table in {url}")))?;

    let mut out = Table::new(VALUATION_COLUMNS);
    for row in html::body_rows(table) {
        let values: Vec<String> = data_cells(row).into_iter().skip(1).map(text_of).collect();
        if values.is_empty() {
            continue;
        }
        out.push_row(string_row(values))?;
    }
    Ok(out)
}

/// Career stations of a head coach. Crest cells yield the image link.
pub fn parse_head_coach_history(page: &str, url: &str) -> Result<Table> {
    let document = Html::parse_document(page);
    let table = document
        .select(&ITEMS)
        .next()
        .ok_or_else(|| ScrapeError::player_missing(url))?;

    let th = selector("th")?;
    let headers: Vec<String> = table.select(&th).map(text_of).collect();
    let mut out = Table::new(headers);
    for row in html::body_rows(table) {
        out.push_row(string_row(data_cells(row).into_iter().map(text_or_image)))?;
    }
    Ok(out.drop_columns(&["wappen"]))
}

pub fn parse_transfer_history(payload: &Value, player_id: &str) -> Result<Table> {
    let transfers =
        array_at(payload, "/transfers").ok_or_else(|| ScrapeError::player_missing(player_id))?;
    Ok(Table::from_records(transfers)
        .derive_column("club_from", |row| {
            row.get("from")
                .and_then(|from| from.get("clubName"))
                .cloned()
                .unwrap_or(Value::Null)
        })
        .derive_column("club_to", |row| {
            row.get("to")
                .and_then(|to| to.get("clubName"))
                .cloned()
                .unwrap_or(Value::Null)
        }))
}

/// `the-player-name/profil/...` → `The Player Name`.
fn player_name_from_details(details_url: &str) -> String {
    details_url
        .split('/')
        .nth(1)
        .unwrap_or_default()
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Market value history. A blank crest means the player stayed at the
/// previous club, so crests are carried forward.
pub fn parse_market_value(payload: &Value, player_id: &str) -> Result<Table> {
    let points =
        array_at(payload, "/list").ok_or_else(|| ScrapeError::player_missing(player_id))?;
    let player = str_at(payload, "/details_url")
        .map(player_name_from_details)
        .unwrap_or_default();

    let mut last = Value::Null;
    Ok(Table::from_records(points)
        .map_column("wappen", |crest| {
            match crest {
                Value::String(s) if !s.is_empty() => last = crest.clone(),
                Value::String(_) | Value::Null => {}
                other => last = other.clone(),
            }
            last.clone()
        })
        .with_constant("player", Value::String(player)))
}

pub fn parse_positions_played(page: &str, url: &str) -> Result<Table> {
    let document = Html::parse_document(page);
    let table = html::tables(&document)
        .get(2)
        .copied()
        .ok_or_else(|| ScrapeError::player_missing(url))?;

    let mut out = Table::new(POSITION_COLUMNS);
    for row in rows(table).into_iter().skip(1) {
        out.push_row(string_row(data_cells(row).into_iter().map(text_of)))?;
    }
    Ok(out)
}

/// Last page number from the pager. A pager without a last-page item means
/// a single page.
pub fn parse_last_page(page: &str, url: &str) -> Result<u32> {
    let document = Html::parse_document(page);
    if document.select(&PAGER).next().is_none() {
        return Err(ScrapeError::player_missing(url));
    }
    let Some(link) = document.select(&LAST_PAGE_LINK).next() else {
        return Ok(1);
    };
    link.value()
        .attr("href")
        .and_then(|href| href.rsplit('/').next())
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| ScrapeError::Parse(format!("bad pager link in {url}")))
}

fn penalty_rows(table: ElementRef<'_>) -> Result<Table> {
    let mut out = Table::new(PENALTY_COLUMNS);
    for row in rows(table).into_iter().skip(1) {
        let values = cells(row)
            .into_iter()
            .map(text_of)
            .filter(|text| !text.is_empty());
        out.push_row(string_row(values))?;
    }
    Ok(out)
}

/// Saved and conceded penalty tables of one pager page.
pub fn parse_penalty_page(page: &str, url: &str) -> Result<(Table, Table)> {
    let document = Html::parse_document(page);
    let items: Vec<ElementRef<'_>> = document.select(&ITEMS).collect();
    match items.as_slice() {
        [saved, conceded, ..] => Ok((penalty_rows(*saved)?, penalty_rows(*conceded)?)),
        _ => Err(ScrapeError::player_missing(url)),
    }
}

fn played_cell(cell: ElementRef<'_>) -> String {
    let Some(link) = cell.select(&LINK).next() else {
        return text_of(cell);
    };
    if has_class(cell, "zentriert") && !has_class(cell, "hauptlink") {
        return text_of(cell);
    }
    link.value()
        .attr("title")
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| text_of(cell))
}

/// Career appearances per season and competition. The leading totals row is
/// moved to the end and labelled `Total`.
pub fn parse_played_data(page: &str, url: &str) -> Result<Table> {
    let document = Html::parse_document(page);
    let table = html::tables(&document)
        .get(1)
        .copied()
        .ok_or_else(|| ScrapeError::player_missing(url))?;

    let mut lines: Vec<Vec<String>> = rows(table)
        .into_iter()
        .skip(1)
        .map(|row| data_cells(row).into_iter().map(played_cell).collect())
        .collect();
    if lines.is_empty() {
        return Err(ScrapeError::player_missing(url));
    }

    let mut total = lines.remove(0);
    if let Some(first) = total.get_mut(0) {
        *first = "Total".to_string();
    }
    if let Some(second) = total.get_mut(1) {
        second.clear();
    }
    lines.push(total);

    let widths = [KEEPER_PLAYED_COLUMNS.len(), PLAYED_COLUMNS.len()];
    if let Some(line) = lines.iter().find(|line| !widths.contains(&line.len())) {
        return Err(ScrapeError::Parse(format!(
            "played data row with {} cells in {url}",
            line.len()
        )));
    }
    let mut out = if lines[0].len() == KEEPER_PLAYED_COLUMNS.len() {
        Table::new(KEEPER_PLAYED_COLUMNS)
    } else {
        Table::new(PLAYED_COLUMNS)
    };
    for line in lines {
        out.push_row(string_row(line))?;
    }
    Ok(out)
}

fn own_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "td")
        .collect()
}

fn text_value(text: Option<String>) -> Value {
    text.filter(|t| !t.is_empty() && t != "-")
        .map(Value::String)
        .unwrap_or(Value::Null)
}

fn squad_row(row: ElementRef<'_>, team: &str) -> Option<Vec<Value>> {
    let player = row.select(&MAIN_LINK).next().map(text_of)?;
    let number = row.select(&SHIRT_NUMBER).next().map(text_of);
    let position = row.select(&INLINE_ROWS).last().map(text_of);

    let own = own_cells(row);
    let birth = own
        .iter()
        .map(|cell| text_of(*cell))
        .find_map(|text| {
            let captures = BIRTH.captures(&text)?;
            Some((captures[1].to_string(), captures[2].parse::<u32>().ok()))
        });
    let (born, age) = match birth {
        Some((born, age)) => (Some(born), age),
        None => (None, None),
    };
    let birth_year = born
        .as_deref()
        .and_then(|date| YEAR.captures(date))
        .and_then(|captures| captures[1].parse::<u32>().ok());

    let nationalities: Vec<String> = own
        .iter()
        .find(|cell| cell.select(&FLAGS).next().is_some())
        .map(|cell| {
            cell.select(&FLAGS)
                .filter_map(|flag| flag.value().attr("title"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let mut nationalities = nationalities.into_iter();
    let market_value = row.select(&MARKET_VALUE).next().map(text_of);

    Some(vec![
        text_value(number),
        Value::String(player),
        text_value(position),
        text_value(born),
        age.map(Value::from).unwrap_or(Value::Null),
        birth_year.map(Value::from).unwrap_or(Value::Null),
        text_value(nationalities.next()),
        text_value(nationalities.next()),
        text_value(market_value),
        Value::String(team.to_string()),
    ])
}

/// One row per squad member. The birth year is read from the date of birth;
/// players with two passports get both nationalities.
pub fn parse_squad(page: &str, team: &str, url: &str) -> Result<Table> {
    let document = Html::parse_document(page);
    if document.select(&ITEMS).next().is_none() {
        return Err(ScrapeError::Parse(format!("no squad table in {url}")));
    }
    let mut out = Table::new(SQUAD_COLUMNS);
    for row in document.select(&SQUAD_ROWS) {
        if let Some(values) = squad_row(row, team) {
            out.push_row(values)?;
        }
    }
    Ok(out)
}

/// `(slug, id)` of every club linked from a competition page, in table order.
pub fn parse_league_teams(page: &str, url: &str) -> Result<Vec<(String, String)>> {
    let document = Html::parse_document(page);
    let table = document
        .select(&RESPONSIVE_TABLE)
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("no club table in {url}")))?;

    let mut teams: Vec<(String, String)> = Vec::new();
    for link in table.select(&MAIN_LINK) {
        let Some(captures) = link.value().attr("href").and_then(|h| CLUB_HREF.captures(h)) else {
            continue;
        };
        let team = (captures[1].to_string(), captures[2].to_string());
        if !teams.contains(&team) {
            teams.push(team);
        }
    }
    Ok(teams)
}

pub struct Transfermarkt {
    ctx: SourceContext,
}

impl Transfermarkt {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    fn league_url(&self, league: &str, season: &str) -> Result<String> {
        let season_id = season_id(season)?;
        let entry = self.ctx.league(Page::Transfermarkt, league)?;
        Ok(format!(
            "https://www.transfermarkt.com/{}/startseite/wettbewerb/{}/plus/?saison_id={season_id}",
            entry.slug()?,
            entry.id
        ))
    }

    pub async fn league_teams_valuations(&self, league: &str, season: &str) -> Result<Table> {
        let url = self.league_url(league, season)?;
        parse_teams_valuations(&self.ctx.get_text(&url).await?, &url)
    }

    pub async fn squad_players(&self, team: &str, team_id: &str, season: &str) -> Result<Table> {
        let season_id = season_id(season)?;
        let team = slugify(team);
        let url = format!(
            "{AR}/{team}/kader/verein/{team_id}/plus/1/galerie/0?saison_id={season_id}"
        );
        parse_squad(&self.ctx.get_text(&url).await?, &team, &url)
    }

    /// Squads of every club in a competition, one request per club after the
    /// competition page.
    pub async fn players_for_teams(&self, league: &str, season: &str) -> Result<Table> {
        let url = self.league_url(league, season)?;
        let teams = parse_league_teams(&self.ctx.get_text(&url).await?, &url)?;
        info!("Scraping {} squads in {league}", teams.len());

        let mut players = Table::new(SQUAD_COLUMNS);
        for (slug, id) in teams {
            players.extend(self.squad_players(&slug, &id, season).await?);
        }
        Ok(players)
    }

    pub async fn head_coach_history(&self, name: &str, coach_id: &str) -> Result<Table> {
        let url = format!("{AR}/{}/stationen/trainer/{coach_id}/plus/1", slugify(name));
        parse_head_coach_history(&self.ctx.get_text(&url).await?, &url)
    }

    pub async fn player_transfer_history(&self, player_id: &str) -> Result<Table> {
        let url = format!("{AR}/ceapi/transferHistory/list/{player_id}");
        parse_transfer_history(&self.ctx.get_json(&url).await?, player_id)
    }

    pub async fn player_market_value(&self, player_id: &str) -> Result<Table> {
        let url = format!("{AR}/ceapi/marketValueDevelopment/graph/{player_id}");
        parse_market_value(&self.ctx.get_json(&url).await?, player_id)
    }

    pub async fn player_positions_played(&self, name: &str, player_id: &str) -> Result<Table> {
        let url = format!(
            "{UK}/{}/leistungsdaten/spieler/{player_id}/plus/0?saison=ges",
            slugify(name)
        );
        parse_positions_played(&self.ctx.get_text(&url).await?, &url)
    }

    /// Penalties saved and conceded by a keeper across every pager page.
    pub async fn keeper_penalties(&self, name: &str, player_id: &str) -> Result<(Table, Table)> {
        let base = format!(
            "{AR}/{}/elfmeterstatistik/spieler/{player_id}/saison_id//wettbewerb_id//plus/1/page",
            slugify(name)
        );
        let first_url = format!("{base}/1");
        let first = self.ctx.get_text(&first_url).await?;
        let last_page = parse_last_page(&first, &base)?;
        info!("{name} has {last_page} penalty pages");

        let (mut saved, mut conceded) = parse_penalty_page(&first, &first_url)?;
        for page in 2..=last_page {
            let url = format!("{base}/{page}");
            let (more_saved, more_conceded) =
                parse_penalty_page(&self.ctx.get_text(&url).await?, &url)?;
            saved.extend(more_saved);
            conceded.extend(more_conceded);
        }
        Ok((saved.dedup(), conceded.dedup()))
    }

    pub async fn player_played_data(&self, name: &str, player_id: &str) -> Result<Table> {
        let url = format!(
            "{AR}/{}/leistungsdatendetails/spieler/{player_id}/{PLAYED_FILTERS}",
            slugify(name)
        );
        parse_played_data(&self.ctx.get_text(&url).await?, &url)
    }
}
