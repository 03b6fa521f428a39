use crate::domain::validate::closest_match;
use crate::error::{Result, ScrapeError, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

const BUILTIN_CATALOG: &str = include_str!("../../resources/catalog.json");

/// The external sites a catalog can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Page {
    Fbref,
    Sofascore,
    #[serde(rename = "365Scores")]
    ThreeSixFiveScores,
    Fotmob,
    Transfermarkt,
    DataFactory,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Fbref,
        Page::Sofascore,
        Page::ThreeSixFiveScores,
        Page::Fotmob,
        Page::Transfermarkt,
        Page::DataFactory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Page::Fbref => "Fbref",
            Page::Sofascore => "Sofascore",
            Page::ThreeSixFiveScores => "365Scores",
            Page::Fotmob => "Fotmob",
            Page::Transfermarkt => "Transfermarkt",
            Page::DataFactory => "DataFactory",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Page {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.name() == s)
            .ok_or_else(|| ValidationError::UnknownPage {
                page: s.to_string(),
                valid: Page::ALL.iter().map(|p| p.name().to_string()).collect(),
            })
    }
}

/// A site identifier. Some sites key leagues by number, others by a code or slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SiteId {
    Number(u64),
    Text(String),
}

pub type SeasonId = SiteId;

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteId::Number(n) => write!(f, "{n}"),
            SiteId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: SiteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// `None` when the page does not browse by season.
    #[serde(default)]
    pub seasons: Option<BTreeMap<String, SeasonId>>,
}

impl CatalogEntry {
    pub fn slug(&self) -> Result<&str> {
        self.slug
            .as_deref()
            .ok_or_else(|| ScrapeError::Other(format!("catalog entry {} has no slug", self.id)))
    }
}

pub type Leagues = BTreeMap<String, CatalogEntry>;

/// A league resolved against the catalog, with its season id when one was asked for.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub league: &'a str,
    pub entry: &'a CatalogEntry,
    pub season: Option<&'a SeasonId>,
}

/// Read-only mapping of page → league → site identifiers.
///
/// Built once at startup and shared behind an `Arc`; tests build their own
/// from JSON to swap in a smaller catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Leagues>", into = "BTreeMap<String, Leagues>")]
pub struct Catalog {
    pages: BTreeMap<Page, Leagues>,
}

impl TryFrom<BTreeMap<String, Leagues>> for Catalog {
    type Error = String;

    fn try_from(raw: BTreeMap<String, Leagues>) -> std::result::Result<Self, Self::Error> {
        let mut pages = BTreeMap::new();
        for (name, leagues) in raw {
            let page = Page::from_str(&name).map_err(|e| e.to_string())?;
            for (league, entry) in &leagues {
                if let SiteId::Text(id) = &entry.id {
                    if id.is_empty() {
                        return Err(format!("{page}/{league}: empty id"));
                    }
                }
                if entry.seasons.as_ref().is_some_and(|s| s.is_empty()) {
                    return Err(format!("{page}/{league}: seasons must be null or non-empty"));
                }
            }
            pages.insert(page, leagues);
        }
        Ok(Self { pages })
    }
}

impl From<Catalog> for BTreeMap<String, Leagues> {
    fn from(catalog: Catalog) -> Self {
        catalog
            .pages
            .into_iter()
            .map(|(page, leagues)| (page.name().to_string(), leagues))
            .collect()
    }
}

impl Catalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading catalog from {}", path.display());
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn available_pages(&self) -> Vec<Page> {
        self.pages.keys().copied().collect()
    }

    pub fn available_leagues(
        &self,
        page: Page,
    ) -> std::result::Result<Vec<String>, ValidationError> {
        Ok(self.lookup_page(page)?.keys().cloned().collect())
    }

    /// Season labels for a league, or `None` when the page does not track seasons.
    pub fn available_seasons(
        &self,
        page: Page,
        league: &str,
    ) -> std::result::Result<Option<Vec<String>>, ValidationError> {
        let entry = self.lookup_league(page, league)?;
        Ok(entry.seasons.as_ref().map(|s| s.keys().cloned().collect()))
    }

    pub fn lookup_page(&self, page: Page) -> std::result::Result<&Leagues, ValidationError> {
        self.pages
            .get(&page)
            .filter(|leagues| !leagues.is_empty())
            .ok_or_else(|| ValidationError::UnknownPage {
                page: page.name().to_string(),
                valid: self.pages.keys().map(|p| p.name().to_string()).collect(),
            })
    }

    pub fn lookup_page_by_name(
        &self,
        page: &str,
    ) -> std::result::Result<&Leagues, ValidationError> {
        self.lookup_page(page.parse()?)
    }

    pub fn lookup_league(
        &self,
        page: Page,
        league: &str,
    ) -> std::result::Result<&CatalogEntry, ValidationError> {
        let leagues = self.lookup_page(page)?;
        leagues.get(league).ok_or_else(|| {
            if let Some(hint) = closest_match(league, leagues.keys().map(String::as_str)) {
                warn!("League '{league}' not found for {page}, did you mean '{hint}'?");
            }
            ValidationError::InvalidLeague {
                league: league.to_string(),
                valid: leagues.keys().cloned().collect(),
            }
        })
    }

    /// Resolves a season label to its site id.
    ///
    /// Returns `Ok(None)` when no season was given or the page does not scope by season.
    pub fn lookup_season(
        &self,
        page: Page,
        league: &str,
        season: Option<&str>,
    ) -> std::result::Result<Option<&SeasonId>, ValidationError> {
        let entry = self.lookup_league(page, league)?;
        match (season, entry.seasons.as_ref()) {
            (Some(season), Some(seasons)) => seasons
                .get(season)
                .map(Some)
                .ok_or_else(|| ValidationError::InvalidSeason {
                    season: season.to_string(),
                    valid: seasons.keys().cloned().collect(),
                }),
            _ => Ok(None),
        }
    }

    pub fn resolve<'a>(
        &'a self,
        page: Page,
        league: &'a str,
        season: Option<&str>,
    ) -> std::result::Result<Resolved<'a>, ValidationError> {
        let entry = self.lookup_league(page, league)?;
        let season = self.lookup_season(page, league, season)?;
        Ok(Resolved {
            league,
            entry,
            season,
        })
    }
}
