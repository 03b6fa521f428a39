//! One adapter per external site.
//!
//! Each adapter does its I/O through a [`SourceContext`] and hands the raw
//! payload to a pure `parse_*` function, so parsing is testable against
//! fixtures without a network.

pub mod datafactory;
pub mod fbref;
pub mod fotmob;
pub mod sofascore;
pub mod threesixfive;
pub mod transfermarkt;

use crate::domain::{Catalog, CatalogEntry, Page, SeasonId};
use crate::error::{Result, ScrapeError, ValidationError};
use crate::infrastructure::http::Fetch;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Shared plumbing for adapters: the fetcher, the catalog and the fixed delay
/// that precedes every request.
#[derive(Clone)]
pub struct SourceContext {
    fetcher: Arc<dyn Fetch>,
    catalog: Arc<Catalog>,
    delay: Duration,
}

impl SourceContext {
    pub fn new(fetcher: Arc<dyn Fetch>, catalog: Arc<Catalog>, delay: Duration) -> Self {
        Self {
            fetcher,
            catalog,
            delay,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn get_json(&self, url: &str) -> Result<Value> {
        sleep(self.delay).await;
        debug!("Requesting {url}");
        self.fetcher.get_json(url).await
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        sleep(self.delay).await;
        debug!("Requesting {url}");
        self.fetcher.get_text(url).await
    }

    pub fn league(&self, page: Page, league: &str) -> Result<&CatalogEntry> {
        Ok(self.catalog.lookup_league(page, league)?)
    }

    /// Resolves a league and a season that the page must track.
    pub fn league_season(
        &self,
        page: Page,
        league: &str,
        season: &str,
    ) -> Result<(&CatalogEntry, &SeasonId)> {
        let entry = self.catalog.lookup_league(page, league)?;
        let season_id = self
            .catalog
            .lookup_season(page, league, Some(season))?
            .ok_or_else(|| ValidationError::InvalidSeason {
                season: season.to_string(),
                valid: Vec::new(),
            })?;
        Ok((entry, season_id))
    }
}

/// Array at a JSON pointer, if present.
pub(crate) fn array_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a Vec<Value>> {
    value.pointer(pointer).and_then(Value::as_array)
}

pub(crate) fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

pub(crate) fn required_array<'a>(
    value: &'a Value,
    pointer: &str,
    what: &str,
) -> Result<&'a Vec<Value>> {
    array_at(value, pointer)
        .ok_or_else(|| ScrapeError::Parse(format!("{what}: missing array at {pointer}")))
}
