#![allow(dead_code)]

use async_trait::async_trait;
use footstats::error::{Result, ScrapeError};
use footstats::infrastructure::{Fetch, SourceContext};
use footstats::Catalog;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CATALOG: &str = r#"{
    "Sofascore": {
        "Liga Profesional": {"id": 155, "seasons": {"2024": 57478, "2023": 47647}}
    },
    "Fotmob": {
        "Liga Profesional": {"id": 112, "seasons": {"2024": "2024", "2023": "2023"}}
    },
    "Transfermarkt": {
        "Liga Profesional": {"id": "ARG1", "slug": "torneo-inicial", "seasons": null}
    },
    "Fbref": {
        "Liga Profesional": {"id": 21, "slug": "Primera-Division", "seasons": {"2024": "2024"}}
    },
    "DataFactory": {
        "Liga Profesional Argentina": {"id": "arg", "slug": "primeraa", "seasons": null}
    }
}"#;

/// Serves canned bodies by URL fragment and records every URL asked for.
#[derive(Default)]
pub struct FixtureFetcher {
    responses: Vec<(String, String)>,
    requests: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fragment: &str, body: Value) -> Self {
        self.responses.push((fragment.to_string(), body.to_string()));
        self
    }

    pub fn with_text(mut self, fragment: &str, body: &str) -> Self {
        self.responses.push((fragment.to_string(), body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for FixtureFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| ScrapeError::Other(format!("no fixture for {url}")))
    }
}

pub fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_json(CATALOG).unwrap())
}

pub fn context(fetcher: Arc<FixtureFetcher>, delay: Duration) -> SourceContext {
    SourceContext::new(fetcher, catalog(), delay)
}
