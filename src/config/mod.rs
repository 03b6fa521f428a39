use crate::config::cli::Args;
use crate::domain::Catalog;
use crate::error::Result;
use crate::infrastructure::{build_client, FileSystemStore, HttpFetcher, SourceContext};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod cli;

pub struct Config {
    pub args: Args,
    pub catalog: Arc<Catalog>,
    pub http_client: Client,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let catalog = match &args.catalog {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::builtin()?,
        };
        let http_client = build_client(Duration::from_secs(args.timeout_secs))?;
        info!("Loaded catalog with {} pages", catalog.available_pages().len());

        Ok(Self {
            args,
            catalog: Arc::new(catalog),
            http_client,
        })
    }

    pub fn source_context(&self) -> SourceContext {
        SourceContext::new(
            Arc::new(HttpFetcher::new(self.http_client.clone())),
            self.catalog.clone(),
            Duration::from_millis(self.args.delay_ms),
        )
    }

    pub fn store(&self) -> FileSystemStore {
        FileSystemStore::new(self.args.output_dir.clone())
    }
}
