use crate::domain::Table;
use crate::error::{Result, ScrapeError};
use crate::infrastructure::{FileSystemStore, SourceContext};
use crate::services::jobs::{Job, Sources};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

/// One table produced by a job, with the file it was written to.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub name: String,
    pub table: Table,
    pub saved: Option<PathBuf>,
}

pub struct ScrapingService {
    sources: Sources,
    store: FileSystemStore,
}

impl ScrapingService {
    pub fn new(ctx: SourceContext, store: FileSystemStore) -> Self {
        info!("Created new Scraping service");
        Self {
            sources: Sources::new(ctx),
            store,
        }
    }

    pub async fn run_job(&self, job: &Job) -> Result<Vec<JobResult>> {
        let outputs = self.sources.run(job).await?;
        let name = job.name();

        let mut results = Vec::with_capacity(outputs.len());
        for output in outputs {
            let name = match output.part {
                Some(part) => format!("{name}-{part}"),
                None => name.clone(),
            };
            let saved = if job.save {
                Some(self.store.save(&name, &output.table, job.format)?)
            } else {
                None
            };
            info!("{name}: {} rows", output.table.len());
            results.push(JobResult {
                name,
                table: output.table,
                saved,
            });
        }
        Ok(results)
    }

    /// Runs jobs in order and stops at the first failure.
    pub async fn run_all(&self, jobs: &[Job]) -> Result<Vec<JobResult>> {
        info!("Running {} jobs", jobs.len());
        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .map_err(|e| ScrapeError::Other(e.to_string()))?,
        );

        let mut results = Vec::new();
        for job in jobs {
            pb.set_message(job.name());
            match self.run_job(job).await {
                Ok(done) => results.extend(done),
                Err(e) => {
                    pb.abandon_with_message(format!("{} failed", job.name()));
                    return Err(e);
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message("Done scraping!");
        Ok(results)
    }
}
