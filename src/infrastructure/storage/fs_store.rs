use crate::domain::Table;
use crate::error::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Writes result tables into one output directory, one dated file per table.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    output_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)?;
        }
        Ok(())
    }

    pub fn path_for(&self, name: &str, format: ExportFormat) -> PathBuf {
        let today = Local::now().format("%Y-%m-%d");
        self.output_dir.join(format!(
            "{}-{}.{}",
            sanitize_filename(name),
            today,
            format.extension()
        ))
    }

    pub fn save(&self, name: &str, table: &Table, format: ExportFormat) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.path_for(name, format);
        match format {
            ExportFormat::Csv => table.write_csv(&path)?,
            ExportFormat::Json => table.write_json(&path)?,
        }
        info!("Saved {} rows to {}", table.len(), path.display());
        Ok(path)
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
