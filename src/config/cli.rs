use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Catalog file to use instead of the built-in one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Directory to store output tables
    #[arg(long, global = true, default_value = "data")]
    pub output_dir: PathBuf,

    /// Pause before every request, in milliseconds
    #[arg(long, global = true, env = "FOOTSTATS_DELAY_MS", default_value_t = 3000)]
    pub delay_ms: u64,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the pages in the catalog
    Pages,
    /// List the leagues of a page
    Leagues { page: String },
    /// List the seasons of a league
    Seasons { page: String, league: String },
    /// Run the jobs in a jobs file
    Run {
        #[arg(long)]
        jobs: PathBuf,
    },
}
