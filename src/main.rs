use clap::Parser;
use footstats::config::cli::{Args, Command};
use footstats::config::Config;
use footstats::error::Result;
use footstats::services::jobs::JobsFile;
use footstats::services::scraping::ScrapingService;
use footstats::Page;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = args.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::from_args(args)?;
    match &config.args.command {
        Command::Pages => {
            for page in config.catalog.available_pages() {
                println!("{page}");
            }
        }
        Command::Leagues { page } => {
            for league in config.catalog.available_leagues(page.parse::<Page>()?)? {
                println!("{league}");
            }
        }
        Command::Seasons { page, league } => {
            match config.catalog.available_seasons(page.parse::<Page>()?, league)? {
                Some(seasons) => seasons.iter().for_each(|season| println!("{season}")),
                None => println!("{page} does not browse {league} by season"),
            }
        }
        Command::Run { jobs } => {
            let jobs = JobsFile::from_path(jobs)?;
            let scraping = ScrapingService::new(config.source_context(), config.store());
            let results = scraping.run_all(&jobs.jobs).await?;
            info!(
                "Scraping completed successfully: {} tables from {} jobs",
                results.len(),
                jobs.jobs.len()
            );
        }
    }

    Ok(())
}
