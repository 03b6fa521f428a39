pub mod charts;
pub mod jobs;
pub mod scraping;
