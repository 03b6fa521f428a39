pub mod html;
pub mod http;
pub mod sources;
mod storage;

pub use http::{build_client, Fetch, HttpFetcher};
pub use sources::{
    datafactory::DataFactory, fbref::Fbref, fotmob::Fotmob, sofascore::Sofascore,
    threesixfive::ThreeSixFiveScores, transfermarkt::Transfermarkt, SourceContext,
};
pub use storage::fs_store::{ExportFormat, FileSystemStore};
