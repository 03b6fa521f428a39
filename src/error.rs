use thiserror::Error;

/// Caller input that failed validation. Always raised before any request is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{param} must be a string.\n{param} debe ser un string")]
    InvalidType { param: String },
    #[error("Page {page} is not supported. Possible pages are {valid:?}.")]
    UnknownPage { page: String, valid: Vec<String> },
    #[error("League {league} is not valid for any of the possible leagues {valid:?}.")]
    InvalidLeague { league: String, valid: Vec<String> },
    #[error("Season {season} is not valid for any of the possible seasons for this league {valid:?}.")]
    InvalidSeason { season: String, valid: Vec<String> },
    #[error("Value '{value}' for param '{param}' is invalid. Possible values are {allowed:?}.\nEl valor '{value}' para el parámetro '{param}' no es válido. Los valores válidos son: {allowed:?}")]
    InvalidStat {
        param: String,
        value: String,
        allowed: Vec<String>,
    },
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Match in path {path} doesn't have enough information for this functions, try with another one.\nEl partido en el path {path} no tiene la información para estas funciones, pruebe con otro.")]
    MatchMissingData { path: String },
    #[error("Player in path {path} doesn't have enough information for this functions, try with another one.\nEl jugador en el path {path} no tiene la información para estas funciones, pruebe con otro.")]
    PlayerMissingData { path: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

impl ScrapeError {
    pub fn match_missing(path: impl Into<String>) -> Self {
        Self::MatchMissingData { path: path.into() }
    }

    pub fn player_missing(path: impl Into<String>) -> Self {
        Self::PlayerMissingData { path: path.into() }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
