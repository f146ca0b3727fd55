use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("events listing yielded no tournaments")]
    NoSeedData,
}

pub type Result<T> = std::result::Result<T, ScraperError>;

/// Failure of a single row or card block. Contained by the caller: the unit
/// is logged and skipped, siblings are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {0} cells, expected at least 5")]
    TooFewCells(usize),

    #[error("unexpected cell count {0}")]
    ShapeMismatch(usize),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("expected exactly 4 moves, found {0}")]
    MoveArity(usize),
}
