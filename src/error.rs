use thiserror::Error;

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::prelude::PolarsError> for CensusError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        CensusError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
