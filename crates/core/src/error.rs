use thiserror::Error;

pub type InsightsResult<T> = Result<T, InsightsError>;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid signup date {value}: expected an 8-digit YYYYMMDD value")]
    InvalidSignupDate { value: i64 },

    #[error("Unknown offer identifier: {0}")]
    UnknownOffer(String),

    #[error("Data validation error: {0}")]
    Validation(String),

    #[error("Ingestion error at {source_name}:{line}: {message}")]
    Ingest {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
