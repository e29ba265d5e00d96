use thiserror::Error;

/// Errors surfaced by the read services to the HTTP layer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("market not found: {0}")]
    MarketNotFound(String),
    #[error("unsupported interval length: {0} minutes")]
    InvalidLength(u32),
    #[error("storage error: {0}")]
    Storage(eyre::Report),
}

impl From<eyre::Report> for QueryError {
    fn from(err: eyre::Report) -> Self {
        QueryError::Storage(err)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event {kind} is missing attribute {key}")]
    MissingAttribute { kind: String, key: String },
}
