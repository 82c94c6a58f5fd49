use thiserror::Error;

/// Top-level error type for cvscout.
///
/// Subsystem crates keep their own narrower error types (for example the
/// vector crate's `SearchError`) and convert into this one at crate
/// boundaries so that `?` works across the workspace.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CvScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CvScoutError {
    fn from(err: toml::de::Error) -> Self {
        CvScoutError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CvScoutError {
    fn from(err: toml::ser::Error) -> Self {
        CvScoutError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CvScoutError {
    fn from(err: serde_json::Error) -> Self {
        CvScoutError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for cvscout operations.
pub type Result<T> = std::result::Result<T, CvScoutError>;
