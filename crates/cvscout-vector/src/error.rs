use thiserror::Error;

use cvscout_core::error::CvScoutError;

/// Failures on the similarity-query path.
///
/// These never reach search callers: the executor turns them into an empty
/// result set and a warning.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("collection '{0}' has not been populated")]
    NotPopulated(String),
    #[error("query embedding failed: {0}")]
    Embedding(String),
    #[error("index query failed: {0}")]
    Index(String),
}

impl From<SearchError> for CvScoutError {
    fn from(err: SearchError) -> Self {
        CvScoutError::Search(err.to_string())
    }
}
