pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::CvScoutConfig;
pub use error::{CvScoutError, Result};
pub use source::{CandidateLookup, CandidateSource};
pub use types::*;
