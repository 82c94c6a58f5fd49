//! cvscout storage crate - SQLite system of record for candidate profiles.
//!
//! Provides a WAL-mode SQLite database with migrations and a repository
//! that backs the candidate source/lookup interfaces used by search.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{CandidateRepository, ImportReport, SkippedCandidate};
