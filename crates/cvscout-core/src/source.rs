//! Narrow interfaces onto the system of record.
//!
//! The search subsystem never talks to the relational store directly; it
//! pulls the full record set through [`CandidateSource`] when rebuilding the
//! index and resolves ranked ids through [`CandidateLookup`].

use crate::error::Result;
use crate::types::CandidateRecord;

/// Supplies every candidate record for a full index rebuild.
pub trait CandidateSource: Send + Sync {
    fn all_candidates(&self) -> Result<Vec<CandidateRecord>>;
}

/// Resolves a candidate id to its current record.
///
/// `Ok(None)` means the id no longer exists (deleted after indexing).
pub trait CandidateLookup: Send + Sync {
    fn get_candidate(&self, candidate_id: i64) -> Result<Option<CandidateRecord>>;
}

impl<T: CandidateSource + ?Sized> CandidateSource for std::sync::Arc<T> {
    fn all_candidates(&self) -> Result<Vec<CandidateRecord>> {
        (**self).all_candidates()
    }
}

impl<T: CandidateLookup + ?Sized> CandidateLookup for std::sync::Arc<T> {
    fn get_candidate(&self, candidate_id: i64) -> Result<Option<CandidateRecord>> {
        (**self).get_candidate(candidate_id)
    }
}
