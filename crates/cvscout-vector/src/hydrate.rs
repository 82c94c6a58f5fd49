//! Joins search hits back to full records from the system of record.

use tracing::{debug, warn};

use cvscout_core::source::CandidateLookup;
use cvscout_core::types::CandidateMatch;

use crate::search::SearchHit;

/// Resolves search hits to full candidate profiles, keeping hit order.
pub struct ResultHydrator<L: CandidateLookup> {
    lookup: L,
}

impl<L: CandidateLookup> ResultHydrator<L> {
    /// Hydrator reading profiles from `lookup`.
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Resolve each hit to its record, preserving hit order.
    ///
    /// Hits whose candidate no longer exists are dropped. The index is only
    /// rebuilt on resync, so stale ids are expected. Lookup failures are
    /// logged and the hit is dropped as well.
    pub fn hydrate(&self, hits: &[SearchHit]) -> Vec<CandidateMatch> {
        let mut matches = Vec::with_capacity(hits.len());

        for hit in hits {
            match self.lookup.get_candidate(hit.candidate_id) {
                Ok(Some(record)) => matches.push(CandidateMatch::from_record(record, hit.score)),
                Ok(None) => {
                    debug!(candidate_id = hit.candidate_id, "Dropping stale search hit");
                }
                Err(e) => {
                    warn!(
                        candidate_id = hit.candidate_id,
                        error = %e,
                        "Candidate lookup failed, dropping search hit"
                    );
                }
            }
        }

        matches
    }
}
