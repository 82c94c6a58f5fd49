//! Search executor: normalize, over-fetch, collapse to one hit per candidate.
//!
//! Result order is the order in which each candidate was first seen in the
//! raw nearest-neighbour list, not a re-sort by best score. A candidate's
//! score is still the best (lowest) of its hits.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use cvscout_core::error::CvScoutError;

use crate::error::SearchError;
use crate::index::RawHit;
use crate::normalize::TextNormalizer;

/// Result count used when the caller supplies none, or a non-positive one.
pub const DEFAULT_TOP_K: usize = 3;

/// One deduplicated result of a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub candidate_id: i64,
    /// Distance of the best matching document. Lower is closer.
    pub score: f64,
    /// Text of the best matching document.
    pub snippet: String,
}

/// The read side of a vector index as the executor sees it.
pub trait SimilarityIndex: Send + Sync {
    /// Normalizer applied to indexed text, which queries must share.
    fn normalizer(&self) -> &TextNormalizer;

    /// Nearest-neighbour query for already-normalized `text`.
    ///
    /// Implementations decide how many raw hits to fetch for `k`.
    fn query(
        &self,
        text: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<RawHit>, SearchError>> + Send;
}

/// Resolve a caller-supplied result count.
///
/// Missing or non-positive values fall back to `default`; anything above
/// `max` is clamped.
pub fn resolve_top_k(requested: Option<i64>, default: usize, max: usize) -> usize {
    match requested {
        Some(k) if k > 0 => usize::try_from(k).unwrap_or(max).min(max),
        _ => default.min(max),
    }
}

fn hit_candidate_id(metadata: &Value) -> Option<i64> {
    metadata.get("candidate_id").and_then(Value::as_i64)
}

/// Collapse raw hits to at most one per candidate, keeping up to `k`.
pub fn dedup_hits(raw: Vec<RawHit>, k: usize) -> Vec<SearchHit> {
    let mut order: Vec<SearchHit> = Vec::new();
    let mut position: HashMap<i64, usize> = HashMap::new();

    for hit in raw {
        let Some(candidate_id) = hit_candidate_id(&hit.metadata) else {
            debug!(snippet = %hit.text, "Discarding hit without candidate_id");
            continue;
        };

        match position.get(&candidate_id) {
            Some(&slot) => {
                if hit.score < order[slot].score {
                    order[slot].score = hit.score;
                    order[slot].snippet = hit.text;
                }
            }
            None => {
                position.insert(candidate_id, order.len());
                order.push(SearchHit {
                    candidate_id,
                    score: hit.score,
                    snippet: hit.text,
                });
            }
        }
    }

    order.truncate(k);
    order
}

/// Runs ranked candidate searches against a [`SimilarityIndex`].
pub struct SearchExecutor<I: SimilarityIndex> {
    index: Arc<I>,
    default_top_k: usize,
    max_top_k: usize,
}

impl<I: SimilarityIndex> SearchExecutor<I> {
    /// Executor over `index` with the built-in result limits.
    pub fn new(index: Arc<I>) -> Self {
        Self {
            index,
            default_top_k: DEFAULT_TOP_K,
            max_top_k: usize::MAX,
        }
    }

    /// Override the default and maximum result counts.
    pub fn with_limits(mut self, default_top_k: usize, max_top_k: usize) -> Self {
        self.max_top_k = max_top_k.max(1);
        self.default_top_k = default_top_k.clamp(1, self.max_top_k);
        self
    }

    /// The index queried by this executor.
    pub fn index(&self) -> &Arc<I> {
        &self.index
    }

    /// Search for the best matching candidates.
    ///
    /// A blank query is rejected. Index failures are logged and produce an
    /// empty result.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<i64>,
    ) -> Result<Vec<SearchHit>, CvScoutError> {
        if query.trim().is_empty() {
            return Err(CvScoutError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }

        let k = resolve_top_k(top_k, self.default_top_k, self.max_top_k);
        let normalized = self.index.normalizer().normalize(query);
        debug!(query = %normalized, k, "Running candidate search");

        let raw = match self.index.query(&normalized, k).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Similarity query failed, returning no results");
                return Ok(Vec::new());
            }
        };

        let raw_count = raw.len();
        let hits = dedup_hits(raw, k);
        debug!(raw = raw_count, hits = hits.len(), "Search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn raw(candidate_id: i64, score: f64) -> RawHit {
        RawHit {
            text: format!("doc for {} @ {}", candidate_id, score),
            metadata: json!({ "candidate_id": candidate_id }),
            score,
        }
    }

    /// Canned index that records the queries it receives.
    struct FakeIndex {
        normalizer: TextNormalizer,
        hits: Result<Vec<RawHit>, String>,
        seen: Mutex<Vec<(String, usize)>>,
    }

    impl FakeIndex {
        fn with_hits(hits: Vec<RawHit>) -> Self {
            Self {
                normalizer: TextNormalizer::default(),
                hits: Ok(hits),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                normalizer: TextNormalizer::default(),
                hits: Err("backend offline".to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl SimilarityIndex for FakeIndex {
        fn normalizer(&self) -> &TextNormalizer {
            &self.normalizer
        }

        async fn query(&self, text: &str, k: usize) -> Result<Vec<RawHit>, SearchError> {
            self.seen.lock().unwrap().push((text.to_string(), k));
            self.hits.clone().map_err(SearchError::Index)
        }
    }

    #[test]
    fn test_dedup_keeps_best_score_in_first_seen_order() {
        let hits = dedup_hits(vec![raw(5, 0.1), raw(5, 0.05), raw(7, 0.2)], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].candidate_id, 5);
        assert_eq!(hits[0].score, 0.05);
        assert_eq!(hits[0].snippet, "doc for 5 @ 0.05");
        assert_eq!(hits[1].candidate_id, 7);
        assert_eq!(hits[1].score, 0.2);
    }

    #[test]
    fn test_dedup_does_not_resort_by_score() {
        // 8 is seen first, so it stays first even though 9 scores better.
        let hits = dedup_hits(vec![raw(8, 0.4), raw(9, 0.1), raw(8, 0.3)], 5);
        let ids: Vec<i64> = hits.iter().map(|h| h.candidate_id).collect();
        assert_eq!(ids, vec![8, 9]);
        assert_eq!(hits[0].score, 0.3);
    }

    #[test]
    fn test_dedup_ties_keep_first() {
        let mut second = raw(4, 0.2);
        second.text = "later".to_string();
        let hits = dedup_hits(vec![raw(4, 0.2), second], 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet, "doc for 4 @ 0.2");
    }

    #[test]
    fn test_dedup_discards_hits_without_candidate_id() {
        let malformed = RawHit {
            text: "orphan".to_string(),
            metadata: json!({ "full_name": "Nobody" }),
            score: 0.0,
        };
        let hits = dedup_hits(vec![malformed, raw(1, 0.5)], 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].candidate_id, 1);
    }

    #[test]
    fn test_dedup_output_bounds() {
        let raw_hits = vec![
            raw(1, 0.3),
            raw(2, 0.2),
            raw(1, 0.1),
            raw(3, 0.4),
            raw(2, 0.5),
            raw(4, 0.6),
        ];
        for k in 0..6 {
            let hits = dedup_hits(raw_hits.clone(), k);
            let distinct: HashSet<i64> = hits.iter().map(|h| h.candidate_id).collect();
            assert_eq!(distinct.len(), hits.len());
            assert!(hits.len() <= k.min(4));
        }
    }

    #[test]
    fn test_resolve_top_k() {
        assert_eq!(resolve_top_k(None, 3, 100), 3);
        assert_eq!(resolve_top_k(Some(0), 3, 100), 3);
        assert_eq!(resolve_top_k(Some(-4), 3, 100), 3);
        assert_eq!(resolve_top_k(Some(10), 3, 100), 10);
        assert_eq!(resolve_top_k(Some(1_000), 3, 100), 100);
    }

    #[tokio::test]
    async fn test_search_normalizes_query_and_uses_k() {
        let index = Arc::new(FakeIndex::with_hits(vec![
            raw(5, 0.1),
            raw(5, 0.05),
            raw(7, 0.2),
        ]));
        let executor = SearchExecutor::new(Arc::clone(&index));

        let hits = executor.search("pythn developer", Some(2)).await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.candidate_id).collect();
        assert_eq!(ids, vec![5, 7]);

        let seen = index.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("Python developer".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_search_defaults_invalid_k() {
        let index = Arc::new(FakeIndex::with_hits(vec![]));
        let executor = SearchExecutor::new(Arc::clone(&index));

        executor.search("rust", None).await.unwrap();
        executor.search("rust", Some(-1)).await.unwrap();

        let seen = index.seen.lock().unwrap();
        assert!(seen.iter().all(|(_, k)| *k == DEFAULT_TOP_K));
    }

    #[tokio::test]
    async fn test_search_applies_limits() {
        let index = Arc::new(FakeIndex::with_hits(vec![]));
        let executor = SearchExecutor::new(Arc::clone(&index)).with_limits(5, 10);

        executor.search("rust", None).await.unwrap();
        executor.search("rust", Some(50)).await.unwrap();

        let seen = index.seen.lock().unwrap();
        let ks: Vec<usize> = seen.iter().map(|(_, k)| *k).collect();
        assert_eq!(ks, vec![5, 10]);
    }

    #[tokio::test]
    async fn test_search_rejects_blank_query() {
        let index = Arc::new(FakeIndex::with_hits(vec![raw(1, 0.1)]));
        let executor = SearchExecutor::new(Arc::clone(&index));

        let result = executor.search("   ", Some(3)).await;
        assert!(matches!(result, Err(CvScoutError::InvalidQuery(_))));
        assert!(index.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_degrades_to_empty_on_index_failure() {
        let executor = SearchExecutor::new(Arc::new(FakeIndex::failing()));
        let hits = executor.search("python", Some(3)).await.unwrap();
        assert!(hits.is_empty());
    }
}
