//! Candidate search facade: executor plus hydrator over one index manager.

use std::sync::Arc;

use tracing::info;

use cvscout_core::config::SearchConfig;
use cvscout_core::error::Result;
use cvscout_core::source::{CandidateLookup, CandidateSource};
use cvscout_core::types::CandidateMatch;

use crate::hydrate::ResultHydrator;
use crate::manager::VectorIndexManager;
use crate::search::SearchExecutor;

pub struct CandidateSearch<L: CandidateLookup> {
    manager: Arc<VectorIndexManager>,
    executor: SearchExecutor<VectorIndexManager>,
    hydrator: ResultHydrator<L>,
}

impl<L: CandidateLookup> CandidateSearch<L> {
    /// Wire `manager` and `lookup` together with the limits from `config`.
    pub fn new(manager: Arc<VectorIndexManager>, lookup: L, config: &SearchConfig) -> Self {
        let executor = SearchExecutor::new(Arc::clone(&manager))
            .with_limits(config.default_top_k, config.max_top_k);
        Self {
            manager,
            executor,
            hydrator: ResultHydrator::new(lookup),
        }
    }

    /// The index manager behind this facade.
    pub fn manager(&self) -> &Arc<VectorIndexManager> {
        &self.manager
    }

    /// Rebuild the index from every record in `source`.
    pub async fn resync_from(&self, source: &dyn CandidateSource) -> Result<usize> {
        let records = source.all_candidates()?;
        info!(candidates = records.len(), "Resyncing index from candidate store");
        self.manager.resync(&records).await
    }

    /// Ranked, hydrated search results for `query`.
    ///
    /// `similarity_score` is the distance of each candidate's best document.
    pub async fn search(&self, query: &str, top_k: Option<i64>) -> Result<Vec<CandidateMatch>> {
        let hits = self.executor.search(query, top_k).await?;
        Ok(self.hydrator.hydrate(&hits))
    }
}
