//! Owner of the published candidate collection.
//!
//! `resync` is the only write path. It builds a complete new collection off
//! to the side, persists it, and then swaps it in under a short write lock,
//! so queries see either the previous generation or the new one and never
//! a partial build. Concurrent resyncs are serialized.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use cvscout_core::error::{CvScoutError, Result};
use cvscout_core::types::CandidateRecord;

use crate::document::build_document;
use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::error::SearchError;
use crate::index::{RawHit, VectorCollection};
use crate::normalize::TextNormalizer;
use crate::search::SimilarityIndex;
use crate::store::CollectionStore;

/// Raw hits fetched per requested result, leaving room for dedup.
pub const OVER_FETCH_FACTOR: usize = 2;

/// Single owner of the published collection for one collection name.
pub struct VectorIndexManager {
    collection_name: String,
    embedder: Arc<dyn DynEmbeddingService>,
    normalizer: Arc<TextNormalizer>,
    /// `<model>/<dimensions>/<corrections digest>` stamped on every generation.
    fingerprint: String,
    store: Option<CollectionStore>,
    current: RwLock<Option<Arc<VectorCollection>>>,
    writer: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for VectorIndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndexManager")
            .field("collection_name", &self.collection_name)
            .field("fingerprint", &self.fingerprint)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl VectorIndexManager {
    /// Create a manager with no published collection and no persistence.
    pub fn new(
        collection_name: impl Into<String>,
        embedder: impl EmbeddingService + 'static,
        normalizer: TextNormalizer,
    ) -> Self {
        Self::new_dyn(collection_name, Arc::new(embedder), Arc::new(normalizer))
    }

    /// Create a manager from a pre-shared dynamic embedding service.
    pub fn new_dyn(
        collection_name: impl Into<String>,
        embedder: Arc<dyn DynEmbeddingService>,
        normalizer: Arc<TextNormalizer>,
    ) -> Self {
        let fingerprint = format!(
            "{}/{}/{}",
            embedder.model_id(),
            embedder.dimensions(),
            normalizer.fingerprint()
        );
        Self {
            collection_name: collection_name.into(),
            embedder,
            normalizer,
            fingerprint,
            store: None,
            current: RwLock::new(None),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    /// Persist generations to `store`, starting from its stored snapshot.
    ///
    /// A snapshot written by a different embedder, with a different
    /// dimension, or under a different correction table is ignored; the
    /// next resync overwrites it.
    pub fn with_store(mut self, store: CollectionStore) -> Result<Self> {
        if let Some(snapshot) = store.load(&self.collection_name)? {
            if snapshot.dimensions() != self.embedder.dimensions() {
                warn!(
                    collection = %self.collection_name,
                    stored = snapshot.dimensions(),
                    expected = self.embedder.dimensions(),
                    "Ignoring snapshot with mismatched dimensions, resync required"
                );
            } else if snapshot.fingerprint() != self.fingerprint {
                warn!(
                    collection = %self.collection_name,
                    stored = snapshot.fingerprint(),
                    expected = %self.fingerprint,
                    "Ignoring snapshot built by another embedder or correction table, resync required"
                );
            } else {
                self.publish(Arc::new(snapshot))?;
            }
        }
        self.store = Some(store);
        Ok(self)
    }

    /// Name of the managed collection.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Identity of the embedder and correction table behind new generations.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Rebuild the collection from `records`. Returns the document count.
    ///
    /// Records are deduplicated by candidate id (first wins) and candidates
    /// without derived text are skipped. When nothing is left to index the
    /// published collection is kept as is and 0 is returned. Embedding and
    /// persistence failures propagate and leave the published collection
    /// unchanged.
    pub async fn resync(&self, records: &[CandidateRecord]) -> Result<usize> {
        let _guard = self.writer.lock().await;

        let mut seen = HashSet::with_capacity(records.len());
        let mut documents = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.candidate_id) {
                debug!(
                    candidate_id = record.candidate_id,
                    "Skipping duplicate candidate in resync input"
                );
                continue;
            }
            match build_document(record) {
                Some(doc) => documents.push(doc),
                None => debug!(
                    candidate_id = record.candidate_id,
                    "Candidate has no searchable text"
                ),
            }
        }

        if documents.is_empty() {
            info!(
                collection = %self.collection_name,
                candidates = records.len(),
                "No documents to index, collection left untouched"
            );
            return Ok(0);
        }

        let mut next = VectorCollection::new(&self.collection_name, self.embedder.dimensions())
            .with_fingerprint(self.fingerprint.clone());
        for doc in documents {
            let text = self.normalizer.normalize(&doc.text);
            let embedding = self.embedder.embed_boxed(&text).await?;
            next.insert(text, embedding, doc.metadata.to_value())?;
        }

        if let Some(store) = &self.store {
            store.replace(&next)?;
        }

        let count = next.len();
        self.publish(Arc::new(next))?;

        info!(collection = %self.collection_name, count, "Resync complete");
        Ok(count)
    }

    /// Nearest-neighbour query for already-normalized `text`.
    ///
    /// Fetches `k * OVER_FETCH_FACTOR` raw hits, closest first.
    pub async fn query(&self, text: &str, k: usize) -> std::result::Result<Vec<RawHit>, SearchError> {
        let collection = self
            .snapshot_for_query()?
            .ok_or_else(|| SearchError::NotPopulated(self.collection_name.clone()))?;
        if collection.is_empty() {
            return Err(SearchError::NotPopulated(self.collection_name.clone()));
        }

        let embedding = self
            .embedder
            .embed_boxed(text)
            .await
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        collection.search(&embedding, k.saturating_mul(OVER_FETCH_FACTOR))
    }

    /// The currently published generation, if any.
    pub fn snapshot(&self) -> Option<Arc<VectorCollection>> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    /// Number of documents in the published generation.
    pub fn document_count(&self) -> usize {
        self.snapshot().map(|c| c.len()).unwrap_or(0)
    }

    /// Sorted candidate ids present in the published generation.
    pub fn candidate_ids(&self) -> Vec<i64> {
        self.snapshot()
            .map(|c| c.candidate_ids().into_iter().collect())
            .unwrap_or_default()
    }

    /// Normalizer applied to indexed text and to queries.
    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Unpublish the collection and delete its snapshot.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.writer.lock().await;
        if let Some(store) = &self.store {
            store.drop_collection(&self.collection_name)?;
        }
        let mut current = self
            .current
            .write()
            .map_err(|e| CvScoutError::Index(format!("Lock poisoned: {}", e)))?;
        *current = None;
        info!(collection = %self.collection_name, "Collection cleared");
        Ok(())
    }

    fn snapshot_for_query(&self) -> std::result::Result<Option<Arc<VectorCollection>>, SearchError> {
        self.current
            .read()
            .map(|current| current.clone())
            .map_err(|e| SearchError::Index(format!("Lock poisoned: {}", e)))
    }

    fn publish(&self, collection: Arc<VectorCollection>) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|e| CvScoutError::Index(format!("Lock poisoned: {}", e)))?;
        *current = Some(collection);
        Ok(())
    }
}

impl SimilarityIndex for VectorIndexManager {
    fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    async fn query(&self, text: &str, k: usize) -> std::result::Result<Vec<RawHit>, SearchError> {
        VectorIndexManager::query(self, text, k).await
    }
}
