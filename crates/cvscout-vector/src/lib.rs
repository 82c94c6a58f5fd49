//! cvscout vector crate - candidate embedding index and semantic search.
//!
//! Write path: candidate records -> embedding documents -> normalized text
//! -> embeddings -> a freshly built collection that replaces the published
//! one in a single swap.
//!
//! Read path: query -> normalizer -> nearest-neighbour search (over-fetched)
//! -> per-candidate dedup -> hydration from the system of record.

pub mod document;
pub mod embedding;
pub mod error;
pub mod hydrate;
pub mod index;
pub mod manager;
pub mod normalize;
pub mod search;
pub mod service;
pub mod store;

pub use document::{build_document, DocumentMetadata, EmbeddingDocument};
pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OnnxEmbeddingService};
pub use error::SearchError;
pub use hydrate::ResultHydrator;
pub use index::{RawHit, VectorCollection};
pub use manager::{VectorIndexManager, OVER_FETCH_FACTOR};
pub use normalize::TextNormalizer;
pub use search::{dedup_hits, SearchExecutor, SearchHit, SimilarityIndex, DEFAULT_TOP_K};
pub use service::CandidateSearch;
pub use store::CollectionStore;
