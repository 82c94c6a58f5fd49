//! In-memory vector collection with brute-force cosine search.
//!
//! A collection is built once per resync and then published read-only, so
//! it carries no interior locking. Search is O(n), which is fine for the
//! size of a candidate pool.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use cvscout_core::error::CvScoutError;

use crate::error::SearchError;

/// A raw nearest-neighbour hit: document text, metadata and distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub text: String,
    pub metadata: Value,
    /// Cosine distance, 0.0 for identical direction. Lower is closer.
    pub score: f64,
}

/// A stored document vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: Uuid,
    pub text: String,
    pub metadata: Value,
    pub embedding: Vec<f32>,
}

/// A named set of document vectors of one fixed dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorCollection {
    name: String,
    dimensions: usize,
    /// Identifies the embedder and text pipeline that produced the vectors.
    /// Empty in snapshots written before it was recorded.
    #[serde(default)]
    fingerprint: String,
    entries: Vec<CollectionEntry>,
}

impl VectorCollection {
    /// Create an empty collection of `dimensions`-sized vectors.
    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dimensions,
            fingerprint: String::new(),
            entries: Vec::new(),
        }
    }

    /// Record what produced the vectors in this collection.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vector length accepted by this collection.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Producer identity, empty when unknown.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in insertion order.
    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }

    /// Add a document vector under a fresh id.
    pub fn insert(
        &mut self,
        text: String,
        embedding: Vec<f32>,
        metadata: Value,
    ) -> Result<Uuid, CvScoutError> {
        if embedding.len() != self.dimensions {
            return Err(CvScoutError::Index(format!(
                "collection '{}' expects {}-dim vectors, got {}",
                self.name,
                self.dimensions,
                embedding.len()
            )));
        }
        let id = Uuid::new_v4();
        self.entries.push(CollectionEntry {
            id,
            text,
            metadata,
            embedding,
        });
        Ok(id)
    }

    /// Candidate ids referenced by the stored metadata.
    pub fn candidate_ids(&self) -> BTreeSet<i64> {
        self.entries
            .iter()
            .filter_map(|e| e.metadata.get("candidate_id").and_then(Value::as_i64))
            .collect()
    }

    /// Return up to `k` entries closest to `query`, ascending by distance.
    ///
    /// Ties keep storage order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RawHit>, SearchError> {
        if query.len() != self.dimensions {
            return Err(SearchError::Index(format!(
                "query has {} dimensions, collection '{}' has {}",
                query.len(),
                self.name,
                self.dimensions
            )));
        }

        let mut scored: Vec<(f64, &CollectionEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_distance(query, &entry.embedding), entry))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| RawHit {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                score,
            })
            .collect())
    }
}

/// Cosine distance, `1 - cosine similarity`.
///
/// A zero-magnitude vector is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_insert_and_search_order() {
        let mut collection = VectorCollection::new("candidates", 3);
        collection
            .insert("far".into(), vec![0.0, 1.0, 0.0], json!({"candidate_id": 1}))
            .unwrap();
        collection
            .insert("near".into(), vec![1.0, 0.1, 0.0], json!({"candidate_id": 2}))
            .unwrap();
        collection
            .insert("exact".into(), vec![1.0, 0.0, 0.0], json!({"candidate_id": 3}))
            .unwrap();

        let hits = collection.search(&[1.0, 0.0, 0.0], 10).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "near", "far"]);
        assert!(hits[0].score.abs() < 1e-9);
        assert!((hits[2].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let mut collection = VectorCollection::new("candidates", 4);
        for axis in 0..4 {
            collection
                .insert(format!("doc {}", axis), unit(4, axis), json!({}))
                .unwrap();
        }
        assert_eq!(collection.search(&unit(4, 0), 2).unwrap().len(), 2);
        assert!(collection.search(&unit(4, 0), 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut collection = VectorCollection::new("candidates", 2);
        for name in ["a", "b", "c"] {
            collection
                .insert(name.into(), vec![0.0, 1.0], json!({}))
                .unwrap();
        }
        let hits = collection.search(&[0.0, 1.0], 3).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let mut collection = VectorCollection::new("candidates", 3);
        let result = collection.insert("bad".into(), vec![1.0; 4], json!({}));
        assert!(matches!(result, Err(CvScoutError::Index(_))));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_search_rejects_wrong_dimension() {
        let collection = VectorCollection::new("candidates", 3);
        assert!(matches!(
            collection.search(&[1.0; 2], 1),
            Err(SearchError::Index(_))
        ));
    }

    #[test]
    fn test_candidate_ids() {
        let mut collection = VectorCollection::new("candidates", 2);
        collection
            .insert("x".into(), vec![1.0, 0.0], json!({"candidate_id": 7}))
            .unwrap();
        collection
            .insert("y".into(), vec![0.0, 1.0], json!({"candidate_id": 3}))
            .unwrap();
        collection
            .insert("z".into(), vec![1.0, 1.0], json!({"note": "no id"}))
            .unwrap();

        let ids: Vec<i64> = collection.candidate_ids().into_iter().collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_fingerprint_survives_serialization() {
        let collection = VectorCollection::new("candidates", 2).with_fingerprint("mock-hash/2/abc");
        let json = serde_json::to_string(&collection).unwrap();
        let back: VectorCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fingerprint(), "mock-hash/2/abc");

        let legacy: VectorCollection =
            serde_json::from_str(r#"{"name":"candidates","dimensions":2,"entries":[]}"#).unwrap();
        assert_eq!(legacy.fingerprint(), "");
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
    }
}
