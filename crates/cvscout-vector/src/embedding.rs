//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` runs a sentence-transformer export (the default
//!   is all-MiniLM-L6-v2) through ONNX Runtime, tokenizing with the
//!   HuggingFace tokenizers crate.
//! - `MockEmbedding` hashes text into deterministic unit vectors for tests
//!   and for running without a model on disk.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tracing::info;

use cvscout_core::error::CvScoutError;

const DEFAULT_DIMENSIONS: usize = 384;

/// Converts text into fixed-dimension vectors.
///
/// The same service must embed both indexed documents and queries.
pub trait EmbeddingService: Send + Sync {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, CvScoutError>> + Send;

    fn dimensions(&self) -> usize;

    /// Name of the model behind the vectors. Vectors from different models
    /// are not comparable even when their dimensions agree.
    fn model_id(&self) -> &str;
}

/// Object-safe counterpart of [`EmbeddingService`].
///
/// `EmbeddingService::embed` returns `impl Future`, which rules out
/// `dyn EmbeddingService`; this trait boxes the future instead. Every
/// `EmbeddingService` gets it through the blanket impl below.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, CvScoutError>> + Send + 'a>>;

    fn dimensions(&self) -> usize;

    fn model_id(&self) -> &str;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, CvScoutError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }

    fn model_id(&self) -> &str {
        EmbeddingService::model_id(self)
    }
}

/// Scale `values` to unit length in place. Zero vectors are left as is.
pub(crate) fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService
// ---------------------------------------------------------------------------

/// ONNX Runtime sentence-transformer embedding.
///
/// The model directory must contain `model.onnx` and `tokenizer.json`. The
/// model takes `input_ids`, `attention_mask` and `token_type_ids` and emits
/// token embeddings, which are mean-pooled over the attention mask and
/// L2-normalized.
pub struct OnnxEmbeddingService {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    dimensions: usize,
    model_id: String,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("model_id", &self.model_id)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    ///
    /// The model id defaults to the directory name.
    pub fn from_directory(model_dir: &Path) -> Result<Self, CvScoutError> {
        let service = Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
        )?;
        match model_dir.file_name() {
            Some(name) => Ok(service.with_model_id(name.to_string_lossy())),
            None => Ok(service),
        }
    }

    /// Override the model id recorded with indexed vectors.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Load a model and tokenizer from explicit file paths.
    pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self, CvScoutError> {
        if !model_path.exists() {
            return Err(CvScoutError::Embedding(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(CvScoutError::Embedding(format!(
                "Tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| CvScoutError::Embedding(format!("ONNX session builder: {}", e)))?
            .with_intra_threads(1)
            .map_err(|e| CvScoutError::Embedding(format!("ONNX set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| CvScoutError::Embedding(format!("ONNX load model: {}", e)))?;

        // Output is [batch, seq_len, hidden]; the hidden size is the last axis.
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { DEFAULT_DIMENSIONS })
            .unwrap_or(DEFAULT_DIMENSIONS);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| CvScoutError::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            dimensions,
            model_id: model_path.display().to_string(),
        })
    }

    fn embed_sync(
        session: &Mutex<Session>,
        tokenizer: &Tokenizer,
        text: &str,
    ) -> Result<Vec<f32>, CvScoutError> {
        if text.trim().is_empty() {
            return Err(CvScoutError::Embedding("Cannot embed empty text".to_string()));
        }

        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| CvScoutError::Embedding(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();
        let seq_len = input_ids.len();

        let shape_err = |name: &str, e: ndarray::ShapeError| {
            CvScoutError::Embedding(format!("{} array: {}", name, e))
        };
        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| shape_err("input_ids", e))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(|e| shape_err("attention_mask", e))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| shape_err("token_type_ids", e))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| CvScoutError::Embedding(format!("TensorRef input_ids: {}", e)))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| CvScoutError::Embedding(format!("TensorRef attention_mask: {}", e)))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| CvScoutError::Embedding(format!("TensorRef token_type_ids: {}", e)))?;

        let mut session = session
            .lock()
            .map_err(|e| CvScoutError::Embedding(format!("Session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| CvScoutError::Embedding(format!("ONNX inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| CvScoutError::Embedding(format!("Extract embeddings: {}", e)))?;

        let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
            [_, .., last] if *last > 0 => *last as usize,
            other => {
                return Err(CvScoutError::Embedding(format!(
                    "Unexpected output shape: {:?}",
                    other
                )))
            }
        };

        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for (dim, slot) in pooled.iter_mut().enumerate() {
                    *slot += data[offset + dim];
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CvScoutError> {
        // Inference is CPU-bound; keep it off the async workers.
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || Self::embed_sync(&session, &tokenizer, &text))
            .await
            .map_err(|e| CvScoutError::Embedding(format!("Embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding
// ---------------------------------------------------------------------------

/// Deterministic hash-based embedding.
///
/// Identical inputs always map to identical unit vectors, so exact-text
/// queries find their document at distance zero.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedding {
    /// 384-dimensional mock, the size of all-MiniLM-L6-v2.
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    /// Mock producing vectors of `dimensions` (at least 1).
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result: Vec<f32> = (0..self.dimensions)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                let h = hasher.finish();
                (((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0) as f32
            })
            .collect();
        l2_normalize(&mut result);
        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CvScoutError> {
        if text.trim().is_empty() {
            return Err(CvScoutError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "mock-hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_dimension() {
        let service = MockEmbedding::new();
        let vec = service.embed("Skills: Python").await.unwrap();
        assert_eq!(vec.len(), 384);

        let small = MockEmbedding::with_dimensions(8);
        assert_eq!(small.embed("Skills: Python").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_mock_embedding_deterministic() {
        let service = MockEmbedding::new();
        let v1 = service.embed("same text").await.unwrap();
        let v2 = service.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_different_inputs() {
        let service = MockEmbedding::new();
        let v1 = service.embed("text one").await.unwrap();
        let v2 = service.embed("text two").await.unwrap();
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_is_unit_length() {
        let service = MockEmbedding::new();
        let vec = service.embed("unit").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_mock_embedding_blank_text() {
        let service = MockEmbedding::new();
        assert!(service.embed("").await.is_err());
        assert!(service.embed("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_dyn_dispatch() {
        let service: Box<dyn DynEmbeddingService> = Box::new(MockEmbedding::with_dimensions(16));
        assert_eq!(service.dimensions(), 16);
        assert_eq!(service.model_id(), "mock-hash");
        assert_eq!(service.embed_boxed("boxed").await.unwrap().len(), 16);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut zeros = vec![0.0f32; 4];
        l2_normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0; 4]);
    }

    #[test]
    fn test_onnx_missing_model() {
        let result = OnnxEmbeddingService::from_directory(Path::new("/nonexistent"));
        assert!(matches!(result, Err(CvScoutError::Embedding(_))));
    }
}
