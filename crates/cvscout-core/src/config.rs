use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CvScoutError, Result};

/// Top-level configuration for cvscout.
///
/// Loaded from `~/.cvscout/config.toml` by default. Every section falls back
/// to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvScoutConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

impl CvScoutConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CvScoutConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.search.default_top_k == 0 {
            return Err(CvScoutError::Config(
                "search.default_top_k must be at least 1".to_string(),
            ));
        }
        if self.search.default_top_k > self.search.max_top_k {
            return Err(CvScoutError::Config(format!(
                "search.default_top_k ({}) exceeds search.max_top_k ({})",
                self.search.default_top_k, self.search.max_top_k
            )));
        }
        if self.vector.collection_name.trim().is_empty() {
            return Err(CvScoutError::Config(
                "vector.collection_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database and vector snapshots.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.cvscout/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file name, relative to the data directory.
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "cvscout.db".to_string(),
        }
    }
}

/// Vector collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Name of the embedding collection.
    pub collection_name: String,
    /// Persist collection snapshots under `<data_dir>/vectors/`.
    pub persist: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            collection_name: "candidates".to_string(),
            persist: true,
        }
    }
}

/// Search and embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Embedding model name.
    pub embedding_model: String,
    /// Embedding dimension.
    pub embedding_dim: usize,
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: Option<String>,
    /// Result count used when the caller gives none (or a non-positive one).
    pub default_top_k: usize,
    /// Upper bound on the result count.
    pub max_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dim: 384,
            model_dir: None,
            default_top_k: 3,
            max_top_k: 100,
        }
    }
}

/// Query/document text normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Known misspelling (matched case-insensitively) -> canonical term.
    pub corrections: BTreeMap<String, String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            corrections: default_corrections(),
        }
    }
}

/// Built-in skill-name corrections.
pub fn default_corrections() -> BTreeMap<String, String> {
    [
        ("pythn", "Python"),
        ("pytn", "Python"),
        ("jvascript", "JavaScript"),
        ("js", "JavaScript"),
        ("squel", "SQL"),
        ("jva", "Java"),
        ("awz", "AWS"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
