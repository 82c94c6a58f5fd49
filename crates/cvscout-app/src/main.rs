//! cvscout binary - composition root.
//!
//! 1. Load configuration from TOML and apply CLI overrides
//! 2. Open the SQLite candidate store
//! 3. Build the embedder, normalizer and vector index manager
//! 4. Run the requested subcommand

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use cvscout_core::config::CvScoutConfig;
use cvscout_core::types::NewCandidate;
use cvscout_storage::{CandidateRepository, Database};
use cvscout_vector::{
    CandidateSearch, CollectionStore, DynEmbeddingService, MockEmbedding, OnnxEmbeddingService,
    TextNormalizer, VectorIndexManager,
};

use cli::{CliArgs, Command};

/// Expand ~ to home directory in a path string.
fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

fn build_embedder(config: &CvScoutConfig) -> cvscout_core::Result<Arc<dyn DynEmbeddingService>> {
    let Some(model_dir) = config.search.model_dir.as_deref() else {
        tracing::warn!(
            model = %config.search.embedding_model,
            "No model_dir configured, using hash-based mock embeddings"
        );
        return Ok(Arc::new(MockEmbedding::with_dimensions(
            config.search.embedding_dim,
        )));
    };

    let service = OnnxEmbeddingService::from_directory(&expand_home(model_dir))?
        .with_model_id(config.search.embedding_model.clone());
    if DynEmbeddingService::dimensions(&service) != config.search.embedding_dim {
        tracing::warn!(
            configured = config.search.embedding_dim,
            model = DynEmbeddingService::dimensions(&service),
            "Model dimension differs from search.embedding_dim, using the model's"
        );
    }
    Ok(Arc::new(service))
}

fn read_candidates(path: &Path) -> cvscout_core::Result<Vec<NewCandidate>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> cvscout_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = CvScoutConfig::load_or_default(&config_file);
    if let Some(data_dir) = args.resolve_data_dir() {
        config.general.data_dir = data_dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.general.log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting cvscout v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_file.display(), "Configuration resolved");
    config.validate()?;

    // Storage.
    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join(&config.storage.database_file);
    let repo = CandidateRepository::new(Arc::new(Database::new(&db_path)?));

    // Search.
    let normalizer = TextNormalizer::from_config(&config.normalizer)?;
    let mut manager = VectorIndexManager::new_dyn(
        config.vector.collection_name.clone(),
        build_embedder(&config)?,
        Arc::new(normalizer),
    );
    if config.vector.persist {
        manager = manager.with_store(CollectionStore::new(data_dir.join("vectors")))?;
    }
    let search = CandidateSearch::new(Arc::new(manager), repo.clone(), &config.search);

    match args.command {
        Command::Import { file } => {
            let candidates = read_candidates(&file)?;
            let report = repo.save_batch(&candidates);
            tracing::info!(
                saved = report.saved.len(),
                skipped = report.skipped.len(),
                file = %file.display(),
                "Imported candidates"
            );

            let indexed = if report.saved.is_empty() {
                search.manager().document_count()
            } else {
                search.resync_from(&repo).await?
            };
            print_json(&serde_json::json!({
                "saved": report.saved,
                "skipped": report.skipped,
                "indexed": indexed,
            }))?;
        }
        Command::Resync => {
            let indexed = search.resync_from(&repo).await?;
            print_json(&serde_json::json!({ "indexed": indexed }))?;
        }
        Command::Search { query, top_k } => {
            let matches = search.search(&query, top_k).await?;
            print_json(&matches)?;
        }
        Command::Show { id } => match repo.find_by_id(id)? {
            Some(candidate) => print_json(&candidate)?,
            None => {
                tracing::error!(candidate_id = id, "Candidate not found");
                std::process::exit(1);
            }
        },
        Command::List => {
            print_json(&repo.list_all()?)?;
        }
    }

    Ok(())
}
