//! CLI argument definitions for the cvscout binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cvscout - semantic search over parsed resumes.
#[derive(Parser, Debug)]
#[command(name = "cvscout", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the SQLite database and vector snapshots.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Save candidate profiles from a JSON array file, then rebuild the index.
    Import {
        /// File holding an array of candidate profiles.
        file: PathBuf,
    },
    /// Rebuild the vector index from every stored candidate.
    Resync,
    /// Search candidates by free text.
    Search {
        query: String,
        /// Number of candidates to return.
        #[arg(short = 'k', long = "top-k", allow_negative_numbers = true)]
        top_k: Option<i64>,
    },
    /// Print one stored candidate.
    Show { id: i64 },
    /// List stored candidates.
    List,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CVSCOUT_CONFIG env var > ~/.cvscout/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CVSCOUT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Data directory override, if given.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Log level override, if given.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".cvscout").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cvscout").join("config.toml");
    }
    PathBuf::from("config.toml")
}
