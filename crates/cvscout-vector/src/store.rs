//! On-disk snapshots of vector collections.
//!
//! Each collection is one JSON file, `<dir>/<name>.json`. A snapshot is
//! written to a sibling temp file first and renamed into place, so readers
//! only ever see a complete generation.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use cvscout_core::error::{CvScoutError, Result};

use crate::index::VectorCollection;

/// Directory of JSON collection snapshots, one file per collection.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    dir: PathBuf,
}

impl CollectionStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the snapshots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load the stored snapshot of `name`, if any.
    pub fn load(&self, name: &str) -> Result<Option<VectorCollection>> {
        let path = self.path_for(name);
        if !path.exists() {
            debug!(path = %path.display(), "No collection snapshot");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let collection: VectorCollection = serde_json::from_str(&content)?;
        if collection.name() != name {
            return Err(CvScoutError::Index(format!(
                "snapshot {} holds collection '{}', expected '{}'",
                path.display(),
                collection.name(),
                name
            )));
        }

        info!(
            collection = name,
            documents = collection.len(),
            "Loaded collection snapshot"
        );
        Ok(Some(collection))
    }

    /// Replace the stored snapshot with `collection`.
    pub fn replace(&self, collection: &VectorCollection) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(collection.name());
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string(collection)?;

        std::fs::write(&temp_path, json)?;
        match std::fs::rename(&temp_path, &path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                std::fs::remove_file(&path)?;
                if let Err(err) = std::fs::rename(&temp_path, &path) {
                    let _ = std::fs::remove_file(&temp_path);
                    return Err(err.into());
                }
            }
            Err(err) => {
                let _ = std::fs::remove_file(&temp_path);
                return Err(err.into());
            }
        }

        debug!(
            path = %path.display(),
            documents = collection.len(),
            "Wrote collection snapshot"
        );
        Ok(())
    }

    /// Delete the stored snapshot. Returns whether one existed.
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(collection = name, "Dropped collection snapshot");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
