// Artifact storage - atomic publish of rendered charts
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::constants;

/// Errors from artifact publication
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("artifact store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write-once artifact storage
///
/// `publish` must be atomic: a reader either sees the complete artifact at
/// the returned location or nothing, never a partial write.
pub trait ArtifactStore: Send + Sync {
    /// Durably store `bytes` under `key` and return a location reference
    /// the caller can resolve into the artifact
    fn publish(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, ArtifactError>;
}

/// Filesystem-backed artifact store
///
/// Publishes via temp file + rename so a crash mid-write leaves no partial
/// artifact behind the returned reference.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for FileArtifactStore {
    fn publish(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, ArtifactError> {
        if key.is_empty() || key != constants::sanitize_component(key) {
            return Err(ArtifactError::InvalidKey(key.to_string()));
        }

        let path = self.dir.join(key);
        let temp = path.with_extension("tmp");
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &path)?;

        debug!(
            "published artifact {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            content_type
        );
        Ok(path.display().to_string())
    }
}
