//! Timestamped marker files.
//!
//! `/writeStatic/{id}` drops a file named `id` into a fixed directory
//! containing `"<timestamp>: <id>"`. Used to check that the directory is
//! mounted and writable.

use std::path::PathBuf;

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Errors from writing a marker file.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("No staticID given")]
    MissingId,

    #[error("Invalid staticID {0:?}")]
    InvalidId(String),

    #[error("Unable to write file: {}", path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to write content to file {}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Writes marker files into one directory.
#[derive(Debug, Clone)]
pub struct MarkerWriter {
    dir: PathBuf,
}

impl MarkerWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create (or truncate) `<dir>/<id>` and write the marker line.
    ///
    /// `id` must be a plain file name.
    pub async fn write(&self, id: &str) -> Result<PathBuf, MarkerError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(MarkerError::MissingId);
        }
        if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(MarkerError::InvalidId(id.to_string()));
        }

        let path = self.dir.join(id);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|source| MarkerError::Create {
                path: path.clone(),
                source,
            })?;

        let line = format!("{}: {}", Local::now().to_rfc3339(), id);
        let write_failed = |source| MarkerError::Write {
            path: path.clone(),
            source,
        };
        file.write_all(line.as_bytes()).await.map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;

        debug!(path = %path.display(), "wrote marker file");
        Ok(path)
    }
}
