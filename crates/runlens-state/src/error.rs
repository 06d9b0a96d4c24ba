//! Checkpoint read error types.

use std::path::{Path, PathBuf};

use rusqlite::ErrorCode;

/// Errors produced while reading checkpoint artifacts.
///
/// Public loaders never surface these; they log and fall back to a
/// default. Backends return them so the reader can decide on fallback.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Underlying `SQLite` failure, including busy/locked timeouts.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system failure on a specific artifact.
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Artifact exists but is not valid JSON of the expected shape.
    #[error("malformed json in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ReadError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    /// `true` when the database is held by the writer (busy or locked).
    #[must_use]
    pub fn is_backend_unavailable(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ReadError>;
