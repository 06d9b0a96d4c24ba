//! Total loaders for the JSON documents in a checkpoint directory.
//!
//! Each document loads independently. A missing file is normal (the
//! pipeline may not have written it yet) and is logged at `debug`; a file
//! that cannot be read or parsed is logged at `warn`. Either way the
//! caller receives `None` and applies its own default.

use std::path::{Path, PathBuf};

use runlens_types::location::CheckpointLocation;
use runlens_types::run::RunIdentity;
use runlens_types::secondary::SecondaryPhaseState;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{self, ReadError};

/// Read and parse a JSON document.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns [`ReadError::Io`] when the file cannot be read and
/// [`ReadError::Json`] when it does not parse as `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> error::Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ReadError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ReadError::json(path, e))
}

/// [`read_json`] with the failure folded into `None` and logged.
pub fn load_document<T: DeserializeOwned>(path: &Path, artifact: &str) -> Option<T> {
    match read_json(path) {
        Ok(Some(doc)) => Some(doc),
        Ok(None) => {
            tracing::debug!(artifact, path = %path.display(), "Artifact not present");
            None
        }
        Err(e) => {
            tracing::warn!(artifact, error = %e, "Could not load artifact");
            None
        }
    }
}

pub fn load_run_identity(location: &CheckpointLocation) -> Option<RunIdentity> {
    load_document(&location.run_state_path(), "run_state")
}

pub fn load_secondary_state(location: &CheckpointLocation) -> Option<SecondaryPhaseState> {
    load_document(&location.secondary_state_path(), "oal_state")
}

/// The external payload document, trying the checkpoint copy first and
/// then each fallback path in order. Empty documents are skipped.
pub fn load_payload(location: &CheckpointLocation, fallbacks: &[PathBuf]) -> Option<Value> {
    std::iter::once(location.payload_path())
        .chain(fallbacks.iter().cloned())
        .find_map(|path| load_document::<Value>(&path, "payload").filter(|v| !is_empty(v)))
}

pub fn load_validation(location: &CheckpointLocation) -> Option<Value> {
    load_document::<Value>(&location.validation_path(), "validation_warnings")
        .filter(|v| !v.is_null())
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> (tempfile::TempDir, CheckpointLocation) {
        let dir = tempfile::tempdir().unwrap();
        let loc = CheckpointLocation::for_output_dir(dir.path());
        std::fs::create_dir_all(&loc.checkpoint_dir).unwrap();
        (dir, loc)
    }

    #[test]
    fn missing_document_is_none() {
        let (_dir, loc) = location();
        assert!(load_run_identity(&loc).is_none());
        assert!(read_json::<Value>(&loc.run_state_path()).unwrap().is_none());
    }

    #[test]
    fn corrupt_document_is_none_without_affecting_others() {
        let (_dir, loc) = location();
        std::fs::write(loc.run_state_path(), "{ not json").unwrap();
        std::fs::write(
            loc.secondary_state_path(),
            r#"{"percent": 10, "status": "running"}"#,
        )
        .unwrap();

        assert!(matches!(
            read_json::<Value>(&loc.run_state_path()),
            Err(ReadError::Json { .. })
        ));
        assert!(load_run_identity(&loc).is_none());
        let oal = load_secondary_state(&loc).unwrap();
        assert_eq!(oal.status(), "running");
    }

    #[test]
    fn payload_skips_empty_and_uses_fallback() {
        let (dir, loc) = location();
        std::fs::write(loc.payload_path(), "{}").unwrap();
        let fallback = dir.path().join("elsewhere.json");
        std::fs::write(&fallback, r#"{"flights": [1], "updated_at": "now"}"#).unwrap();

        let payload = load_payload(&loc, &[fallback]).unwrap();
        assert_eq!(payload["flights"], serde_json::json!([1]));
    }

    #[test]
    fn payload_absent_everywhere() {
        let (_dir, loc) = location();
        assert!(load_payload(&loc, &[]).is_none());
    }

    #[test]
    fn validation_passes_through() {
        let (_dir, loc) = location();
        std::fs::write(
            loc.validation_path(),
            r#"{"passed": false, "warnings": ["gap in CAI-JED"]}"#,
        )
        .unwrap();
        let validation = load_validation(&loc).unwrap();
        assert_eq!(validation["passed"], false);
    }
}
