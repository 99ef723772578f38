//! Durable registry of already-used movie ids.
//!
//! A small JSON document `{ "ids": [5, 7, ...] }` read once at startup and
//! rewritten once after a successful publish. An id appears in the file if
//! and only if a post referencing it went out; failed runs never touch it.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    ids: Vec<u64>,
}

/// In-memory view of the used-id file.
#[derive(Debug)]
pub struct UsedIdRegistry {
    path: PathBuf,
    ids: Vec<u64>,
}

impl UsedIdRegistry {
    /// Load the registry from `path`; a missing file yields an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let ids = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let file: RegistryFile = serde_json::from_str(&raw)
                    .map_err(|e| PipelineError::State(format!("{}: {e}", path.display())))?;
                file.ids
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No registry file yet, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, ids })
    }

    /// Whether `id` was already used by an earlier successful run.
    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Number of recorded ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append `id` and rewrite the backing file.
    ///
    /// Only called after the publish succeeded; any failure here surfaces to
    /// the caller so the next run can spot the discrepancy in the logs.
    pub fn commit(&mut self, id: u64) -> Result<(), PipelineError> {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }

        let file = RegistryFile {
            ids: self.ids.clone(),
        };
        let raw = serde_json::to_string_pretty(&file)
            .map_err(|e| PipelineError::State(e.to_string()))?;
        std::fs::write(&self.path, raw)?;

        info!(id, total = self.ids.len(), path = %self.path.display(), "Registry updated");
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = UsedIdRegistry::load(dir.path().join("used.json")).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.contains(5));
    }

    #[test]
    fn test_commit_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.json");
        std::fs::write(&path, r#"{"ids":[5]}"#).unwrap();

        let mut registry = UsedIdRegistry::load(&path).unwrap();
        assert!(registry.contains(5));
        registry.commit(7).unwrap();

        let reloaded = UsedIdRegistry::load(&path).unwrap();
        assert!(reloaded.contains(5));
        assert!(reloaded.contains(7));
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_commit_is_idempotent_per_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = UsedIdRegistry::load(dir.path().join("used.json")).unwrap();
        registry.commit(7).unwrap();
        registry.commit(7).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_malformed_file_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            UsedIdRegistry::load(&path),
            Err(PipelineError::State(_))
        ));
    }
}
