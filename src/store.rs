//! Collaborator seams: registry persistence and write capability.

use std::path::{Path, PathBuf};

use crate::{
    error::{PeepError, PeepResult},
    model::Registry,
};

/// Persistence collaborator. May fail or return empty data; callers
/// normalize both to "no categories, no assets".
pub trait RegistryStore {
    fn load(&self) -> PeepResult<Registry>;
    fn persist(&self, registry: &Registry) -> PeepResult<()>;
}

/// Authorization collaborator: is this caller allowed to mutate the
/// library? Gates the exposure of mutation commands; the mutation
/// functions themselves never re-check.
pub trait WriteGate {
    fn can_write(&self) -> bool;
}

#[derive(Clone, Copy, Debug)]
pub struct WritableGate;

impl WriteGate for WritableGate {
    fn can_write(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ReadOnlyGate;

impl WriteGate for ReadOnlyGate {
    fn can_write(&self) -> bool {
        false
    }
}

/// Registry persisted as pretty JSON in a single file. A missing file is
/// an empty registry, not an error.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> PeepResult<Registry> {
        if !self.path.exists() {
            return Ok(Registry::default());
        }
        let bytes = std::fs::read(&self.path)
            .map_err(|e| PeepError::store(format!("read '{}': {e}", self.path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PeepError::serde(format!("parse '{}': {e}", self.path.display())))
    }

    fn persist(&self, registry: &Registry) -> PeepResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PeepError::store(format!("create '{}': {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(registry)
            .map_err(|e| PeepError::serde(format!("serialize registry: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| PeepError::store(format!("write '{}': {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path().join("nope.json"));
        let reg = store.load().unwrap();
        assert!(reg.categories.is_empty());
        assert!(reg.assets.is_empty());
    }

    #[test]
    fn persist_then_load_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path().join("data/registry.json"));

        let mut reg = Registry::starter();
        reg.create_asset("hair", "Spiky", "hair/spiky.png").unwrap();
        store.persist(&reg).unwrap();

        let loaded = store.load().unwrap();
        loaded.validate().unwrap();
        assert_eq!(loaded.categories.len(), reg.categories.len());
        assert_eq!(loaded.assets.len(), 1);
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(matches!(err, PeepError::Serde(_)));
    }

    #[test]
    fn gates_report_capability() {
        assert!(WritableGate.can_write());
        assert!(!ReadOnlyGate.can_write());
    }
}
