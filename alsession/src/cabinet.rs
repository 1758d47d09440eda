//! Storage cabinets for the persisted session
//!
//! [`MemoryCabinet`] keeps values for the lifetime of the process and is what
//! tests use. [`FileCabinet`] keeps one JSON document per namespace on disk.

use alsession_core::{storage_error, Cabinet, SessionConfig, SessionResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

/// In-process cabinet. Clones share the same contents.
#[derive(Debug, Clone)]
pub struct MemoryCabinet {
    namespace: String,
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryCabinet {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Cabinet for MemoryCabinet {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> SessionResult<Option<Value>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: Value) -> SessionResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn destroy(&self) -> SessionResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Cabinet stored as `<dir>/<namespace>.json`
#[derive(Debug)]
pub struct FileCabinet {
    namespace: String,
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileCabinet {
    /// Open (and create the directory for) a cabinet under `dir`
    pub fn new<P: AsRef<Path>>(dir: P, namespace: impl Into<String>) -> SessionResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            storage_error!(
                format!("Failed to create storage directory {}: {}", dir.display(), e),
                "file_cabinet",
                e
            )
        })?;

        let namespace = namespace.into();
        let path = dir.join(format!("{}.json", namespace));
        info!("Session storage initialized at: {}", path.display());

        Ok(Self {
            namespace,
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Cabinet for the namespace and directory named in `config`
    pub fn from_config(config: &SessionConfig) -> SessionResult<Self> {
        Self::new(config.resolved_storage_dir(), config.namespace.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> SessionResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            storage_error!(
                format!("Failed to read {}: {}", self.path.display(), e),
                "file_cabinet",
                e
            )
        })?;

        // A namespace file that is not a JSON object is treated as empty; the
        // next write replaces it
        match serde_json::from_str(&content) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) | Err(_) => {
                debug!(path = %self.path.display(), "Ignoring unreadable cabinet file");
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> SessionResult<()> {
        let data = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, data).map_err(|e| {
            storage_error!(
                format!("Failed to write {}: {}", self.path.display(), e),
                "file_cabinet",
                e
            )
        })
    }

    fn update<F>(&self, change: F) -> SessionResult<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all()?;
        change(&mut entries);
        self.write_all(&entries)
    }
}

impl Cabinet for FileCabinet {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get(&self, key: &str) -> SessionResult<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> SessionResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
        })?;
        debug!(namespace = %self.namespace, key, "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn destroy(&self) -> SessionResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                storage_error!(
                    format!("Failed to remove {}: {}", self.path.display(), e),
                    "file_cabinet",
                    e
                )
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_cabinet_clones_share_contents() {
        let cabinet = MemoryCabinet::new("al_session");
        let other = cabinet.clone();

        cabinet.set("session", json!({ "a": 1 })).unwrap();
        assert_eq!(other.get("session").unwrap(), Some(json!({ "a": 1 })));

        other.destroy().unwrap();
        assert!(cabinet.get("session").unwrap().is_none());
    }

    #[test]
    fn test_file_cabinet_persists_between_instances() {
        let temp_dir = TempDir::new().unwrap();

        let cabinet = FileCabinet::new(temp_dir.path(), "al_session").unwrap();
        cabinet.set("session", json!({ "token": "abc" })).unwrap();
        cabinet.set("other", json!(3)).unwrap();
        assert!(cabinet.path().ends_with("al_session.json"));

        let reopened = FileCabinet::new(temp_dir.path(), "al_session").unwrap();
        assert_eq!(
            reopened.get("session").unwrap(),
            Some(json!({ "token": "abc" }))
        );

        reopened.remove("session").unwrap();
        assert!(cabinet.get("session").unwrap().is_none());
        assert_eq!(cabinet.get("other").unwrap(), Some(json!(3)));
    }

    #[test]
    fn test_file_cabinet_namespaces_are_separate() {
        let temp_dir = TempDir::new().unwrap();
        let first = FileCabinet::new(temp_dir.path(), "first").unwrap();
        let second = FileCabinet::new(temp_dir.path(), "second").unwrap();

        first.set("session", json!(true)).unwrap();
        assert!(second.get("session").unwrap().is_none());

        first.destroy().unwrap();
        assert!(!first.path().exists());
        assert!(first.get("session").unwrap().is_none());
    }

    #[test]
    fn test_file_cabinet_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = SessionConfig {
            storage_dir: Some(temp_dir.path().to_path_buf()),
            ..SessionConfig::default()
        };

        let cabinet = FileCabinet::from_config(&config).unwrap();
        assert_eq!(cabinet.namespace(), "al_session");
        assert_eq!(cabinet.path(), temp_dir.path().join("al_session.json"));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cabinet = FileCabinet::new(temp_dir.path(), "al_session").unwrap();
        std::fs::write(cabinet.path(), "not json").unwrap();

        assert!(cabinet.get("session").unwrap().is_none());
        cabinet.set("session", json!(1)).unwrap();
        assert_eq!(cabinet.get("session").unwrap(), Some(json!(1)));
    }
}
