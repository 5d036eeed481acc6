//! Durable key-value storage for client preferences.
//!
//! Values are plain strings keyed by well-known names. `FileStore` keeps them in a
//! single JSON object on disk and survives process restarts; `MemoryStore` is the
//! in-process variant used by tests and throwaway runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Stay-signed-in preference, stored as `"true"` / `"false"`.
pub const KEY_PERSIST: &str = "persist";
pub const KEY_COOKIE_CONSENT: &str = "cookieConsent";
pub const KEY_LANGUAGE: &str = "language";
/// Exported refresh cookie for native processes; only kept while `persist` is true.
pub const KEY_REFRESH_COOKIE: &str = "refreshCookie";

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;

    fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(false)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> { self.values.lock().get(key).cloned() }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// JSON-file backed store. The whole map is loaded on open and rewritten
/// (temp file + rename) on every mutation.
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> ClientResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(|b| b.is_ascii_whitespace()) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, String>>(&bytes)
                .map_err(|e| ClientError::storage(format!("corrupt state file {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(target: "storage", path = %path.display(), keys = values.len(), "state file opened");
        Ok(Self { path, values: Mutex::new(values) })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn flush(&self, values: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(values)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> { self.values.lock().get(key).cloned() }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_survives_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("state.json");
        {
            let store = FileStore::open(&path).unwrap();
            assert!(!store.get_bool(KEY_PERSIST));
            store.set(KEY_PERSIST, "true").unwrap();
            store.set(KEY_LANGUAGE, "ar").unwrap();
        }
        let store = FileStore::open(&path).unwrap();
        assert!(store.get_bool(KEY_PERSIST));
        assert_eq!(store.get(KEY_LANGUAGE).as_deref(), Some("ar"));
        store.remove(KEY_LANGUAGE).unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get(KEY_LANGUAGE), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(FileStore::open(&path), Err(ClientError::Storage { .. })));
    }

    #[test]
    fn memory_store_bool_parsing() {
        let store = MemoryStore::new();
        store.set(KEY_COOKIE_CONSENT, "TRUE").unwrap();
        assert!(store.get_bool(KEY_COOKIE_CONSENT));
        store.set(KEY_COOKIE_CONSENT, "no").unwrap();
        assert!(!store.get_bool(KEY_COOKIE_CONSENT));
    }
}
