use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use injectkit::provides;

use crate::store::{validate_key, Store, StoreError};

/// Directory used when `KV_STORE_DIR` is not set.
const DEFAULT_DIR: &str = "injectkit-kv";

/// One file per key under a root directory.
#[provides(implements = [dyn Store], ctor = FileStore::from_env())]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `KV_STORE_DIR`, else a directory under the system temp dir.
    pub fn from_env() -> Self {
        let root = std::env::var_os("KV_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DIR));
        tracing::debug!(root = %root.display(), "File store root");
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Store for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        match fs::read_to_string(self.root.join(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(key), value)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn persists_values_as_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("kv"));

        assert_eq!(store.keys().unwrap(), Vec::<String>::new());
        store.put("greeting", "hello").unwrap();
        store.put("answer", "42").unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("kv/greeting")).unwrap(),
            "hello"
        );
        assert_eq!(store.get("answer").unwrap().as_deref(), Some("42"));
        assert_eq!(store.get("nope").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["answer", "greeting"]);
    }

    #[test]
    fn refuses_path_traversal() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(store.get(".."), Err(StoreError::InvalidKey(_))));
    }
}
