use std::collections::BTreeMap;

use injectkit::provides;
use parking_lot::RwLock;

use crate::store::{validate_key, Store, StoreError};

/// Process-local store. Preferred over `FileStore` when both are loaded.
#[derive(Default)]
#[provides(priority = High, implements = [dyn Store])]
pub struct MemStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemStore {
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Store for MemStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let store = MemStore::default();
        store.put("b", "2").unwrap();
        store.put("a", "1").unwrap();
        store.put("a", "one").unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("one"));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn rejects_bad_keys() {
        let store = MemStore::default();
        assert!(matches!(store.put("x/y", "v"), Err(StoreError::InvalidKey(_))));
        assert!(store.is_empty());
    }
}
