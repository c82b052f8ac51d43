use std::path::PathBuf;

use injectkit::{provides, ProvideError};

use crate::file::FileStore;
use crate::store::{Store, StoreError};

pub const REMOTE_URL_VAR: &str = "KV_STORE_REMOTE_URL";

/// Store on a shared mount, addressed as `file:///mnt/share/kv`.
///
/// Not providable unless `KV_STORE_REMOTE_URL` is set; that case is expected
/// and is not reported as an error. An unsupported scheme is.
#[provides(priority = Highest, implements = [dyn Store], fallible, ctor = RemoteStore::connect())]
pub struct RemoteStore {
    url: String,
    mount: FileStore,
}

impl RemoteStore {
    pub fn connect() -> Result<Self, ProvideError> {
        match std::env::var(REMOTE_URL_VAR) {
            Ok(url) => Self::from_url(&url),
            Err(_) => Err(ProvideError::quietly_unprovidable(format!(
                "{REMOTE_URL_VAR} is not set"
            ))),
        }
    }

    pub fn from_url(url: &str) -> Result<Self, ProvideError> {
        let path = url.strip_prefix("file://").ok_or_else(|| {
            ProvideError::unprovidable(format!("unsupported remote store URL '{url}'"))
        })?;
        if path.is_empty() {
            return Err(ProvideError::unprovidable("remote store URL has no path"));
        }
        Ok(Self {
            url: url.to_string(),
            mount: FileStore::new(PathBuf::from(path)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Store for RemoteStore {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.mount.get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mount.put(key, value)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.mount.keys()
    }
}
