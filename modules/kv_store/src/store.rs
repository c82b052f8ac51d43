use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidKey(String),
    #[error("storage I/O failed")]
    Io(#[from] std::io::Error),
}

/// String key-value storage.
pub trait Store: Send + Sync {
    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// All keys in ascending order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
