use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use injectkit::{inject, ContainerHandle, Inject};
use kv_store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;

#[inject]
static STORE: Inject<dyn Store> = Inject::new();

#[inject]
static CLOCK: Inject<dyn Clock> = Inject::new();

#[inject]
static CONTAINER: Inject<ContainerHandle> = Inject::new();

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

const KEY_PREFIX: &str = "audit-";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit trail is not wired: no {0} injected")]
    NotInjected(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt audit record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    pub message: String,
    /// Backend that stored the event.
    pub backend: String,
}

fn store() -> Result<std::sync::Arc<dyn Store>, AuditError> {
    STORE.get().ok_or(AuditError::NotInjected("store"))
}

/// Append `message` to the trail and return the stored event.
pub fn record(message: &str) -> Result<AuditEvent, AuditError> {
    let store = store()?;
    let clock = CLOCK.get().ok_or(AuditError::NotInjected("clock"))?;

    let event = AuditEvent {
        at: clock.now(),
        message: message.to_string(),
        backend: store.backend().to_string(),
    };
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let key = format!("{KEY_PREFIX}{}-{seq:06}", event.at.timestamp_millis());
    store.put(&key, &serde_json::to_string(&event)?)?;

    let providers = CONTAINER
        .get()
        .and_then(|handle| handle.container())
        .map(|c| c.registry().len());
    tracing::debug!(key = %key, backend = store.backend(), ?providers, "Recorded audit event");
    Ok(event)
}

/// The last `limit` events, oldest first.
pub fn recent(limit: usize) -> Result<Vec<AuditEvent>, AuditError> {
    let store = store()?;
    let keys: Vec<String> = store
        .keys()?
        .into_iter()
        .filter(|k| k.starts_with(KEY_PREFIX))
        .collect();

    let start = keys.len().saturating_sub(limit);
    let mut events = Vec::with_capacity(keys.len() - start);
    for key in &keys[start..] {
        if let Some(raw) = store.get(key)? {
            events.push(serde_json::from_str(&raw)?);
        }
    }
    Ok(events)
}
