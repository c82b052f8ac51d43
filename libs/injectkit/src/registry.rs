//! Provider registry: one entry per concrete type, resolved by priority.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::capability::{downcast_boxed, AnyArc, AnyBox, Capability, Instance, ProviderType};
use crate::priority::Priority;

/// A registered provider.
pub struct ProviderEntry {
    instance: Instance,
    priority: Priority,
    seq: u64,
}

impl ProviderEntry {
    pub fn provider_type(&self) -> &Arc<ProviderType> {
        self.instance.provider_type()
    }

    pub fn concrete(&self) -> Capability {
        self.instance.concrete()
    }

    pub fn name(&self) -> &'static str {
        self.instance.concrete().name()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Arrival order within the registry; lower registered earlier.
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn value(&self) -> &AnyArc {
        self.instance.value()
    }

    pub fn satisfies(&self, requested: Capability) -> bool {
        self.instance.satisfies(requested)
    }

    pub fn cast(&self, requested: Capability) -> Option<AnyBox> {
        self.instance.cast(requested)
    }

    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        downcast_boxed::<T>(self.cast(Capability::of::<T>())?)
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("type", &self.name())
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish()
    }
}

/// Result of [`Registry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// An entry with priority <= the new one was replaced.
    Replaced { previous: Priority },
    /// An entry with strictly higher priority already exists; nothing changed.
    Kept { existing: Priority },
}

#[derive(Default)]
struct Inner {
    entries: HashMap<TypeId, Arc<ProviderEntry>>,
    next_seq: u64,
}

/// Thread-safe store of provider entries keyed by concrete type.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `instance` under its concrete type, applying the override rule.
    pub fn register(&self, instance: Instance, priority: Priority) -> Registration {
        let key = instance.concrete().id();
        let mut inner = self.inner.write();

        let outcome = match inner.entries.get(&key) {
            Some(existing) if existing.priority > priority => {
                return Registration::Kept {
                    existing: existing.priority,
                }
            }
            Some(existing) => Registration::Replaced {
                previous: existing.priority,
            },
            None => Registration::Inserted,
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Arc::new(ProviderEntry {
                instance,
                priority,
                seq,
            }),
        );
        outcome
    }

    /// Entry registered for exactly `concrete`, if any.
    pub fn find_exact(&self, concrete: Capability) -> Option<Arc<ProviderEntry>> {
        self.inner.read().entries.get(&concrete.id()).cloned()
    }

    /// Highest-priority entry assignable to `requested`; earliest arrival wins ties.
    pub fn find_best(&self, requested: Capability) -> Option<Arc<ProviderEntry>> {
        self.inner
            .read()
            .entries
            .values()
            .filter(|entry| entry.satisfies(requested))
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.seq.cmp(&a.seq))
            })
            .cloned()
    }

    /// Snapshot of all entries in arrival order.
    pub fn values(&self) -> Values {
        let mut entries: Vec<_> = self.inner.read().entries.values().cloned().collect();
        entries.sort_by_key(|entry| entry.seq);
        Values {
            inner: entries.into_iter(),
        }
    }

    pub fn contains(&self, concrete: Capability) -> bool {
        self.inner.read().entries.contains_key(&concrete.id())
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.values().map(|e| e.name()).collect();
        f.debug_struct("Registry").field("providers", &names).finish()
    }
}

/// Iterator returned by [`Registry::values`].
pub struct Values {
    inner: std::vec::IntoIter<Arc<ProviderEntry>>,
}

impl Iterator for Values {
    type Item = Arc<ProviderEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Values {}
