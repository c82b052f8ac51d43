use std::fmt;
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};

/// A consumer field that receives a provider during injection.
///
/// Usually declared as a static and registered with `#[inject]`:
///
/// ```ignore
/// #[injectkit::inject]
/// static STORE: Inject<dyn Store> = Inject::new();
/// ```
pub struct Inject<T: ?Sized> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Inject<T> {
    pub const fn new() -> Self {
        Self {
            slot: const_rwlock(None),
        }
    }

    /// The injected provider, if any pass has resolved this slot yet.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.read().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.read().is_some()
    }

    pub(crate) fn set(&self, value: Arc<T>) {
        *self.slot.write() = Some(value);
    }
}

impl<T: ?Sized> Default for Inject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("type", &std::any::type_name::<T>())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
