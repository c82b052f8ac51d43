use std::fmt;
use std::sync::Arc;

use crate::capability::{AnyBox, Capability};
use crate::slot::Inject;

type AssignFn = dyn Fn(AnyBox) -> Result<(), AnyBox> + Send + Sync;

/// A consumer location that must receive a provider assignable to `requested`.
#[derive(Clone)]
pub struct InjectionSite {
    declaring: &'static str,
    field: &'static str,
    requested: Capability,
    assign: Arc<AssignFn>,
}

impl InjectionSite {
    /// Site backed by an arbitrary callback.
    ///
    /// The callback receives a boxed `Arc<R>` for the requested type `R` and
    /// hands the box back if it cannot accept it.
    pub fn new<F>(declaring: &'static str, field: &'static str, requested: Capability, assign: F) -> Self
    where
        F: Fn(AnyBox) -> Result<(), AnyBox> + Send + Sync + 'static,
    {
        Self {
            declaring,
            field,
            requested,
            assign: Arc::new(assign),
        }
    }

    /// Site writing into a static slot.
    pub fn slot<T: ?Sized + Send + Sync + 'static>(
        declaring: &'static str,
        field: &'static str,
        slot: &'static Inject<T>,
    ) -> Self {
        Self::new(declaring, field, Capability::of::<T>(), move |value| {
            let value = value.downcast::<Arc<T>>()?;
            slot.set(*value);
            Ok(())
        })
    }

    /// Site writing into a slot owned by a consumer instance.
    pub fn shared<T: ?Sized + Send + Sync + 'static>(
        declaring: &'static str,
        field: &'static str,
        slot: Arc<Inject<T>>,
    ) -> Self {
        Self::new(declaring, field, Capability::of::<T>(), move |value| {
            let value = value.downcast::<Arc<T>>()?;
            slot.set(*value);
            Ok(())
        })
    }

    pub fn declaring_type(&self) -> &'static str {
        self.declaring
    }

    pub fn field_name(&self) -> &'static str {
        self.field
    }

    pub fn requested(&self) -> Capability {
        self.requested
    }

    pub(crate) fn assign(&self, value: AnyBox) -> bool {
        (self.assign)(value).is_ok()
    }
}

impl fmt::Debug for InjectionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionSite")
            .field("declaring", &self.declaring)
            .field("field", &self.field)
            .field("requested", &self.requested)
            .finish()
    }
}

impl fmt::Display for InjectionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.declaring, self.field)
    }
}
