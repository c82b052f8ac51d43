//! Capability model: which types a provider can be injected as.
//!
//! A provider is always available as its own concrete type. Every other
//! capability (usually a trait object such as `dyn Store`) must be declared
//! explicitly on its [`ProviderType`] together with the upcast that turns an
//! `Arc<Concrete>` into an `Arc<dyn Capability>`.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ContainerError;

/// Shared, type-erased provider instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased `Arc<T>` produced by casting an instance to a capability.
pub type AnyBox = Box<dyn Any + Send + Sync>;

type UpcastFn = dyn Fn(&AnyArc) -> Option<AnyBox> + Send + Sync;

/// Identifier of a type a dependency can be requested as.
#[derive(Clone, Copy)]
pub struct Capability {
    id: TypeId,
    name: &'static str,
}

impl Capability {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

struct Upcast {
    target: Capability,
    cast: Box<UpcastFn>,
}

impl Upcast {
    fn new<C, T>(upcast: fn(Arc<C>) -> Arc<T>) -> Self
    where
        C: Send + Sync + 'static,
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            target: Capability::of::<T>(),
            cast: Box::new(move |value: &AnyArc| {
                let concrete = Arc::clone(value).downcast::<C>().ok()?;
                Some(Box::new(upcast(concrete)) as AnyBox)
            }),
        }
    }
}

/// Concrete provider type plus the explicit list of capabilities it implements.
pub struct ProviderType {
    concrete: Capability,
    // upcasts[0] is always the identity cast to the concrete type
    upcasts: Vec<Upcast>,
}

impl ProviderType {
    /// Start describing the concrete type `C`.
    pub fn of<C: Send + Sync + 'static>() -> ProviderTypeBuilder<C> {
        ProviderTypeBuilder {
            upcasts: vec![Upcast::new::<C, C>(|it| it)],
            _marker: PhantomData,
        }
    }

    pub fn concrete(&self) -> Capability {
        self.concrete
    }

    pub fn name(&self) -> &'static str {
        self.concrete.name
    }

    /// All capabilities this type satisfies, the concrete type first.
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.upcasts.iter().map(|u| u.target)
    }

    /// Whether a value of this type is assignable to `requested`.
    pub fn satisfies(&self, requested: Capability) -> bool {
        self.upcasts.iter().any(|u| u.target == requested)
    }

    /// Cast `value` (which must be of this concrete type) to `requested`.
    ///
    /// On success the box holds an `Arc<R>` where `R` is the requested type.
    pub fn cast(&self, value: &AnyArc, requested: Capability) -> Option<AnyBox> {
        self.upcasts
            .iter()
            .find(|u| u.target == requested)
            .and_then(|u| (u.cast)(value))
    }
}

impl fmt::Debug for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderType")
            .field("concrete", &self.concrete)
            .field("capabilities", &self.capabilities().skip(1).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder returned by [`ProviderType::of`].
pub struct ProviderTypeBuilder<C> {
    upcasts: Vec<Upcast>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> ProviderTypeBuilder<C> {
    /// Declare that `C` can be injected wherever `T` is requested.
    ///
    /// ```
    /// use injectkit::ProviderType;
    ///
    /// trait Store: Send + Sync {}
    /// struct MemStore;
    /// impl Store for MemStore {}
    ///
    /// let ty = ProviderType::of::<MemStore>()
    ///     .implements::<dyn Store>(|it| it)
    ///     .build();
    /// assert!(ty.satisfies(injectkit::Capability::of::<dyn Store>()));
    /// ```
    pub fn implements<T: ?Sized + Send + Sync + 'static>(mut self, upcast: fn(Arc<C>) -> Arc<T>) -> Self {
        let target = Capability::of::<T>();
        if !self.upcasts.iter().any(|u| u.target == target) {
            self.upcasts.push(Upcast::new::<C, T>(upcast));
        }
        self
    }

    pub fn build(self) -> Arc<ProviderType> {
        Arc::new(ProviderType {
            concrete: Capability::of::<C>(),
            upcasts: self.upcasts,
        })
    }

    /// Finish the description and wrap `value` as an [`Instance`] of it.
    pub fn instance(self, value: C) -> Instance {
        Instance {
            ty: self.build(),
            value: Arc::new(value),
        }
    }
}

/// A constructed provider value together with its [`ProviderType`].
#[derive(Clone)]
pub struct Instance {
    ty: Arc<ProviderType>,
    value: AnyArc,
}

impl Instance {
    /// Instance of `C` that is only injectable as `C` itself.
    pub fn of<C: Send + Sync + 'static>(value: C) -> Self {
        ProviderType::of::<C>().instance(value)
    }

    /// Pair an existing shared value with a previously built type description.
    pub fn from_arc<C: Send + Sync + 'static>(
        ty: Arc<ProviderType>,
        value: Arc<C>,
    ) -> Result<Self, ContainerError> {
        if ty.concrete() != Capability::of::<C>() {
            return Err(ContainerError::TypeMismatch {
                expected: ty.name(),
                actual: type_name::<C>(),
            });
        }
        Ok(Self { ty, value })
    }

    pub(crate) fn from_parts(ty: Arc<ProviderType>, value: AnyArc) -> Self {
        Self { ty, value }
    }

    pub fn provider_type(&self) -> &Arc<ProviderType> {
        &self.ty
    }

    pub fn concrete(&self) -> Capability {
        self.ty.concrete()
    }

    pub fn value(&self) -> &AnyArc {
        &self.value
    }

    pub fn satisfies(&self, requested: Capability) -> bool {
        self.ty.satisfies(requested)
    }

    pub fn cast(&self, requested: Capability) -> Option<AnyBox> {
        self.ty.cast(&self.value, requested)
    }

    /// Typed view of this instance as `T` (a concrete type or declared capability).
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        downcast_boxed::<T>(self.cast(Capability::of::<T>())?)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .finish()
    }
}

pub(crate) fn downcast_boxed<T: ?Sized + Send + Sync + 'static>(boxed: AnyBox) -> Option<Arc<T>> {
    boxed.downcast::<Arc<T>>().ok().map(|arc| *arc)
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    impl Named for English {
        fn name(&self) -> &str {
            "english"
        }
    }

    #[test]
    fn concrete_type_always_satisfies_itself() {
        let ty = ProviderType::of::<English>().build();
        assert!(ty.satisfies(Capability::of::<English>()));
        assert!(!ty.satisfies(Capability::of::<dyn Greeter>()));
        assert_eq!(ty.capabilities().count(), 1);
    }

    #[test]
    fn declared_capabilities_cast_to_trait_objects() {
        let instance = ProviderType::of::<English>()
            .implements::<dyn Greeter>(|it| it)
            .implements::<dyn Named>(|it| it)
            .instance(English);

        let greeter = instance.downcast::<dyn Greeter>().expect("greeter");
        assert_eq!(greeter.greet(), "hello");
        let named = instance.downcast::<dyn Named>().expect("named");
        assert_eq!(named.name(), "english");
        assert!(instance.downcast::<English>().is_some());
        assert!(instance.downcast::<String>().is_none());
    }

    #[test]
    fn duplicate_declarations_are_ignored() {
        let ty = ProviderType::of::<English>()
            .implements::<dyn Greeter>(|it| it)
            .implements::<dyn Greeter>(|it| it)
            .build();
        assert_eq!(ty.capabilities().count(), 2);
    }

    #[test]
    fn from_arc_rejects_mismatched_values() {
        let ty = ProviderType::of::<English>().build();
        let err = Instance::from_arc(ty.clone(), Arc::new(42u32)).unwrap_err();
        assert!(matches!(err, ContainerError::TypeMismatch { .. }));
        assert!(Instance::from_arc(ty, Arc::new(English)).is_ok());
    }
}
