use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::capability::{Capability, Instance};
use crate::discovery::{InventoryDiscovery, ModuleSet, TypeDiscovery};
use crate::engine::{InjectionEngine, InjectionReport};
use crate::error::ContainerError;
use crate::loader::{LoaderOptions, ProviderLoader};
use crate::priority::Priority;
use crate::registry::{Registration, Registry};

/// Provider registered by every container so consumers can depend on it.
///
/// Holds a weak reference; the container owns its registry, and the registry
/// owns this handle.
#[derive(Clone)]
pub struct ContainerHandle(Weak<Container>);

impl ContainerHandle {
    pub fn container(&self) -> Option<Arc<Container>> {
        self.0.upgrade()
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

/// Provider exposing the container's discovery service.
#[derive(Clone)]
pub struct DiscoveryHandle(Arc<dyn TypeDiscovery>);

impl DiscoveryHandle {
    pub fn discovery(&self) -> &Arc<dyn TypeDiscovery> {
        &self.0
    }
}

impl fmt::Debug for DiscoveryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiscoveryHandle")
    }
}

/// Host-facing dependency container.
///
/// ```
/// use injectkit::{Container, Instance, ModuleSet, StaticDiscovery};
///
/// struct Greeting(&'static str);
///
/// let container = Container::with_discovery(StaticDiscovery::new());
/// container.register_injection(Instance::of(Greeting("hi")));
/// let report = container.start_injection(&ModuleSet::all());
/// assert!(report.is_complete());
/// assert_eq!(container.get::<Greeting>().unwrap().0, "hi");
/// ```
pub struct Container {
    registry: Registry,
    discovery: Arc<dyn TypeDiscovery>,
    // Held across whole passes and runtime injections. Reentrant so providers
    // can call back into the container through `ContainerHandle`.
    pass: ReentrantMutex<()>,
    // Union of every module set passed in so far; sites are resolved over it.
    known: Mutex<ModuleSet>,
}

impl Container {
    /// Container discovering providers and sites registered with `#[provides]`
    /// and `#[inject]`.
    pub fn new() -> Arc<Self> {
        Self::with_discovery(InventoryDiscovery)
    }

    pub fn with_discovery<D: TypeDiscovery + 'static>(discovery: D) -> Arc<Self> {
        Self::from_shared_discovery(Arc::new(discovery))
    }

    pub fn from_shared_discovery(discovery: Arc<dyn TypeDiscovery>) -> Arc<Self> {
        Arc::new_cyclic(|this| {
            let registry = Registry::new();
            registry.register(
                Instance::of(ContainerHandle(this.clone())),
                Priority::Highest,
            );
            registry.register(
                Instance::of(DiscoveryHandle(Arc::clone(&discovery))),
                Priority::Highest,
            );
            Container {
                registry,
                discovery,
                pass: ReentrantMutex::new(()),
                known: Mutex::new(ModuleSet::default()),
            }
        })
    }

    /// Register `instance` with [`Priority::Normal`].
    pub fn register_injection(&self, instance: Instance) -> Registration {
        self.register_injection_with(instance, Priority::Normal)
    }

    pub fn register_injection_with(&self, instance: Instance, priority: Priority) -> Registration {
        let _pass = self.pass.lock();
        tracing::debug!(
            provider = instance.concrete().name(),
            %priority,
            "Registering injection"
        );
        self.registry.register(instance, priority)
    }

    /// Remember `modules` so later passes and runtime injections also resolve
    /// the sites they declare. Returns the updated set.
    pub fn add_modules(&self, modules: &ModuleSet) -> ModuleSet {
        let _pass = self.pass.lock();
        let mut known = self.known.lock();
        *known = known.union(modules);
        known.clone()
    }

    /// Every module set this container has seen, merged.
    pub fn known_modules(&self) -> ModuleSet {
        self.known.lock().clone()
    }

    /// Load the providers of `modules`, then inject every site of the known
    /// modules, `modules` included.
    pub fn start_injection(&self, modules: &ModuleSet) -> InjectionReport {
        self.start_injection_with(modules, &LoaderOptions::default())
    }

    pub fn start_injection_with(&self, modules: &ModuleSet, options: &LoaderOptions) -> InjectionReport {
        let _pass = self.pass.lock();
        let known = self.add_modules(modules);
        tracing::info!(modules = %modules, known = %known, "Starting injection");

        let load = ProviderLoader::new(&self.registry, options)
            .load(self.discovery.providers_in(modules));
        let mut report = InjectionEngine::new(&self.registry)
            .inject_all(self.discovery.injection_sites_in(&known));
        report.load = load;
        report
    }

    /// Push a freshly built `instance` into every known site it satisfies.
    /// `modules` joins the known set first.
    ///
    /// The instance is not registered; register it separately if later passes
    /// should see it.
    pub fn inject_at_runtime(&self, instance: &Instance, modules: &ModuleSet) -> InjectionReport {
        let _pass = self.pass.lock();
        let known = self.add_modules(modules);
        tracing::info!(
            provider = instance.concrete().name(),
            known = %known,
            "Injecting at runtime"
        );
        InjectionEngine::new(&self.registry)
            .inject_runtime(instance, self.discovery.injection_sites_in(&known))
    }

    /// Best provider for `T`: highest priority, earliest registered on ties.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.registry
            .find_best(Capability::of::<T>())?
            .downcast::<T>()
    }

    /// Provider registered under exactly the concrete type `C`.
    pub fn get_exact<C: Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        self.registry
            .find_exact(Capability::of::<C>())?
            .downcast::<C>()
    }

    pub fn require<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.get::<T>()
            .ok_or_else(|| ContainerError::Missing(Capability::of::<T>()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn discovery(&self) -> &Arc<dyn TypeDiscovery> {
        &self.discovery
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registry", &self.registry)
            .field("known_modules", &self.known_modules().to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ProviderType;
    use crate::discovery::{ProviderDescriptor, StaticDiscovery};
    use std::sync::OnceLock;

    struct Marker;
    struct Extra;

    #[test]
    fn container_registers_itself() {
        let container = Container::with_discovery(StaticDiscovery::new());
        let handle = container.get::<ContainerHandle>().expect("self handle");
        let upgraded = handle.container().expect("container alive");
        assert!(Arc::ptr_eq(&upgraded, &container));
        assert!(container.get::<DiscoveryHandle>().is_some());
        assert_eq!(
            container
                .registry()
                .find_exact(Capability::of::<ContainerHandle>())
                .unwrap()
                .priority(),
            Priority::Highest
        );
    }

    #[test]
    fn self_handle_does_not_keep_container_alive() {
        let container = Container::with_discovery(StaticDiscovery::new());
        let handle = container.get::<ContainerHandle>().unwrap();
        drop(container);
        assert!(handle.container().is_none());
    }

    #[test]
    fn require_reports_missing_capability() {
        let container = Container::with_discovery(StaticDiscovery::new());
        let err = container.require::<String>().unwrap_err();
        assert!(matches!(err, ContainerError::Missing(c) if c == Capability::of::<String>()));
    }

    #[test]
    fn constructors_may_call_back_into_the_container() {
        let cell: Arc<OnceLock<Weak<Container>>> = Arc::new(OnceLock::new());
        let inner = Arc::clone(&cell);
        let discovery = StaticDiscovery::new().with_provider(ProviderDescriptor::new(
            "app",
            ProviderType::of::<Marker>(),
            move || {
                if let Some(container) = inner.get().and_then(Weak::upgrade) {
                    container.register_injection(Instance::of(Extra));
                    assert_eq!(container.known_modules(), ModuleSet::new(["app"]));
                }
                Ok(Marker)
            },
        ));
        let container = Container::with_discovery(discovery);
        cell.set(Arc::downgrade(&container)).unwrap();

        container.start_injection(&ModuleSet::new(["app"]));

        assert!(container.get::<Marker>().is_some());
        assert!(container.get::<Extra>().is_some());
    }
}
