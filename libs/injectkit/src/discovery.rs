//! Type discovery: where providers and injection sites come from.
//!
//! The container never scans code itself. It asks a [`TypeDiscovery`] for the
//! providers and sites that belong to a [`ModuleSet`]. Two implementations ship
//! with the crate:
//!
//! - [`InventoryDiscovery`] reads the registrations emitted by `#[provides]`
//!   and `#[inject]` at link time.
//! - [`StaticDiscovery`] is filled by hand, which is what tests and small hosts
//!   usually want.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::capability::{AnyArc, Instance, ProviderType, ProviderTypeBuilder};
use crate::error::{DiscoveryError, ProvideError};
use crate::priority::Priority;
use crate::site::InjectionSite;

type CtorFn = dyn Fn() -> Result<AnyArc, ProvideError> + Send + Sync;

/// Returns true if `module` == `prefix` or `module` starts with `prefix::`.
fn matches_module_prefix(module: &str, prefix: &str) -> bool {
    module == prefix
        || (module.starts_with(prefix) && module[prefix.len()..].starts_with("::"))
}

/// Set of module path prefixes a pass is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSet {
    prefixes: Vec<String>,
    everything: bool,
}

impl ModuleSet {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(Into::into)
            .map(|p| p.trim().trim_end_matches("::").to_string())
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Self {
            prefixes,
            everything: false,
        }
    }

    /// Matches every module.
    pub fn all() -> Self {
        Self {
            prefixes: Vec::new(),
            everything: true,
        }
    }

    pub fn contains(&self, module_path: &str) -> bool {
        self.everything
            || self
                .prefixes
                .iter()
                .any(|prefix| matches_module_prefix(module_path, prefix))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        !self.everything && self.prefixes.is_empty()
    }

    /// Every module matched by `self` or `other`.
    pub fn union(&self, other: &ModuleSet) -> ModuleSet {
        if self.everything || other.everything {
            return Self::all();
        }
        Self::new(self.prefixes.iter().chain(&other.prefixes).cloned())
    }
}

impl<S: Into<String>> FromIterator<S> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.everything {
            f.write_str("*")
        } else {
            f.write_str(&self.prefixes.join(", "))
        }
    }
}

/// A provider type found by discovery, ready to be instantiated.
#[derive(Clone)]
pub struct ProviderDescriptor {
    module: &'static str,
    ty: Arc<ProviderType>,
    priority: Priority,
    ctor: Arc<CtorFn>,
}

impl ProviderDescriptor {
    pub fn new<C, F>(module: &'static str, ty: ProviderTypeBuilder<C>, ctor: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn() -> Result<C, ProvideError> + Send + Sync + 'static,
    {
        Self {
            module,
            ty: ty.build(),
            priority: Priority::default(),
            ctor: Arc::new(move || ctor().map(|value| Arc::new(value) as AnyArc)),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn provider_type(&self) -> &Arc<ProviderType> {
        &self.ty
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Run the no-argument constructor. Panics are reported as [`ProvideError::Panicked`].
    pub fn construct(&self) -> Result<Instance, ProvideError> {
        let ctor = Arc::clone(&self.ctor);
        let value = match panic::catch_unwind(AssertUnwindSafe(|| ctor())) {
            Ok(result) => result?,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                return Err(ProvideError::Panicked(message));
            }
        };
        Ok(Instance::from_parts(Arc::clone(&self.ty), value))
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("module", &self.module)
            .field("type", &self.type_name())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Source of provider types and injection sites.
pub trait TypeDiscovery: Send + Sync {
    fn providers_in(&self, modules: &ModuleSet) -> Vec<Result<ProviderDescriptor, DiscoveryError>>;

    fn injection_sites_in(&self, modules: &ModuleSet) -> Vec<Result<InjectionSite, DiscoveryError>>;
}

// ---------------------------------------------------------------------------
// Link-time registrations
// ---------------------------------------------------------------------------

/// Submitted by `#[provides]` via `inventory::submit!`.
pub struct ProviderRegistration {
    pub module: &'static str,
    pub describe: fn() -> ProviderDescriptor,
}

/// Submitted by `#[inject]` via `inventory::submit!`.
pub struct SiteRegistration {
    pub module: &'static str,
    pub describe: fn() -> InjectionSite,
}

inventory::collect!(ProviderRegistration);
inventory::collect!(SiteRegistration);

/// Discovery over everything linked into the binary.
///
/// Results are ordered by module path, then type or field name, so the
/// first-registered tie-break does not depend on link order.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryDiscovery;

impl TypeDiscovery for InventoryDiscovery {
    fn providers_in(&self, modules: &ModuleSet) -> Vec<Result<ProviderDescriptor, DiscoveryError>> {
        let mut found = Vec::new();
        for registration in ::inventory::iter::<ProviderRegistration> {
            if modules.contains(registration.module) {
                found.push((registration.describe)());
            }
        }
        found.sort_by(|a, b| {
            a.module()
                .cmp(b.module())
                .then_with(|| a.type_name().cmp(b.type_name()))
        });
        found.into_iter().map(Ok).collect()
    }

    fn injection_sites_in(&self, modules: &ModuleSet) -> Vec<Result<InjectionSite, DiscoveryError>> {
        let mut found = Vec::new();
        for registration in ::inventory::iter::<SiteRegistration> {
            if modules.contains(registration.module) {
                found.push((registration.describe)());
            }
        }
        found.sort_by(|a, b| {
            a.declaring_type()
                .cmp(b.declaring_type())
                .then_with(|| a.field_name().cmp(b.field_name()))
        });
        found.into_iter().map(Ok).collect()
    }
}

// ---------------------------------------------------------------------------
// Hand-filled discovery
// ---------------------------------------------------------------------------

enum Discovered<T> {
    Item(T),
    Failure(DiscoveryError),
}

/// Discovery filled explicitly, in registration order.
#[derive(Default)]
pub struct StaticDiscovery {
    providers: Vec<Discovered<ProviderDescriptor>>,
    sites: Vec<Discovered<InjectionSite>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, descriptor: ProviderDescriptor) -> Self {
        self.providers.push(Discovered::Item(descriptor));
        self
    }

    pub fn with_site(mut self, site: InjectionSite) -> Self {
        self.sites.push(Discovered::Item(site));
        self
    }

    /// A provider type that is reported as discovered but cannot be loaded.
    pub fn with_provider_failure(mut self, error: DiscoveryError) -> Self {
        self.providers.push(Discovered::Failure(error));
        self
    }

    /// A consumer type that is reported as discovered but cannot be loaded.
    pub fn with_site_failure(mut self, error: DiscoveryError) -> Self {
        self.sites.push(Discovered::Failure(error));
        self
    }
}

impl TypeDiscovery for StaticDiscovery {
    fn providers_in(&self, modules: &ModuleSet) -> Vec<Result<ProviderDescriptor, DiscoveryError>> {
        self.providers
            .iter()
            .filter_map(|d| match d {
                Discovered::Item(p) if modules.contains(p.module()) => Some(Ok(p.clone())),
                Discovered::Failure(e) if modules.contains(&e.module) => Some(Err(e.clone())),
                _ => None,
            })
            .collect()
    }

    fn injection_sites_in(&self, modules: &ModuleSet) -> Vec<Result<InjectionSite, DiscoveryError>> {
        self.sites
            .iter()
            .filter_map(|d| match d {
                Discovered::Item(s) if modules.contains(s.declaring_type()) => Some(Ok(s.clone())),
                Discovered::Failure(e) if modules.contains(&e.module) => Some(Err(e.clone())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Inject;

    #[derive(Default)]
    struct Clock;

    #[test]
    fn module_set_matches_whole_path_segments() {
        let set = ModuleSet::new(["kv_store", "audit::sinks::"]);
        assert!(set.contains("kv_store"));
        assert!(set.contains("kv_store::memory"));
        assert!(!set.contains("kv_store_extra"));
        assert!(set.contains("audit::sinks::file"));
        assert!(!set.contains("audit"));
        assert_eq!(set.prefixes(), &["audit::sinks".to_string(), "kv_store".to_string()]);
    }

    #[test]
    fn empty_and_universal_sets() {
        assert!(ModuleSet::default().is_empty());
        assert!(!ModuleSet::default().contains("anything"));
        assert!(ModuleSet::all().contains("anything::at::all"));
        assert_eq!(ModuleSet::all().to_string(), "*");
    }

    #[test]
    fn union_merges_prefixes() {
        let app = ModuleSet::new(["app", "kv_store"]);
        let plugin = ModuleSet::new(["plugin", "kv_store"]);

        let both = app.union(&plugin);
        assert_eq!(both.prefixes(), &["app".to_string(), "kv_store".to_string(), "plugin".to_string()]);
        assert_eq!(ModuleSet::default().union(&app), app);
        assert_eq!(app.union(&ModuleSet::all()), ModuleSet::all());
    }

    #[test]
    fn construct_reports_panics() {
        let descriptor = ProviderDescriptor::new("app", ProviderType::of::<Clock>(), || -> Result<Clock, ProvideError> {
            panic!("clock hardware missing")
        });
        match descriptor.construct() {
            Err(ProvideError::Panicked(msg)) => assert!(msg.contains("clock hardware missing")),
            other => panic!("expected panic classification, got {other:?}"),
        }
    }

    #[test]
    fn static_discovery_filters_by_module() {
        let slot: Arc<Inject<Clock>> = Arc::new(Inject::new());
        let discovery = StaticDiscovery::new()
            .with_provider(ProviderDescriptor::new("app::time", ProviderType::of::<Clock>(), || Ok(Clock)))
            .with_provider_failure(DiscoveryError::new("plugins::gpu", "GpuClock", "missing libcuda"))
            .with_site(InjectionSite::shared("app::jobs", "CLOCK", slot));

        let app = ModuleSet::new(["app"]);
        assert_eq!(discovery.providers_in(&app).len(), 1);
        assert_eq!(discovery.injection_sites_in(&app).len(), 1);

        let plugins = ModuleSet::new(["plugins"]);
        let found = discovery.providers_in(&plugins);
        assert_eq!(found.len(), 1);
        assert!(found[0].is_err());
        assert!(discovery.injection_sites_in(&plugins).is_empty());
    }
}
