//! # injectkit - runtime dependency injection for modular applications
//!
//! Providers are registered in a [`Registry`] under their concrete type with a
//! [`Priority`]. Consumers declare injection sites ([`Inject<T>`] slots) that
//! request a capability, usually a trait object. For each site the container
//! picks the single best provider:
//!
//! - an entry registered under exactly the requested type, if any;
//! - otherwise the highest-priority entry assignable to it, the earliest
//!   registered winning ties.
//!
//! Providers and sites are found through a [`TypeDiscovery`] restricted to a
//! [`ModuleSet`]. The default discovery reads registrations emitted by the
//! `#[provides]` and `#[inject]` attributes.
//!
//! ```rust,ignore
//! use injectkit::{inject, provides, Container, Inject, ModuleSet};
//!
//! pub trait Store: Send + Sync {
//!     fn get(&self, key: &str) -> Option<String>;
//! }
//!
//! #[derive(Default)]
//! #[provides(priority = High, implements = [dyn Store])]
//! pub struct MemStore { /* ... */ }
//!
//! #[inject]
//! static STORE: Inject<dyn Store> = Inject::new();
//!
//! let container = Container::new();
//! let report = container.start_injection(&ModuleSet::new(["my_app"]));
//! assert!(report.is_complete());
//! ```
//!
//! No failure during loading or injection aborts a pass; everything is logged
//! through `tracing` and collected in the returned [`InjectionReport`].

// Re-export inventory for the macro expansions
pub use inventory;

pub use injectkit_macros::{inject, provides};

pub mod capability;
pub mod container;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod loader;
pub mod priority;
pub mod registry;
pub mod site;
pub mod slot;

pub use capability::{AnyArc, AnyBox, Capability, Instance, ProviderType, ProviderTypeBuilder};
pub use container::{Container, ContainerHandle, DiscoveryHandle};
pub use discovery::{
    InventoryDiscovery, ModuleSet, ProviderDescriptor, ProviderRegistration, SiteRegistration,
    StaticDiscovery, TypeDiscovery,
};
pub use engine::{InjectionEngine, InjectionReport, Resolution, ResolvedSite};
pub use error::{ContainerError, DiscoveryError, InjectError, ProvideError};
pub use loader::{LoadOutcome, LoadRecord, LoadReport, LoaderOptions, ProviderLoader};
pub use priority::{ParsePriorityError, Priority};
pub use registry::{ProviderEntry, Registration, Registry};
pub use site::InjectionSite;
pub use slot::Inject;
