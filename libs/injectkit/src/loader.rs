//! Provider loading: instantiate discovered provider types into a [`Registry`].

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::discovery::ProviderDescriptor;
use crate::error::{DiscoveryError, ProvideError};
use crate::priority::Priority;
use crate::registry::{Registration, Registry};

/// Knobs for a loading pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Concrete type name (as printed by `std::any::type_name`) -> priority
    /// that replaces the declared one.
    pub priority_overrides: HashMap<String, Priority>,
}

impl LoaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, type_name: impl Into<String>, priority: Priority) -> Self {
        self.priority_overrides.insert(type_name.into(), priority);
        self
    }

    /// Effective priority for `descriptor` after overrides.
    pub fn priority_for(&self, descriptor: &ProviderDescriptor) -> Priority {
        self.priority_overrides
            .get(descriptor.type_name())
            .copied()
            .unwrap_or_else(|| descriptor.priority())
    }
}

/// What happened to one discovered provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Registered(Registration),
    /// Already processed in this pass with an equal or higher priority.
    Duplicate { previous: Priority },
    Unprovidable { reason: String, should_log: bool },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct LoadRecord {
    pub module: &'static str,
    pub type_name: &'static str,
    pub priority: Priority,
    pub outcome: LoadOutcome,
}

/// Summary of a loading pass.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<LoadRecord>,
    pub discovery_failures: Vec<DiscoveryError>,
    /// Override keys that named no provider discovered in this pass, sorted.
    pub unmatched_overrides: Vec<String>,
}

impl LoadReport {
    fn count(&self, pred: impl Fn(&LoadOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Providers that ended up in the registry (inserted or replacing).
    pub fn loaded(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                LoadOutcome::Registered(Registration::Inserted | Registration::Replaced { .. })
            )
        })
    }

    pub fn replaced(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Registered(Registration::Replaced { .. })))
    }

    /// Constructed but rejected because a higher-priority entry already existed.
    pub fn kept(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Registered(Registration::Kept { .. })))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Duplicate { .. }))
    }

    pub fn unprovidable(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Unprovidable { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Failed(_)))
    }

    pub fn record(&self, type_name: &str) -> Option<&LoadRecord> {
        self.records.iter().rev().find(|r| r.type_name == type_name)
    }
}

/// Runs one loading pass against a registry.
pub struct ProviderLoader<'a> {
    registry: &'a Registry,
    options: &'a LoaderOptions,
}

impl<'a> ProviderLoader<'a> {
    pub fn new(registry: &'a Registry, options: &'a LoaderOptions) -> Self {
        Self { registry, options }
    }

    /// Instantiate and register every descriptor in order.
    ///
    /// No failure stops the pass; each one is logged and recorded.
    pub fn load<I>(&self, discovered: I) -> LoadReport
    where
        I: IntoIterator<Item = Result<ProviderDescriptor, DiscoveryError>>,
    {
        let mut report = LoadReport::default();
        let mut seen: HashMap<TypeId, Priority> = HashMap::new();
        let mut overridden: HashSet<&'static str> = HashSet::new();

        for item in discovered {
            let descriptor = match item {
                Ok(d) => d,
                Err(err) => {
                    tracing::debug!(
                        module = %err.module,
                        provider = %err.type_name,
                        reason = %err.reason,
                        "Cannot load provider type"
                    );
                    report.discovery_failures.push(err);
                    continue;
                }
            };

            if self.options.priority_overrides.contains_key(descriptor.type_name()) {
                overridden.insert(descriptor.type_name());
            }
            let priority = self.options.priority_for(&descriptor);
            let key = descriptor.provider_type().concrete().id();

            if let Some(&previous) = seen.get(&key) {
                if previous >= priority {
                    tracing::debug!(
                        provider = descriptor.type_name(),
                        %priority,
                        %previous,
                        "Skipping provider already loaded in this pass"
                    );
                    report.records.push(LoadRecord {
                        module: descriptor.module(),
                        type_name: descriptor.type_name(),
                        priority,
                        outcome: LoadOutcome::Duplicate { previous },
                    });
                    continue;
                }
            }
            seen.insert(key, priority);

            let outcome = self.load_one(&descriptor, priority);
            report.records.push(LoadRecord {
                module: descriptor.module(),
                type_name: descriptor.type_name(),
                priority,
                outcome,
            });
        }

        let mut unmatched: Vec<String> = self
            .options
            .priority_overrides
            .keys()
            .filter(|name| !overridden.contains(name.as_str()))
            .cloned()
            .collect();
        unmatched.sort();
        for name in &unmatched {
            tracing::warn!(
                provider = %name,
                "Priority override matched no provider in this pass; keys are full type paths"
            );
        }
        report.unmatched_overrides = unmatched;

        tracing::info!(
            loaded = report.loaded(),
            kept = report.kept(),
            duplicates = report.duplicates(),
            unprovidable = report.unprovidable(),
            failed = report.failed(),
            discovery_failures = report.discovery_failures.len(),
            "Provider loading finished"
        );
        report
    }

    fn load_one(&self, descriptor: &ProviderDescriptor, priority: Priority) -> LoadOutcome {
        let name = descriptor.type_name();
        match descriptor.construct() {
            Ok(instance) => {
                let registration = self.registry.register(instance, priority);
                match registration {
                    Registration::Kept { existing } => tracing::debug!(
                        provider = name,
                        %priority,
                        %existing,
                        "Provider outranked by an existing registration"
                    ),
                    _ => tracing::debug!(provider = name, %priority, "Added provider"),
                }
                LoadOutcome::Registered(registration)
            }
            Err(ProvideError::Unprovidable { reason, should_log }) => {
                if should_log {
                    tracing::error!(provider = name, %reason, "Cannot load provided type");
                } else {
                    tracing::debug!(provider = name, %reason, "Provider not available");
                }
                LoadOutcome::Unprovidable { reason, should_log }
            }
            Err(err) => {
                tracing::error!(provider = name, error = %err, "Cannot load provided type");
                LoadOutcome::Failed(err.to_string())
            }
        }
    }
}
