//! Injection engine: resolve injection sites against the registry.

use std::fmt;

use crate::capability::{AnyBox, Capability, Instance};
use crate::error::{DiscoveryError, InjectError};
use crate::loader::LoadReport;
use crate::registry::{ProviderEntry, Registry};
use crate::site::InjectionSite;

/// How a site got its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Registry entry registered under exactly the requested type.
    Exact,
    /// Highest-priority assignable entry.
    BestMatch,
    /// The instance passed to a runtime injection.
    Runtime,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resolution::Exact => "exact",
            Resolution::BestMatch => "best-match",
            Resolution::Runtime => "runtime",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSite {
    pub declaring: &'static str,
    pub field: &'static str,
    pub requested: Capability,
    pub provider: &'static str,
    pub resolution: Resolution,
}

/// Outcome of an injection pass.
#[derive(Debug, Clone, Default)]
pub struct InjectionReport {
    /// Provider loading that preceded the pass; empty for runtime injection.
    pub load: LoadReport,
    pub resolved: Vec<ResolvedSite>,
    pub unresolved: Vec<InjectError>,
    /// Consumer types that discovery found but could not load.
    pub discovery_failures: Vec<DiscoveryError>,
}

impl InjectionReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn resolved_site(&self, declaring: &str, field: &str) -> Option<&ResolvedSite> {
        self.resolved
            .iter()
            .find(|r| r.declaring == declaring && r.field == field)
    }

    pub fn unresolved_site(&self, declaring: &str, field: &str) -> Option<&InjectError> {
        self.unresolved
            .iter()
            .find(|e| e.declaring_type() == declaring && e.field_name() == field)
    }
}

pub struct InjectionEngine<'a> {
    registry: &'a Registry,
}

impl<'a> InjectionEngine<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Bulk protocol: every site gets the exact entry, else the best match.
    pub fn inject_all<I>(&self, sites: I) -> InjectionReport
    where
        I: IntoIterator<Item = Result<InjectionSite, DiscoveryError>>,
    {
        let mut report = InjectionReport::default();
        for site in sites {
            match site {
                Ok(site) => self.resolve_into(&site, &mut report),
                Err(err) => skip_failed_site(err, &mut report),
            }
        }
        tracing::info!(
            resolved = report.resolved.len(),
            unresolved = report.unresolved.len(),
            "Injection pass finished"
        );
        report
    }

    /// Runtime protocol: sites satisfied by `instance` receive it directly,
    /// the rest are resolved from the registry as in [`Self::inject_all`].
    pub fn inject_runtime<I>(&self, instance: &Instance, sites: I) -> InjectionReport
    where
        I: IntoIterator<Item = Result<InjectionSite, DiscoveryError>>,
    {
        let mut report = InjectionReport::default();
        let provider = instance.concrete().name();
        for site in sites {
            let site = match site {
                Ok(site) => site,
                Err(err) => {
                    skip_failed_site(err, &mut report);
                    continue;
                }
            };
            if instance.satisfies(site.requested()) {
                let outcome = assign(&site, instance.cast(site.requested()), provider, Resolution::Runtime);
                record(outcome, &mut report);
            } else {
                self.resolve_into(&site, &mut report);
            }
        }
        tracing::info!(
            provider,
            resolved = report.resolved.len(),
            unresolved = report.unresolved.len(),
            "Runtime injection finished"
        );
        report
    }

    /// Resolve a single site against the registry.
    pub fn resolve(&self, site: &InjectionSite) -> Result<ResolvedSite, InjectError> {
        let requested = site.requested();
        let (entry, resolution) = match self.registry.find_exact(requested) {
            Some(entry) => (entry, Resolution::Exact),
            None => match self.registry.find_best(requested) {
                Some(entry) => (entry, Resolution::BestMatch),
                None => {
                    return Err(InjectError::Unresolved {
                        declaring: site.declaring_type(),
                        field: site.field_name(),
                        requested,
                    })
                }
            },
        };
        assign_entry(site, &entry, resolution)
    }

    fn resolve_into(&self, site: &InjectionSite, report: &mut InjectionReport) {
        record(self.resolve(site), report);
    }
}

fn assign_entry(
    site: &InjectionSite,
    entry: &ProviderEntry,
    resolution: Resolution,
) -> Result<ResolvedSite, InjectError> {
    assign(site, entry.cast(site.requested()), entry.name(), resolution)
}

fn assign(
    site: &InjectionSite,
    value: Option<AnyBox>,
    provider: &'static str,
    resolution: Resolution,
) -> Result<ResolvedSite, InjectError> {
    let rejected = || InjectError::Assign {
        declaring: site.declaring_type(),
        field: site.field_name(),
        requested: site.requested(),
        provider,
    };
    let value = value.ok_or_else(rejected)?;
    if !site.assign(value) {
        return Err(rejected());
    }
    tracing::debug!(
        site = %site,
        provider,
        %resolution,
        "Injected dependency"
    );
    Ok(ResolvedSite {
        declaring: site.declaring_type(),
        field: site.field_name(),
        requested: site.requested(),
        provider,
        resolution,
    })
}

fn record(outcome: Result<ResolvedSite, InjectError>, report: &mut InjectionReport) {
    match outcome {
        Ok(resolved) => report.resolved.push(resolved),
        Err(err) => {
            tracing::error!(
                declaring = err.declaring_type(),
                field = err.field_name(),
                "{err}"
            );
            report.unresolved.push(err);
        }
    }
}

fn skip_failed_site(err: DiscoveryError, report: &mut InjectionReport) {
    tracing::debug!(
        module = %err.module,
        consumer = %err.type_name,
        reason = %err.reason,
        "Cannot load consumer type"
    );
    report.discovery_failures.push(err);
}
