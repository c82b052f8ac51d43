use thiserror::Error;

use crate::capability::Capability;

/// Why a provider could not be constructed.
#[derive(Debug, Error)]
pub enum ProvideError {
    /// The provider decided it cannot be provided in this environment.
    ///
    /// `should_log = false` marks optional providers whose absence is expected.
    #[error("{reason}")]
    Unprovidable { reason: String, should_log: bool },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
    #[error("constructor panicked: {0}")]
    Panicked(String),
}

impl ProvideError {
    pub fn unprovidable(reason: impl Into<String>) -> Self {
        ProvideError::Unprovidable {
            reason: reason.into(),
            should_log: true,
        }
    }

    /// Unprovidable without an error-level report.
    pub fn quietly_unprovidable(reason: impl Into<String>) -> Self {
        ProvideError::Unprovidable {
            reason: reason.into(),
            should_log: false,
        }
    }

    pub fn should_log(&self) -> bool {
        match self {
            ProvideError::Unprovidable { should_log, .. } => *should_log,
            _ => true,
        }
    }
}

/// A discovered item could not be loaded.
#[derive(Debug, Clone, Error)]
#[error("cannot load '{type_name}' from module '{module}': {reason}")]
pub struct DiscoveryError {
    pub module: String,
    pub type_name: String,
    pub reason: String,
}

impl DiscoveryError {
    pub fn new(
        module: impl Into<String>,
        type_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

/// Per-site failures reported by an injection pass.
#[derive(Debug, Clone, Error)]
pub enum InjectError {
    #[error("cannot inject into {declaring}#{field}: no provider found for {requested}")]
    Unresolved {
        declaring: &'static str,
        field: &'static str,
        requested: Capability,
    },
    #[error("cannot inject into {declaring}#{field}: {provider} was rejected as {requested}")]
    Assign {
        declaring: &'static str,
        field: &'static str,
        requested: Capability,
        provider: &'static str,
    },
}

impl InjectError {
    pub fn declaring_type(&self) -> &'static str {
        match self {
            InjectError::Unresolved { declaring, .. } | InjectError::Assign { declaring, .. } => {
                declaring
            }
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            InjectError::Unresolved { field, .. } | InjectError::Assign { field, .. } => field,
        }
    }
}

/// Errors surfaced by the host-facing container API.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("instance type mismatch: provider type is {expected}, value is {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("no provider registered for {0}")]
    Missing(Capability),
}
