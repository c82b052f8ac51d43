use anyhow::{bail, Context, Result};
use injectkit::{LoaderOptions, ModuleSet, Priority};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Host configuration for an injection run.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Module path prefixes scanned for providers and injection sites.
    /// Empty means every linked module.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Full provider type path (`kv_store::memory::MemStore`) → priority
    /// replacing the declared one.
    #[serde(default)]
    pub priorities: HashMap<String, Priority>,
    /// Base directory for relative log file paths (defaults to the working directory).
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
}

/// Logging configuration - maps target prefixes to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit targets.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/injectkit.log"
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>, // How many files to keep
    #[serde(default)]
    pub max_size_mb: Option<u64>, // Max size of the file in MB
}

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off", "none"];

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: String::new(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            priorities: HashMap::new(),
            log_dir: None,
            logging: Some(default_logging_config()),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Optional sections stay None unless YAML/ENV provide them.
        let base = BootstrapConfig {
            logging: None,
            ..Default::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            // Example: INJECTKIT__LOG_DIR=/var/log/app maps to log_dir
            .merge(Env::prefixed("INJECTKIT__").split("__"));

        let config: BootstrapConfig = figment
            .extract()
            .with_context(|| "Failed to extract config from figment".to_string())?;

        Ok(config)
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if !args.modules.is_empty() {
            self.modules = args.modules.clone();
        }

        // Set logging level based on verbose flags for "default" section.
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(), // keep
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    /// Reject configurations that would silently do nothing useful.
    pub fn validate(&self) -> Result<()> {
        for module in &self.modules {
            let trimmed = module.trim().trim_end_matches("::");
            if trimmed.is_empty() {
                bail!("modules: empty module prefix");
            }
            if trimmed.split("::").any(|seg| seg.is_empty()) {
                bail!("modules: malformed module path '{module}'");
            }
        }

        if let Some(logging) = &self.logging {
            for (target, section) in logging {
                for (field, level) in [
                    ("console_level", &section.console_level),
                    ("file_level", &section.file_level),
                ] {
                    if !level.is_empty() && !LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                        bail!("logging.{target}.{field}: unknown level '{level}'");
                    }
                }
            }
        }

        Ok(())
    }

    /// Module set the injection pass runs over.
    pub fn module_set(&self) -> ModuleSet {
        if self.modules.is_empty() {
            ModuleSet::all()
        } else {
            ModuleSet::new(self.modules.iter().cloned())
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            priority_overrides: self.priorities.clone(),
        }
    }

    /// Base directory for relative log paths.
    pub fn log_base_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub modules: Vec<String>,
    pub print_config: bool,
    pub verbose: u8,
}

#[cfg(test)]
mod tests;
