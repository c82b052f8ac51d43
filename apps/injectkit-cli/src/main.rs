use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use injectkit::{Container, InjectionReport, Registry};
use injectkit_bootstrap::{BootstrapConfig, CliArgs};

use std::path::PathBuf;

mod registered_modules;

/// injectkit CLI - run an injection pass over the linked plugin modules
#[derive(Parser, Debug)]
#[command(name = "injectkit-cli")]
#[command(about = "Run an injection pass over the linked plugin modules")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Module path prefix to scan (repeatable, overrides config)
    #[arg(short, long = "module")]
    modules: Vec<String>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Load providers, inject every site and print the result
    Run {
        /// Exit successfully even if some sites stay unresolved
        #[arg(long)]
        allow_unresolved: bool,
    },
    /// Validate configuration and exit
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        modules: cli.modules.clone(),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (INJECTKIT__*) -> 4) CLI overrides
    let mut config = BootstrapConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    injectkit_bootstrap::init_logging(&logging_config, &config.log_base_dir());

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run {
        allow_unresolved: false,
    }) {
        Commands::Run { allow_unresolved } => run(&config, allow_unresolved),
        Commands::Check => check_config(&config),
    }
}

fn run(config: &BootstrapConfig, allow_unresolved: bool) -> Result<()> {
    config.validate()?;

    let modules = config.module_set();
    tracing::info!(modules = %modules, "injectkit-cli starting");

    let container = Container::new();
    let report = container.start_injection_with(&modules, &config.loader_options());

    print_registry(container.registry());
    print_report(&report);

    match audit::record("injection pass completed") {
        Ok(event) => tracing::info!(backend = %event.backend, "Audit trail is live"),
        Err(e) => tracing::warn!(error = %e, "Audit trail unavailable"),
    }

    if !report.is_complete() && !allow_unresolved {
        bail!(
            "{} injection site(s) left unresolved",
            report.unresolved.len()
        );
    }
    Ok(())
}

fn check_config(config: &BootstrapConfig) -> Result<()> {
    tracing::info!("Checking configuration…");
    config.validate()?;
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn print_registry(registry: &Registry) {
    println!("Providers ({}):", registry.len());
    for entry in registry.values() {
        println!("  {:<8} {}", entry.priority().to_string(), entry.name());
    }
}

fn print_report(report: &InjectionReport) {
    let load = &report.load;
    println!(
        "Loaded {} provider(s): {} replaced, {} outranked, {} duplicate, {} unprovidable, {} failed",
        load.loaded(),
        load.replaced(),
        load.kept(),
        load.duplicates(),
        load.unprovidable(),
        load.failed()
    );

    if !load.unmatched_overrides.is_empty() {
        println!(
            "Priority overrides matching no provider: {}",
            load.unmatched_overrides.join(", ")
        );
    }

    println!("Injected {} site(s):", report.resolved.len());
    for site in &report.resolved {
        println!(
            "  {}#{} <- {} ({})",
            site.declaring, site.field, site.provider, site.resolution
        );
    }

    if !report.unresolved.is_empty() {
        println!("Unresolved {} site(s):", report.unresolved.len());
        for err in &report.unresolved {
            println!("  {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_modules_and_verbosity() {
        let cli = Cli::try_parse_from([
            "injectkit-cli",
            "--module",
            "kv_store",
            "-m",
            "audit",
            "-vv",
            "run",
            "--allow-unresolved",
        ])
        .unwrap();

        assert_eq!(cli.modules, vec!["kv_store", "audit"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                allow_unresolved: true
            })
        );
    }

    #[test]
    fn defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["injectkit-cli", "-c", "app.yaml", "--print-config"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("app.yaml")));
        assert!(cli.print_config);
        assert!(cli.command.is_none());
    }

    #[test]
    fn check_subcommand() {
        let cli = Cli::try_parse_from(["injectkit-cli", "check"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Check));
    }
}
