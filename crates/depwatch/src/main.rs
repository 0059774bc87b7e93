//! Depwatch CLI - audits a fleet of hosts for outdated Python dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use depwatch_auditor::audit::HostOutcome;
use depwatch_auditor::config::Config;
use depwatch_auditor::fleet::{CycleSummary, Fleet};

#[derive(Parser)]
#[command(name = "depwatch")]
#[command(
    author,
    version,
    about = "Audits a fleet of hosts for outdated Python dependencies"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text)
    #[arg(long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run audit cycles forever at the configured cadence
    Run,

    /// Audit the fleet once and print a summary
    Audit {
        /// Audit only this configured target
        #[arg(long)]
        host: Option<String>,
    },

    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    init_tracing(cli.verbose, config.log.file.as_deref())?;

    match cli.command {
        Commands::Run => {
            info!(
                "Starting scheduled audits every {} minutes",
                config.sources.check_interval_minutes
            );
            let fleet = Fleet::new(config)?;
            fleet.run_scheduled().await;
        }

        Commands::Audit { host } => {
            let fleet = Fleet::new(config)?;
            let summary = match host.as_deref() {
                Some(name) => fleet.run_cycle_for(name).await?,
                None => fleet.run_cycle().await,
            };

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }

            if summary.all_failed() {
                anyhow::bail!("all audited hosts failed");
            }
        }

        Commands::CheckConfig => {
            print_config(&config);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let registry = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .init();
        }
        None => registry.init(),
    }
    Ok(())
}

fn print_summary(summary: &CycleSummary) {
    println!("Cycle {}", summary.cycle_id);
    for host in &summary.hosts {
        match &host.outcome {
            HostOutcome::Completed { projects } => {
                println!("  {}: ok, {} project reports", host.host, projects);
            }
            HostOutcome::Failed { phase, error } => {
                println!("  {}: failed while {}: {}", host.host, phase, error);
            }
        }
    }
    println!(
        "{}/{} hosts succeeded",
        summary.succeeded_hosts(),
        summary.hosts.len()
    );
}

fn print_config(config: &Config) {
    println!("Configuration OK");
    println!("  interval: {} minutes", config.sources.check_interval_minutes);
    println!("  registry: {}", config.registry.url);
    println!("  reports:  {}", config.log.directory.display());
    println!("  targets:");
    for target in &config.sources.targets {
        if target.is_local() {
            println!("    {} -> local machine", target.name);
        } else {
            // Validation already resolved every remote target's key.
            let key = config
                .key_for(target)
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|_| "?".to_string());
            println!(
                "    {} -> {} (user {}, key {})",
                target.name, target.host, target.user, key
            );
        }
    }
}
