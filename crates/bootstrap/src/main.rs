use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ags_bootstrap::cli::{self, Cli, Command, ConfigCommand};
use ags_bootstrap::orchestrator::{migrate_only, provision_existing};
use ags_bootstrap::{Orchestrator, RunOptions};
use ags_infra::SystemRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_override = cli.config.as_deref();

    match &cli.command {
        // Default to the full run when no subcommand is given.
        None => up(&cli, false, false).await,
        Some(Command::Up { json, skip_infra }) => up(&cli, *json, *skip_infra).await,
        Some(Command::Migrate) => {
            init_tracing(cli.log_json);
            let (mut config, _) = cli::load_config(config_override)?;
            match migrate_only(&mut config).await {
                Ok((applied, seed)) => {
                    println!(
                        "migrations applied: {applied}; seeded catalog={} templates={} links={}",
                        seed.catalog_inserted, seed.templates_inserted, seed.links_inserted
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(e.exit_code());
                }
            }
        }
        Some(Command::Provision { user_id }) => {
            init_tracing(cli.log_json);
            let (mut config, _) = cli::load_config(config_override)?;
            match provision_existing(&mut config, *user_id).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(e.exit_code());
                }
            }
        }
        Some(Command::Probe { host, port, timeout }) => {
            init_tracing(cli.log_json);
            if !cli::probe::run(host, *port, *timeout).await {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Doctor) => {
            let (config, config_path) = cli::load_config(config_override)?;
            if !cli::doctor::run(&config, &config_path, &SystemRunner).await {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config(config_override)?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _) = cli::load_config(config_override)?;
            cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("agentstack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn up(cli: &Cli, json: bool, skip_infra: bool) -> anyhow::Result<()> {
    init_tracing(cli.log_json);
    let (config, config_path) = cli::load_config(cli.config.as_deref())?;
    tracing::info!(config = %config_path.display(), skip_infra, "agentstack bootstrap starting");

    let mut orchestrator = Orchestrator::new(config, Arc::new(SystemRunner), RunOptions { skip_infra });
    match orchestrator.run().await {
        Ok(summary) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.render_table());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Logs go to stderr so stdout carries only the summary.
///
/// Compact text by default, JSON lines with `--log-json`.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ags_bootstrap=debug"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
