pub mod config;
pub mod doctor;
pub mod probe;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// agentstack: bring up and seed a local agent-platform environment.
#[derive(Debug, Parser)]
#[command(name = "agentstack", version, about)]
pub struct Cli {
    /// Config file (overrides `AGS_CONFIG`; default `bootstrap.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Emit logs as JSON lines instead of compact text.
    #[arg(long, global = true)]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full bootstrap (default when no subcommand is given).
    Up {
        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
        /// Reuse running containers instead of recreating them.
        #[arg(long)]
        skip_infra: bool,
    },
    /// Apply schema migrations and seed the catalog against a running database.
    Migrate,
    /// Provision the default agent and tools for an existing user via SQL.
    Provision {
        #[arg(long)]
        user_id: Uuid,
    },
    /// Wait for a TCP port to accept connections.
    Probe {
        host: String,
        port: u16,
        /// Budget in whole seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Resolve the config path (`--config`, then `AGS_CONFIG`, then
/// `bootstrap.toml`) and load it. A missing file means defaults.
pub fn load_config(
    explicit: Option<&std::path::Path>,
) -> anyhow::Result<(ags_domain::config::Config, PathBuf)> {
    let config_path = match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::var_os("AGS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("bootstrap.toml")),
    };

    let config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", config_path.display()))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {}: {e}", config_path.display()))?
    } else {
        ags_domain::config::Config::default()
    };

    Ok((config, config_path))
}
