//! Command Line Interface module
//!
//! Operator commands that drive the transfer coordinator directly, without
//! going through the HTTP server.

pub mod args;
pub mod commands;

pub use args::*;

use anyhow::Result;

use crate::config::ServerConfig;
use crate::utils::logging::init_cli_logging;

/// Main CLI application runner
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_cli_logging(cli.verbose, cli.quiet)?;

    let config_path = cli.config.clone().unwrap_or_else(ServerConfig::default_path);
    let config = ServerConfig::load_or_default(&config_path)?;

    commands::execute_command(cli.command.clone(), config).await
}
