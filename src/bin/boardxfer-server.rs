//! boardxfer server - HTTP front end for board file transfers
//!
//! Binary entry point for the server application.

use anyhow::Result;
use clap::{Parser, Subcommand};
use boardxfer::config::ServerConfig;
use boardxfer::server::start_server;
use boardxfer::utils::logging::{init_server_logging, level_for};
use std::path::PathBuf;
use tokio::fs;

#[derive(Parser)]
#[command(name = "boardxfer-server")]
#[command(about = "📟 boardxfer server - upload and download board files over HTTP")]
struct ServerCli {
    /// Server configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for generated download archives
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Project board file (pymakr.conf)
    #[arg(long)]
    board_config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,

    /// Append logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<ServerCommands>,
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Start the server
    Start,
    /// Generate default configuration
    Config,
}

impl ServerCli {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(ServerConfig::default_path)
    }

    /// File settings first, then command line overrides
    fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load_or_default(&self.config_path())?;

        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.archive_dir {
            config.archive_dir = Some(dir.clone());
        }
        if let Some(path) = &self.board_config {
            config.board_config = Some(path.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServerCli::parse();

    init_server_logging(
        cli.log_json,
        cli.log_file.as_deref(),
        Some(level_for(cli.verbose, false)),
    )?;

    match cli.command {
        Some(ServerCommands::Start) | None => {
            log::info!("📟 Starting boardxfer server...");
            let config = cli.resolve_config()?;
            start_server(config).await
        }
        Some(ServerCommands::Config) => {
            log::info!("⚙️  Generating default configuration...");
            generate_config(&cli.config_path()).await
        }
    }
}

/// Generate a default server configuration file
async fn generate_config(config_path: &PathBuf) -> Result<()> {
    let toml_content = ServerConfig::default().to_toml()?;

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    fs::write(config_path, toml_content).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to write config file '{}': {}",
            config_path.display(),
            e
        )
    })?;

    println!(
        "✅ Generated default configuration file: {}",
        config_path.display()
    );
    println!("ℹ️  You can edit this file to customize server settings.");
    println!(
        "ℹ️  Use --config {} to load this configuration.",
        config_path.display()
    );

    Ok(())
}
