//! CLI command implementations

pub mod boards;
pub mod ports;
pub mod test;
pub mod transfer;

use anyhow::Result;

use crate::cli::args::Commands;
use crate::config::ServerConfig;

/// Execute a CLI command
pub async fn execute_command(command: Commands, config: ServerConfig) -> Result<()> {
    match command {
        Commands::Ports => ports::execute_ports_command().await,
        Commands::Boards => boards::execute_boards_command(&config).await,
        Commands::Test { connection } => test::execute_test_command(&config, &connection).await,
        Commands::Upload {
            connection,
            files,
            json,
        } => transfer::execute_upload_command(config, &connection, files, json).await,
        Commands::Download {
            connection,
            files,
            output,
            json,
        } => transfer::execute_download_command(config, &connection, files, output, json).await,
    }
}
