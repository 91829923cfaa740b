//! Boards command implementation - List registered boards

use anyhow::Result;

use crate::config::ServerConfig;
use crate::services::BoardRegistry;

pub async fn execute_boards_command(config: &ServerConfig) -> Result<()> {
    let registry = BoardRegistry::load(config);

    if registry.is_empty() {
        println!("⚠️  No boards registered");
        if let Some(path) = &config.board_config {
            println!("   Create {} or add [[boards]] to the config file", path.display());
        }
        return Ok(());
    }

    println!("📋 Registered boards:");
    for board in registry.summaries() {
        println!("  - {} [{}] {} → {}", board.id, board.kind, board.name, board.target);
        if let Some(main_file) = &board.main_file {
            println!("      main file: {}", main_file);
        }
        if let Some(baudrate) = board.baudrate {
            println!("      baud rate: {}", baudrate);
        }
    }

    Ok(())
}
