//! Test command implementation - Probe a board

use anyhow::{Result, bail};

use crate::cli::args::ConnectionArgs;
use crate::config::ServerConfig;
use crate::services::{BoardRegistry, TransferCoordinator};

pub async fn execute_test_command(config: &ServerConfig, connection: &ConnectionArgs) -> Result<()> {
    let registry = BoardRegistry::load(config);
    let profile = connection.to_profile(&registry, config.serial.default_baud_rate)?;

    println!("🔎 Testing {}...", profile.describe());
    let coordinator = TransferCoordinator::with_system_transports(config.clone());
    let result = coordinator.test_connection(&profile).await;

    if result.success {
        println!("✅ {}", result.message);
        Ok(())
    } else {
        bail!("{}", result.message)
    }
}
