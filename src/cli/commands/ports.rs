//! Ports command implementation - List serial ports on this host

use anyhow::Result;
use log::info;

use crate::transport::list_serial_ports;

pub async fn execute_ports_command() -> Result<()> {
    info!("Scanning for serial ports...");

    let ports = tokio::task::spawn_blocking(list_serial_ports).await??;

    if ports.is_empty() {
        println!("⚠️  No serial ports detected");
        return Ok(());
    }

    println!("🔍 Detected Serial Ports:");
    println!("========================\n");

    for port in &ports {
        println!("Port: {}", port.device);
        println!("  Description: {}", port.description);
        println!("  HWID:        {}", port.hwid);
        println!();
    }

    println!("Total ports detected: {}", ports.len());
    Ok(())
}
