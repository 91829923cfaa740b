//! boardxfer - file transfer for MicroPython boards
//!
//! Moves files between a workstation and a board over one of two links: FTP
//! to a WiFi-connected board, or the interpreter's raw REPL over a serial
//! port. The same [`services::TransferCoordinator`] backs both the HTTP
//! server and the command line tool.

pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod security;
pub mod server;
pub mod services;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use models::*;
pub use services::{BoardRegistry, TransferCoordinator, Transports};

/// boardxfer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// boardxfer application name
pub const APP_NAME: &str = "boardxfer";
