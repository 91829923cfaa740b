//! HTTP server module
//!
//! JSON API in front of the transfer coordinator: connection probes,
//! multipart uploads, archived downloads and board/port listings.

pub mod app;
pub mod middleware;
pub mod routes;

pub use app::*;

use anyhow::Result;

use crate::config::ServerConfig;

/// Start the boardxfer server and run until Ctrl+C
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let app = ServerApp::new(config);
    app.run().await
}
