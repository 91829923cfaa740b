//! Server application implementation

use anyhow::Result;
use chrono::{DateTime, Local};
use log::info;
use std::sync::Arc;
use warp::Filter;

use crate::config::ServerConfig;
use crate::services::{BoardRegistry, TransferCoordinator};

/// Everything a request handler needs, shared read-only between requests
pub struct AppState {
    pub config: ServerConfig,
    pub coordinator: TransferCoordinator,
    pub registry: BoardRegistry,
    pub started_at: DateTime<Local>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        config: ServerConfig,
        coordinator: TransferCoordinator,
        registry: BoardRegistry,
    ) -> Self {
        Self {
            config,
            coordinator,
            registry,
            started_at: Local::now(),
        }
    }

    /// State wired to real serial ports and sockets
    pub fn from_config(config: ServerConfig) -> Self {
        let registry = BoardRegistry::load(&config);
        let coordinator = TransferCoordinator::with_system_transports(config.clone());
        Self::new(config, coordinator, registry)
    }
}

/// Server application main struct
pub struct ServerApp {
    config: ServerConfig,
    state: SharedState,
}

impl ServerApp {
    pub fn new(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::from_config(config.clone()));
        Self { config, state }
    }

    pub fn with_state(state: SharedState) -> Self {
        Self {
            config: state.config.clone(),
            state,
        }
    }

    pub fn get_state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub async fn run(self) -> Result<()> {
        info!(
            "🚀 Server starting on {}:{}",
            self.config.bind_address, self.config.port
        );

        let cors = warp::cors()
            .allow_any_origin()
            .allow_headers(vec!["content-type"])
            .allow_methods(vec!["GET", "POST", "OPTIONS"]);

        let logging = crate::server::middleware::with_request_logging();

        let routes = crate::server::routes::create_routes(self.get_state())
            .with(logging)
            .with(cors);

        let bind_addr: std::net::SocketAddr =
            format!("{}:{}", self.config.bind_address, self.config.port)
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

        info!("🌍 Server listening on http://{}", bind_addr);
        info!("📄 API endpoints:");
        info!("   POST   /api/test-connection  - Probe a board");
        info!("   POST   /api/upload           - Upload files (multipart)");
        info!("   POST   /api/download         - Download files into a zip archive");
        info!("   GET    /download?id=...      - Fetch a generated archive");
        info!("   GET    /api/boards           - Registered boards");
        info!("   GET    /api/serial-ports     - Serial ports on this host");
        info!("   GET    /health               - Health check");
        info!(
            "📦 Archives are written to {}",
            self.state.coordinator.archives().root().display()
        );

        let (_addr, server) =
            warp::serve(routes).try_bind_with_graceful_shutdown(bind_addr, async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("ℹ️ Received shutdown signal (Ctrl+C)...");
                }
            })?;

        server.await;

        info!("🛑 Server shut down gracefully");
        Ok(())
    }
}
