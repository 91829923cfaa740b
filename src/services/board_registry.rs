//! Known boards and serial port discovery

use anyhow::{Context, Result, bail};
use log::{info, warn};
use serde_json::Value;

use crate::config::{PROJECT_BOARD_ID, PymakrConfig, ServerConfig};
use crate::models::profile::ConnectionProfile;
use crate::models::responses::{BoardSummary, SerialPortEntry};
use crate::transport::list_serial_ports;

#[derive(Debug, Clone)]
struct RegisteredBoard {
    profile: ConnectionProfile,
    main_file: Option<String>,
}

/// Boards loaded at startup, in registration order
#[derive(Debug, Clone, Default)]
pub struct BoardRegistry {
    boards: Vec<RegisteredBoard>,
}

impl BoardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project board file first, then boards declared in the config.
    ///
    /// A missing or malformed project file is logged and skipped.
    pub fn load(config: &ServerConfig) -> Self {
        let mut registry = Self::new();

        if let Some(path) = &config.board_config {
            if path.exists() {
                match PymakrConfig::load(path) {
                    Ok(project) => {
                        info!("📋 Loaded project board '{}' from {}", project.name, path.display());
                        registry.register_with_main_file(project.to_profile(), Some(project.main_file));
                    }
                    Err(e) => warn!("⚠️ Error loading board config: {:#}", e),
                }
            } else {
                info!("No project board file at {}", path.display());
            }
        }

        for profile in &config.boards {
            registry.register(profile.clone());
        }

        info!("📋 {} boards registered", registry.len());
        registry
    }

    /// Add a board; a later registration with the same id replaces the earlier one
    pub fn register(&mut self, profile: ConnectionProfile) {
        self.register_with_main_file(profile, None);
    }

    fn register_with_main_file(&mut self, profile: ConnectionProfile, main_file: Option<String>) {
        if profile.id.is_empty() {
            warn!("⚠️ Ignoring board '{}' without an id", profile.name);
            return;
        }
        self.boards.retain(|board| board.profile.id != profile.id);
        self.boards.push(RegisteredBoard { profile, main_file });
    }

    pub fn list(&self) -> Vec<&ConnectionProfile> {
        self.boards.iter().map(|board| &board.profile).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionProfile> {
        self.boards
            .iter()
            .find(|board| board.profile.id == id)
            .map(|board| &board.profile)
    }

    /// Client-facing view without credentials
    pub fn summaries(&self) -> Vec<BoardSummary> {
        self.boards
            .iter()
            .map(|board| BoardSummary::from_profile(&board.profile, board.main_file.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn project_board(&self) -> Option<&ConnectionProfile> {
        self.get(PROJECT_BOARD_ID)
    }

    pub fn serial_ports(&self) -> Result<Vec<SerialPortEntry>> {
        list_serial_ports().context("Failed to enumerate serial ports")
    }

    /// Turn request JSON into a profile: either `{"board_id": ...}` or an
    /// inline profile tagged with `type`
    pub fn resolve_connection(&self, value: &Value) -> Result<ConnectionProfile> {
        if let Some(id) = value.get("board_id").and_then(Value::as_str) {
            return match self.get(id) {
                Some(profile) => Ok(profile.clone()),
                None => bail!("Unknown board '{}'", id),
            };
        }

        if !value.is_object() {
            bail!("Connection must be a JSON object");
        }

        serde_json::from_value(value.clone()).context("Invalid connection profile")
    }
}
