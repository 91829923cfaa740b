//! Project board file (`pymakr.conf`) loading

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::profile::{ConnectionProfile, Endpoint, NetworkEndpoint};

/// Registry id given to the board described by the project file
pub const PROJECT_BOARD_ID: &str = "current";

/// The subset of a pymakr project file we care about
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PymakrConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_main_file")]
    pub main_file: String,
}

fn default_name() -> String {
    "Current Project".to_string()
}

fn default_username() -> String {
    "micro".to_string()
}

fn default_password() -> String {
    "python".to_string()
}

fn default_main_file() -> String {
    "main.py".to_string()
}

impl PymakrConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid pymakr project file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Project boards are always reached over WiFi/FTP
    pub fn to_profile(&self) -> ConnectionProfile {
        ConnectionProfile::new(
            PROJECT_BOARD_ID,
            self.name.clone(),
            Endpoint::Network(NetworkEndpoint::new(
                self.address.clone(),
                self.username.clone(),
                self.password.clone(),
            )),
        )
    }
}
