//! Application configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::profile::{ConnectionProfile, DEFAULT_BAUD_RATE};

/// File name looked up when no `--config` is given
pub const CONFIG_FILE_NAME: &str = "boardxfer.toml";

/// Server and transfer configuration, loaded once at process start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listening address
    pub bind_address: String,
    /// Server listening port
    pub port: u16,
    /// Maximum multipart upload size (in MB)
    pub max_upload_mb: u64,
    /// Where download archives are written (defaults to the system temp dir)
    pub archive_dir: Option<PathBuf>,
    /// How long a generated archive stays downloadable (seconds)
    pub archive_ttl_secs: u64,
    /// Project board file (pymakr.conf)
    pub board_config: Option<PathBuf>,
    /// Extra boards declared directly in the config file
    pub boards: Vec<ConnectionProfile>,
    /// Serial raw-REPL timing
    pub serial: SerialTimings,
    /// FTP connection settings
    pub network: NetworkSettings,
}

/// Delays and bounds used by the raw-REPL driver, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialTimings {
    /// Baud rate used when a profile does not carry one
    pub default_baud_rate: u32,
    /// Wait after sending Ctrl-A before submitting a command
    pub raw_repl_settle_ms: u64,
    /// Read the `>` raw-REPL prompt instead of only sleeping
    pub await_prompt: bool,
    /// Wait after an upload command when writes are not confirmed
    pub upload_settle_ms: u64,
    /// Read the completion frame after uploads and report device exceptions
    pub confirm_writes: bool,
    /// Bound on every single read from the port
    pub read_timeout_ms: u64,
    /// Bound on the whole wait for one response
    pub response_deadline_ms: u64,
    /// Bound on discarding stale input before a command
    pub drain_ms: u64,
    /// Wait between the connection probe write and read
    pub probe_wait_ms: u64,
}

/// FTP client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkSettings {
    /// Timeout for connecting and for each reply during transfers (seconds)
    pub transfer_timeout_secs: u64,
    /// Timeout for connectivity probes (seconds)
    pub probe_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_mb: 3,
            archive_dir: None,
            archive_ttl_secs: 3600,
            board_config: Some(PathBuf::from("../pymakr.conf")),
            boards: Vec::new(),
            serial: SerialTimings::default(),
            network: NetworkSettings::default(),
        }
    }
}

impl Default for SerialTimings {
    fn default() -> Self {
        Self {
            default_baud_rate: DEFAULT_BAUD_RATE,
            raw_repl_settle_ms: 100,
            await_prompt: false,
            upload_settle_ms: 1000,
            confirm_writes: false,
            read_timeout_ms: 5000,
            response_deadline_ms: 30_000,
            drain_ms: 50,
            probe_wait_ms: 500,
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            transfer_timeout_secs: 30,
            probe_timeout_secs: 10,
        }
    }
}

impl SerialTimings {
    pub fn raw_repl_settle(&self) -> Duration {
        Duration::from_millis(self.raw_repl_settle_ms)
    }

    pub fn upload_settle(&self) -> Duration {
        Duration::from_millis(self.upload_settle_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn response_deadline(&self) -> Duration {
        Duration::from_millis(self.response_deadline_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    pub fn probe_wait(&self) -> Duration {
        Duration::from_millis(self.probe_wait_ms)
    }
}

impl NetworkSettings {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Load the file when it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!(
                "Config file {} not found, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// `./boardxfer.toml` when present, otherwise the per-user config file
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("boardxfer").join(CONFIG_FILE_NAME))
            .unwrap_or(local)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Directory for generated archives
    pub fn resolved_archive_dir(&self) -> PathBuf {
        self.archive_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("boardxfer"))
    }

    pub fn archive_ttl(&self) -> Duration {
        Duration::from_secs(self.archive_ttl_secs)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::ConnectionKind;

    #[test]
    fn test_defaults_match_original_timing() {
        let timings = SerialTimings::default();
        assert_eq!(timings.raw_repl_settle(), Duration::from_millis(100));
        assert_eq!(timings.upload_settle(), Duration::from_secs(1));
        assert_eq!(timings.read_timeout(), Duration::from_secs(5));
        assert_eq!(ServerConfig::default().max_upload_bytes(), 3 * 1024 * 1024);
        assert_eq!(ServerConfig::default().archive_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
port = 8081

[serial]
confirm_writes = true

[[boards]]
id = "bench"
name = "Bench board"
type = "serial"
port = "/dev/ttyUSB1"
baudrate = 921600
"#,
        )
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.archive_ttl_secs, 3600);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert!(config.serial.confirm_writes);
        assert_eq!(config.serial.raw_repl_settle_ms, 100);
        assert_eq!(config.boards.len(), 1);
        assert_eq!(config.boards[0].kind(), ConnectionKind::Serial);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = ServerConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: ServerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.serial, config.serial);
        assert_eq!(parsed.network, config.network);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ServerConfig::load_or_default(Path::new("/nonexistent/boardxfer.toml"))
            .unwrap();
        assert_eq!(config.port, 5000);
    }
}
