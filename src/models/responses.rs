//! API request/response models and server information structures

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::profile::{ConnectionProfile, Endpoint};
use super::transfer::{BatchReport, TransferDirection};

/// Outcome of a connectivity probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A file that was requested but not transferred
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of an upload or download request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferResult {
    pub success: bool,
    pub message: String,
    /// Files actually transferred, in request order
    #[serde(default)]
    pub files: Vec<String>,
    /// Files that were skipped, with the reason
    #[serde(default)]
    pub failed: Vec<FailedFile>,
    /// Location of the packaged download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_path: Option<PathBuf>,
    /// Opaque handle for `GET /download?id=`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<String>,
}

impl TransferResult {
    /// Request-level failure with no files transferred
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            files: Vec::new(),
            failed: Vec::new(),
            zip_path: None,
            archive_id: None,
        }
    }

    /// Best-effort batch result: the transport connected, so the batch succeeds
    /// however many individual files were skipped.
    pub fn from_batch(direction: TransferDirection, via: &str, report: &BatchReport) -> Self {
        let files = report.transferred();
        let failed = report.failures();

        let mut message = match direction {
            TransferDirection::Upload => format!("Uploaded {} files{}", files.len(), via),
            TransferDirection::Download => format!(
                "Downloaded {} of {} files{}",
                files.len(),
                report.attempted(),
                via
            ),
        };
        if !failed.is_empty() {
            message.push_str(&format!(" ({} failed)", failed.len()));
        }

        Self {
            success: true,
            message,
            files,
            failed,
            zip_path: None,
            archive_id: None,
        }
    }

    pub fn with_archive(mut self, archive_id: String, zip_path: PathBuf) -> Self {
        self.archive_id = Some(archive_id);
        self.zip_path = Some(zip_path);
        self
    }
}

/// Body of `POST /api/download`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Inline profile or `{"board_id": ...}`
    pub connection: serde_json::Value,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Query of `GET /download`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveQuery {
    pub id: Option<String>,
    pub path: Option<String>,
}

/// A serial port visible to the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialPortEntry {
    pub device: String,
    pub description: String,
    pub hwid: String,
}

/// Registered board as shown to clients (credentials stripped)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Address for network boards, port for serial boards
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_file: Option<String>,
}

impl BoardSummary {
    pub fn from_profile(profile: &ConnectionProfile, main_file: Option<String>) -> Self {
        let (target, username, baudrate) = match &profile.endpoint {
            Endpoint::Network(net) => (net.address.clone(), Some(net.username.clone()), None),
            Endpoint::Serial(serial) => (serial.port.clone(), None, Some(serial.baud_rate())),
            Endpoint::Unsupported => (String::new(), None, None),
        };

        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            kind: profile.kind().to_string(),
            target,
            username,
            baudrate,
            main_file,
        }
    }
}

/// Board list API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardListResponse {
    pub boards: Vec<BoardSummary>,
    pub server_info: ServerInfo,
}

/// Server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub hostname: String,
    pub started_at: DateTime<Local>,
    pub total_boards: usize,
}
