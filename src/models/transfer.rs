//! Transfer requests and per-file outcomes

use std::fmt;

use super::profile::ConnectionProfile;
use super::responses::FailedFile;
use crate::errors::FileTransferError;

/// A file to push to the board
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Logical name as supplied by the client (sanitized before use)
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransferPayload {
    Upload(Vec<UploadFile>),
    Download(Vec<String>),
}

/// Which way the files travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Upload,
    Download,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Upload => write!(f, "upload"),
            TransferDirection::Download => write!(f, "download"),
        }
    }
}

/// A profile plus the ordered files to move
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub profile: ConnectionProfile,
    pub payload: TransferPayload,
}

impl TransferRequest {
    pub fn upload(profile: ConnectionProfile, files: Vec<UploadFile>) -> Self {
        Self {
            profile,
            payload: TransferPayload::Upload(files),
        }
    }

    pub fn download(profile: ConnectionProfile, names: Vec<String>) -> Self {
        Self {
            profile,
            payload: TransferPayload::Download(names),
        }
    }

    pub fn direction(&self) -> TransferDirection {
        match self.payload {
            TransferPayload::Upload(_) => TransferDirection::Upload,
            TransferPayload::Download(_) => TransferDirection::Download,
        }
    }

    pub fn file_count(&self) -> usize {
        match &self.payload {
            TransferPayload::Upload(files) => files.len(),
            TransferPayload::Download(names) => names.len(),
        }
    }
}

/// Tagged result for one file of a batch
#[derive(Debug)]
pub struct FileOutcome {
    /// Name the file was transferred under (sanitized when possible)
    pub name: String,
    pub result: Result<(), FileTransferError>,
}

/// Ordered outcomes of a best-effort batch
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, name: impl Into<String>) {
        self.outcomes.push(FileOutcome {
            name: name.into(),
            result: Ok(()),
        });
    }

    pub fn record_failure(&mut self, name: impl Into<String>, error: FileTransferError) {
        let name = name.into();
        log::warn!("⚠️ Skipping {}: {}", name, error);
        self.outcomes.push(FileOutcome {
            name,
            result: Err(error),
        });
    }

    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    /// Names that made it across, in request order
    pub fn transferred(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.name.clone())
            .collect()
    }

    pub fn failures(&self) -> Vec<FailedFile> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                Ok(()) => None,
                Err(e) => Some(FailedFile {
                    name: o.name.clone(),
                    reason: e.to_string(),
                }),
            })
            .collect()
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProtocolError;

    #[test]
    fn test_batch_report_keeps_request_order() {
        let mut report = BatchReport::new();
        report.record_success("a.py");
        report.record_failure("b.py", ProtocolError::RemoteFileError.into());
        report.record_success("c.py");

        assert_eq!(report.transferred(), vec!["a.py", "c.py"]);
        assert_eq!(report.attempted(), 3);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "b.py");
        assert_eq!(failures[0].reason, "device could not read the file");
    }

    #[test]
    fn test_request_direction_and_count() {
        let profile = ConnectionProfile::serial("/dev/ttyACM0", 115200);
        let request = TransferRequest::download(profile, vec!["main.py".into()]);
        assert_eq!(request.direction(), TransferDirection::Download);
        assert_eq!(request.file_count(), 1);
    }
}
