//! File transfer to networked boards over FTP
//!
//! One control connection per request: connect, log in, switch to binary,
//! move each file through its own passive data channel, then quit.

use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::archive::ArchiveEntry;
use super::serial_repl::{already_seen, display_name};
use crate::errors::{FileTransferError, TransferError};
use crate::models::profile::NetworkEndpoint;
use crate::models::transfer::{BatchReport, UploadFile};
use crate::security::FilenameValidator;
use crate::transport::TcpConnector;
use crate::transport::ftp::FtpClient;

pub struct NetworkTransferEngine {
    connector: Arc<dyn TcpConnector>,
    timeout: Duration,
}

impl NetworkTransferEngine {
    pub fn new(connector: Arc<dyn TcpConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    /// Connect and authenticate; any failure here aborts the request
    pub async fn open(&self, endpoint: &NetworkEndpoint) -> Result<FtpClient, TransferError> {
        let mut client = FtpClient::connect(
            self.connector.clone(),
            &endpoint.address,
            endpoint.ftp_port,
            self.timeout,
        )
        .await
        .map_err(|e| {
            TransferError::connectivity(
                &format!("FTP connection to {} failed", endpoint.address),
                e,
            )
        })?;

        client
            .login(&endpoint.username, &endpoint.password)
            .await
            .map_err(|e| TransferError::connectivity("FTP login failed", e))?;

        Ok(client)
    }

    pub async fn upload(
        &self,
        endpoint: &NetworkEndpoint,
        files: &[UploadFile],
    ) -> Result<BatchReport, TransferError> {
        let mut client = self.open(endpoint).await?;
        client
            .binary()
            .await
            .map_err(|e| TransferError::connectivity("FTP binary mode failed", e))?;

        let mut report = BatchReport::new();
        for (index, file) in files.iter().enumerate() {
            info!(
                "📤 [{}/{}] {} → {}",
                index + 1,
                files.len(),
                file.name,
                endpoint.address
            );
            match Self::store_one(&mut client, file).await {
                Ok(stored_as) => report.record_success(stored_as),
                Err(e) => report.record_failure(display_name(&file.name), e),
            }
        }

        Self::finish(client).await;
        Ok(report)
    }

    pub async fn download(
        &self,
        endpoint: &NetworkEndpoint,
        names: &[String],
    ) -> Result<(BatchReport, Vec<ArchiveEntry>), TransferError> {
        let mut client = self.open(endpoint).await?;
        client
            .binary()
            .await
            .map_err(|e| TransferError::connectivity("FTP binary mode failed", e))?;

        let mut report = BatchReport::new();
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        for (index, name) in names.iter().enumerate() {
            if let Some(duplicate) = already_seen(&seen, name) {
                report.record_failure(
                    duplicate.clone(),
                    FileTransferError::DuplicateName(duplicate),
                );
                continue;
            }
            info!(
                "📥 [{}/{}] {} ← {}",
                index + 1,
                names.len(),
                name,
                endpoint.address
            );
            match Self::retrieve_one(&mut client, name).await {
                Ok(entry) => {
                    seen.insert(entry.name.clone());
                    report.record_success(entry.name.clone());
                    entries.push(entry);
                }
                Err(e) => report.record_failure(display_name(name), e),
            }
        }

        Self::finish(client).await;
        Ok((report, entries))
    }

    async fn store_one(
        client: &mut FtpClient,
        file: &UploadFile,
    ) -> Result<String, FileTransferError> {
        let filename = FilenameValidator::sanitize(&file.name)
            .ok_or_else(|| FileTransferError::InvalidName(file.name.clone()))?;
        client.store(&filename, &file.content).await?;
        Ok(filename)
    }

    async fn retrieve_one(
        client: &mut FtpClient,
        name: &str,
    ) -> Result<ArchiveEntry, FileTransferError> {
        let filename = FilenameValidator::sanitize(name)
            .ok_or_else(|| FileTransferError::InvalidName(name.to_string()))?;
        let data = client.retrieve(&filename).await?;
        Ok(ArchiveEntry::new(filename, data))
    }

    async fn finish(client: FtpClient) {
        if let Err(e) = client.quit().await {
            warn!("FTP QUIT failed: {}", e);
        }
    }
}
