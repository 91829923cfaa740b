//! Request dispatch by connection kind
//!
//! The coordinator owns everything a transfer needs: configuration, the
//! transport connectors, the per-link locks and the archive store. Callers
//! always get a structured result back, whatever goes wrong underneath.

use futures_util::FutureExt;
use log::{error, info};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::archive::{ArchiveEntry, ArchiveStore};
use super::network_transfer::NetworkTransferEngine;
use super::port_locks::PortLocks;
use super::serial_repl::{SerialReplDriver, SerialSession};
use super::transport_tester::TransportTester;
use crate::config::ServerConfig;
use crate::errors::TransferError;
use crate::models::profile::{ConnectionProfile, Endpoint, SerialEndpoint};
use crate::models::responses::{ConnectionTestResult, TransferResult};
use crate::models::transfer::{
    BatchReport, TransferDirection, TransferPayload, TransferRequest, UploadFile,
};
use crate::transport::{
    BoxedStream, SerialConnector, SystemSerialConnector, SystemTcpConnector, TcpConnector,
};

/// Connectors used to reach the boards
#[derive(Clone)]
pub struct Transports {
    pub serial: Arc<dyn SerialConnector>,
    pub tcp: Arc<dyn TcpConnector>,
}

impl Transports {
    /// Real serial ports and sockets
    pub fn system(config: &ServerConfig) -> Self {
        Self {
            serial: Arc::new(SystemSerialConnector),
            tcp: Arc::new(SystemTcpConnector::new(config.network.transfer_timeout())),
        }
    }
}

pub struct TransferCoordinator {
    config: ServerConfig,
    transports: Transports,
    locks: PortLocks,
    archives: ArchiveStore,
    serial_driver: SerialReplDriver,
    network: NetworkTransferEngine,
    tester: TransportTester,
}

impl TransferCoordinator {
    pub fn new(config: ServerConfig, transports: Transports) -> Self {
        let archives = ArchiveStore::new(config.resolved_archive_dir(), config.archive_ttl());
        let serial_driver = SerialReplDriver::new(config.serial.clone());
        let network =
            NetworkTransferEngine::new(transports.tcp.clone(), config.network.transfer_timeout());
        let tester = TransportTester::new(
            transports.serial.clone(),
            transports.tcp.clone(),
            config.clone(),
        );

        Self {
            config,
            transports,
            locks: PortLocks::new(),
            archives,
            serial_driver,
            network,
            tester,
        }
    }

    pub fn with_system_transports(config: ServerConfig) -> Self {
        let transports = Transports::system(&config);
        Self::new(config, transports)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn archives(&self) -> &ArchiveStore {
        &self.archives
    }

    pub fn locks(&self) -> &PortLocks {
        &self.locks
    }

    /// Probe a board while holding its link lock
    pub async fn test_connection(&self, profile: &ConnectionProfile) -> ConnectionTestResult {
        let Some(key) = profile.lock_key() else {
            return ConnectionTestResult::failed(TransferError::UnsupportedKind.to_string());
        };

        let probe = async {
            let _guard = self.locks.acquire(&key).await;
            self.tester.test(profile).await
        };

        match AssertUnwindSafe(probe).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("💥 Connection test panicked: {}", reason);
                ConnectionTestResult::failed(format!("Internal error: {}", reason))
            }
        }
    }

    pub async fn upload(&self, profile: ConnectionProfile, files: Vec<UploadFile>) -> TransferResult {
        self.execute(TransferRequest::upload(profile, files)).await
    }

    pub async fn download(&self, profile: ConnectionProfile, names: Vec<String>) -> TransferResult {
        self.execute(TransferRequest::download(profile, names)).await
    }

    /// Run one request to completion. Never fails and never panics outward.
    pub async fn execute(&self, request: TransferRequest) -> TransferResult {
        let direction = request.direction();
        info!(
            "🚚 {} of {} files with {}",
            direction,
            request.file_count(),
            request.profile.describe()
        );

        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(Ok(result)) => {
                info!("✅ {}", result.message);
                result
            }
            Ok(Err(e)) => {
                error!("❌ {} failed: {}", direction, e);
                TransferResult::failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("💥 {} panicked: {}", direction, reason);
                TransferResult::failure(format!("Internal error: {}", reason))
            }
        }
    }

    async fn dispatch(&self, request: TransferRequest) -> Result<TransferResult, TransferError> {
        let TransferRequest { profile, payload } = request;
        let key = profile.lock_key().ok_or(TransferError::UnsupportedKind)?;
        let _guard = self.locks.acquire(&key).await;

        match (&profile.endpoint, payload) {
            (Endpoint::Serial(serial), TransferPayload::Upload(files)) => {
                let report = self
                    .with_serial_session(serial, TransferDirection::Upload, |driver, session| {
                        Box::pin(async move { driver.upload_all(session, &files).await })
                    })
                    .await?;
                Ok(TransferResult::from_batch(
                    TransferDirection::Upload,
                    " via serial",
                    &report,
                ))
            }
            (Endpoint::Serial(serial), TransferPayload::Download(names)) => {
                let (report, entries) = self
                    .with_serial_session(serial, TransferDirection::Download, |driver, session| {
                        Box::pin(async move { driver.download_all(session, &names).await })
                    })
                    .await?;
                self.package(" via serial", &report, entries).await
            }
            (Endpoint::Network(net), TransferPayload::Upload(files)) => {
                let report = self
                    .network
                    .upload(net, &files)
                    .await
                    .map_err(|e| label_connectivity("FTP", TransferDirection::Upload, e))?;
                Ok(TransferResult::from_batch(
                    TransferDirection::Upload,
                    "",
                    &report,
                ))
            }
            (Endpoint::Network(net), TransferPayload::Download(names)) => {
                let (report, entries) = self
                    .network
                    .download(net, &names)
                    .await
                    .map_err(|e| label_connectivity("FTP", TransferDirection::Download, e))?;
                self.package("", &report, entries).await
            }
            (Endpoint::Unsupported, _) => Err(TransferError::UnsupportedKind),
        }
    }

    /// Open the port, run `work` against a fresh session, and always close it
    async fn with_serial_session<T, F>(
        &self,
        endpoint: &SerialEndpoint,
        direction: TransferDirection,
        work: F,
    ) -> Result<T, TransferError>
    where
        F: for<'a> FnOnce(
            &'a SerialReplDriver,
            &'a mut SerialSession<BoxedStream>,
        ) -> futures_util::future::BoxFuture<'a, T>,
    {
        let baud_rate = endpoint
            .baudrate
            .unwrap_or(self.config.serial.default_baud_rate);

        let stream = self
            .transports
            .serial
            .open(&endpoint.port, baud_rate)
            .await
            .map_err(|e| {
                TransferError::connectivity(&format!("Serial {} failed", direction), e)
            })?;

        let mut session = SerialSession::new(stream, endpoint.port.clone(), self.config.serial.clone());
        let outcome = AssertUnwindSafe(work(&self.serial_driver, &mut session))
            .catch_unwind()
            .await;
        session.close().await;

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn package(
        &self,
        via: &str,
        report: &BatchReport,
        entries: Vec<ArchiveEntry>,
    ) -> Result<TransferResult, TransferError> {
        let archive = self.archives.create(entries).await?;
        Ok(
            TransferResult::from_batch(TransferDirection::Download, via, report)
                .with_archive(archive.id, archive.path),
        )
    }
}

fn label_connectivity(link: &str, direction: TransferDirection, err: TransferError) -> TransferError {
    match err {
        TransferError::Connectivity(message) => {
            TransferError::Connectivity(format!("{} {} failed: {}", link, direction, message))
        }
        other => other,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
