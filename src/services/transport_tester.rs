//! Connectivity probes run before any transfer

use log::{debug, info};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::ServerConfig;
use crate::models::profile::{ConnectionProfile, Endpoint, NetworkEndpoint, SerialEndpoint};
use crate::models::responses::ConnectionTestResult;
use crate::transport::ftp::FtpClient;
use crate::transport::{SerialConnector, TcpConnector};

pub struct TransportTester {
    serial: Arc<dyn SerialConnector>,
    tcp: Arc<dyn TcpConnector>,
    config: ServerConfig,
}

impl TransportTester {
    pub fn new(
        serial: Arc<dyn SerialConnector>,
        tcp: Arc<dyn TcpConnector>,
        config: ServerConfig,
    ) -> Self {
        Self { serial, tcp, config }
    }

    /// Probe the board. Every failure is reported in the result, never raised.
    pub async fn test(&self, profile: &ConnectionProfile) -> ConnectionTestResult {
        let result = match &profile.endpoint {
            Endpoint::Network(net) => self.probe_network(net).await,
            Endpoint::Serial(serial) => self.probe_serial(serial).await,
            Endpoint::Unsupported => Err("Unknown connection type".to_string()),
        };

        match result {
            Ok(message) => {
                info!("✅ {}: {}", profile.describe(), message);
                ConnectionTestResult::ok(message)
            }
            Err(message) => {
                info!("❌ {}: {}", profile.describe(), message);
                ConnectionTestResult::failed(message)
            }
        }
    }

    async fn probe_network(&self, endpoint: &NetworkEndpoint) -> Result<String, String> {
        let timeout = self.config.network.probe_timeout();

        let mut client = FtpClient::connect(
            self.tcp.clone(),
            &endpoint.address,
            endpoint.ftp_port,
            timeout,
        )
        .await
        .map_err(|e| format!("Connection failed: {}", e))?;

        client
            .login(&endpoint.username, &endpoint.password)
            .await
            .map_err(|e| format!("Login failed: {}", e))?;

        if let Err(e) = client.quit().await {
            debug!("FTP QUIT after probe failed: {}", e);
        }
        Ok("Connection successful".to_string())
    }

    async fn probe_serial(&self, endpoint: &SerialEndpoint) -> Result<String, String> {
        let timings = &self.config.serial;
        let baud_rate = endpoint.baudrate.unwrap_or(timings.default_baud_rate);

        let mut stream = self
            .serial
            .open(&endpoint.port, baud_rate)
            .await
            .map_err(|e| format!("Serial connection failed: {}", e))?;

        let probe = async {
            stream.write_all(b"\r\n").await?;
            stream.flush().await?;
            tokio::time::sleep(timings.probe_wait()).await;

            // Whatever the board echoes is informational only
            let mut buffer = [0u8; 256];
            match tokio::time::timeout(timings.drain(), stream.read(&mut buffer)).await {
                Ok(Ok(n)) if n > 0 => debug!(
                    "{} answered: {:?}",
                    endpoint.port,
                    String::from_utf8_lossy(&buffer[..n])
                ),
                _ => debug!("{} stayed silent", endpoint.port),
            }
            Ok::<(), std::io::Error>(())
        };
        let outcome = probe.await;
        let _ = stream.shutdown().await;

        outcome.map_err(|e| format!("Serial connection failed: {}", e))?;
        Ok("Serial connection successful".to_string())
    }
}
