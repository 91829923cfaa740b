//! TCP connections for the FTP client

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;

use super::{BoxedStream, TcpConnector};

/// Opens real TCP connections with a connect timeout
#[derive(Debug, Clone)]
pub struct SystemTcpConnector {
    connect_timeout: Duration,
}

impl SystemTcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for SystemTcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl TcpConnector for SystemTcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("Connection to {}:{} timed out", host, port),
                )
            })??;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
