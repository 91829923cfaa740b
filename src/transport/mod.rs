//! Byte-stream transports to the boards
//!
//! Engines never open ports or sockets themselves; they go through the
//! connector traits here so the coordinator can swap in simulated boards.

pub mod ftp;
pub mod serial;
pub mod tcp;

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

pub use serial::{SystemSerialConnector, list_serial_ports};
pub use tcp::SystemTcpConnector;

/// Anything we can read from and write to asynchronously
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

pub type BoxedStream = Box<dyn ByteStream>;

/// Opens serial ports
#[async_trait]
pub trait SerialConnector: Send + Sync {
    async fn open(&self, port: &str, baud_rate: u32) -> io::Result<BoxedStream>;
}

/// Opens TCP connections (FTP control and data channels)
#[async_trait]
pub trait TcpConnector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedStream>;
}
