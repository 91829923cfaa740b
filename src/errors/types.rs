//! Custom error types for board transfers
//!
//! Errors are split by how far they propagate: a [`TransferError`] aborts the
//! whole request, while a [`FileTransferError`] is caught at the per-file
//! boundary and only skips the file it belongs to.

use std::time::Duration;
use thiserror::Error;

/// Request-level failure. Any of these ends the request with `success=false`.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transport could not be opened or authenticated
    #[error("{0}")]
    Connectivity(String),
    /// The profile's `type` is not one we know how to drive
    #[error("Unknown connection type")]
    UnsupportedKind,
    /// Packaging downloaded files failed
    #[error("Archive error: {0}")]
    Archive(String),
    /// Local I/O outside of any single file's transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn connectivity(context: &str, err: impl std::fmt::Display) -> Self {
        TransferError::Connectivity(format!("{}: {}", context, err))
    }
}

/// Failure of a single file within a batch
#[derive(Debug, Error)]
pub enum FileTransferError {
    #[error("invalid file name '{0}'")]
    InvalidName(String),
    #[error("'{0}' was already transferred in this request")]
    DuplicateName(String),
    #[error("content is not valid UTF-8 text")]
    NotText,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("device raised an exception: {0}")]
    RemoteException(String),
    #[error(transparent)]
    Ftp(#[from] FtpError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The device's reply could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The device answered with `FILE_ERROR`
    #[error("device could not read the file")]
    RemoteFileError,
    /// A sentinel line never showed up in the reply
    #[error("response is missing the {0} sentinel")]
    MissingSentinel(&'static str),
    /// The bounded wait for a reply ran out
    #[error("timed out after {0:?} waiting for the device")]
    Timeout(Duration),
    /// The device closed the stream mid-reply
    #[error("serial stream closed by the device")]
    StreamClosed,
}

/// FTP control/data channel failures
#[derive(Debug, Error)]
pub enum FtpError {
    #[error("unexpected reply to {command}: {code} {text}")]
    UnexpectedReply {
        command: String,
        code: u16,
        text: String,
    },
    #[error("malformed reply line: {0}")]
    MalformedReply(String),
    #[error("could not parse passive mode reply: {0}")]
    BadPassiveReply(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed by server")]
    ConnectionClosed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for request-level operations
pub type Result<T> = std::result::Result<T, TransferError>;
