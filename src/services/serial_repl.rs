//! Serial raw-REPL file transfer
//!
//! Drives a remote interpreter through its raw REPL as a makeshift RPC
//! channel. Each file is one program: enter raw mode (Ctrl-A), submit the
//! generated source, execute (Ctrl-D). Uploads embed the file body in the
//! program; downloads read the body back between sentinel lines.

use log::{debug, info, trace};
use std::collections::HashSet;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::archive::ArchiveEntry;
use super::repl_protocol::{
    self, ENTER_RAW_REPL, EXECUTE, RAW_REPL_PROMPT, download_reply_complete,
    parse_download_response, parse_execution_frame, summarize_traceback,
};
use crate::config::SerialTimings;
use crate::errors::{FileTransferError, ProtocolError};
use crate::models::transfer::{BatchReport, UploadFile};
use crate::security::FilenameValidator;

/// Interpreter mode as far as this session knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplMode {
    /// Friendly interactive prompt (state after opening the port)
    Terminal,
    /// Raw execution mode entered with Ctrl-A
    RawRepl,
}

/// One open serial handle for the duration of a request
pub struct SerialSession<S> {
    stream: S,
    port: String,
    mode: ReplMode,
    timings: SerialTimings,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SerialSession<S> {
    pub fn new(stream: S, port: impl Into<String>, timings: SerialTimings) -> Self {
        Self {
            stream,
            port: port.into(),
            mode: ReplMode::Terminal,
            timings,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Send Ctrl-A and let the interpreter switch modes.
    ///
    /// There is no acknowledgment byte, so this waits the settle delay. With
    /// `await_prompt` the wait ends early once the `>` prompt shows up.
    pub async fn enter_raw_repl(&mut self) -> std::io::Result<()> {
        if self.mode == ReplMode::RawRepl {
            trace!("{}: re-entering raw REPL", self.port);
        }

        self.stream.write_all(&[ENTER_RAW_REPL]).await?;
        self.stream.flush().await?;

        let settle = self.timings.raw_repl_settle();
        if self.timings.await_prompt {
            self.wait_for_prompt(settle).await?;
        } else {
            tokio::time::sleep(settle).await;
        }

        self.mode = ReplMode::RawRepl;
        Ok(())
    }

    /// Discard stale input, then submit `program` followed by Ctrl-D
    pub async fn execute(&mut self, program: &str) -> std::io::Result<()> {
        self.drain_input().await?;

        self.stream.write_all(program.as_bytes()).await?;
        self.stream.write_all(&[EXECUTE]).await?;
        self.stream.flush().await
    }

    /// Accumulate the reply until `done` says it is complete.
    ///
    /// Every raw-REPL reply ends with a Ctrl-D terminator, so `done` is only
    /// consulted after a chunk carrying one arrives. Every read is bounded by
    /// the per-read timeout and the whole wait by the response deadline.
    pub async fn read_until<F>(&mut self, done: F) -> Result<String, FileTransferError>
    where
        F: Fn(&str) -> bool,
    {
        let read_timeout = self.timings.read_timeout();
        let deadline_span = self.timings.response_deadline();
        let deadline = Instant::now() + deadline_span;

        let mut received = Vec::new();
        let mut chunk = [0u8; 512];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ProtocolError::Timeout(deadline_span).into());
            }
            let (wait, limit) = if remaining < read_timeout {
                (remaining, deadline_span)
            } else {
                (read_timeout, read_timeout)
            };

            match tokio::time::timeout(wait, self.stream.read(&mut chunk)).await {
                Err(_) => return Err(ProtocolError::Timeout(limit).into()),
                Ok(Ok(0)) => return Err(ProtocolError::StreamClosed.into()),
                Ok(Ok(n)) => {
                    trace!("{}: received {} bytes", self.port, n);
                    received.extend_from_slice(&chunk[..n]);
                    if chunk[..n].contains(&EXECUTE) {
                        let text = String::from_utf8_lossy(&received);
                        if done(&text) {
                            return Ok(text.into_owned());
                        }
                    }
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(ProtocolError::Timeout(read_timeout).into());
                }
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Close the handle; the session is consumed either way
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("{}: error while closing serial port: {}", self.port, e);
        }
        debug!("🔌 Closed serial port {}", self.port);
    }

    async fn wait_for_prompt(&mut self, limit: Duration) -> std::io::Result<()> {
        let deadline = Instant::now() + limit;
        let mut chunk = [0u8; 256];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            match tokio::time::timeout(remaining, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => return Ok(()),
                Ok(Ok(n)) if chunk[..n].contains(&RAW_REPL_PROMPT) => return Ok(()),
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    async fn drain_input(&mut self) -> std::io::Result<()> {
        let quiet = self.timings.drain();
        let give_up = Instant::now() + self.timings.read_timeout();
        let mut chunk = [0u8; 512];
        let mut discarded = 0usize;

        while Instant::now() < give_up {
            match tokio::time::timeout(quiet, self.stream.read(&mut chunk)).await {
                Ok(Ok(n)) if n > 0 => discarded += n,
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::TimedOut => return Err(e),
                _ => break,
            }
        }

        if discarded > 0 {
            trace!("{}: discarded {} stale bytes", self.port, discarded);
        }
        Ok(())
    }
}

/// Uploads and downloads files through a [`SerialSession`]
#[derive(Debug, Clone)]
pub struct SerialReplDriver {
    timings: SerialTimings,
}

impl SerialReplDriver {
    pub fn new(timings: SerialTimings) -> Self {
        Self { timings }
    }

    pub fn timings(&self) -> &SerialTimings {
        &self.timings
    }

    /// Write one file to the board. Returns the sanitized name it was stored under.
    pub async fn upload_file<S>(
        &self,
        session: &mut SerialSession<S>,
        name: &str,
        content: &[u8],
    ) -> Result<String, FileTransferError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let filename = FilenameValidator::sanitize(name)
            .ok_or_else(|| FileTransferError::InvalidName(name.to_string()))?;
        let text = std::str::from_utf8(content).map_err(|_| FileTransferError::NotText)?;

        let program = repl_protocol::upload_command(&filename, text);

        session.enter_raw_repl().await?;
        session.execute(&program).await?;

        if self.timings.confirm_writes {
            let reply = session
                .read_until(|text| parse_execution_frame(text).is_some())
                .await?;
            let stderr = parse_execution_frame(&reply)
                .map(|frame| frame.stderr)
                .unwrap_or_default();
            if !stderr.trim().is_empty() {
                return Err(FileTransferError::RemoteException(summarize_traceback(
                    &stderr,
                )));
            }
        } else {
            tokio::time::sleep(self.timings.upload_settle()).await;
        }

        debug!(
            "📤 {}: wrote {} ({} bytes)",
            session.port(),
            filename,
            content.len()
        );
        Ok(filename)
    }

    /// Read one file from the board
    pub async fn download_file<S>(
        &self,
        session: &mut SerialSession<S>,
        name: &str,
    ) -> Result<ArchiveEntry, FileTransferError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let filename = FilenameValidator::sanitize(name)
            .ok_or_else(|| FileTransferError::InvalidName(name.to_string()))?;

        session.enter_raw_repl().await?;
        session
            .execute(&repl_protocol::download_command(&filename))
            .await?;

        let reply = session.read_until(download_reply_complete).await?;
        let content = parse_download_response(&reply)?;

        debug!(
            "📥 {}: read {} ({} bytes)",
            session.port(),
            filename,
            content.len()
        );
        Ok(ArchiveEntry::new(filename, content.into_bytes()))
    }

    /// Upload every file in order; failures skip only the failing file
    pub async fn upload_all<S>(
        &self,
        session: &mut SerialSession<S>,
        files: &[UploadFile],
    ) -> BatchReport
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut report = BatchReport::new();
        for (index, file) in files.iter().enumerate() {
            info!(
                "📤 [{}/{}] {} → {}",
                index + 1,
                files.len(),
                file.name,
                session.port()
            );
            match self.upload_file(session, &file.name, &file.content).await {
                Ok(stored_as) => report.record_success(stored_as),
                Err(e) => report.record_failure(display_name(&file.name), e),
            }
        }
        report
    }

    /// Download every named file in order; failures skip only the failing file.
    ///
    /// Archive entries are keyed by sanitized name, so a second request that
    /// sanitizes to an already downloaded name is recorded as a failure.
    pub async fn download_all<S>(
        &self,
        session: &mut SerialSession<S>,
        names: &[String],
    ) -> (BatchReport, Vec<ArchiveEntry>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
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
                session.port()
            );
            match self.download_file(session, name).await {
                Ok(entry) => {
                    seen.insert(entry.name.clone());
                    report.record_success(entry.name.clone());
                    entries.push(entry);
                }
                Err(e) => report.record_failure(display_name(name), e),
            }
        }
        (report, entries)
    }
}

/// Sanitized form of `raw` when a file under that name was already collected
pub(crate) fn already_seen(seen: &HashSet<String>, raw: &str) -> Option<String> {
    FilenameValidator::sanitize(raw).filter(|name| seen.contains(name))
}

/// Name to report for a failed file: sanitized if possible, raw otherwise
pub(crate) fn display_name(raw: &str) -> String {
    FilenameValidator::sanitize(raw).unwrap_or_else(|| raw.to_string())
}
