//! Simulated MicroPython board for transfer tests
//!
//! The board speaks just enough raw REPL to run the programs boardxfer
//! generates: it unescapes uploaded file bodies into an in-memory filesystem
//! and prints stored files between sentinel lines. Every byte chunk the
//! driver writes is recorded so tests can check the exact wire sequence.

#![allow(dead_code)]

use async_trait::async_trait;
use boardxfer::transport::{BoxedStream, SerialConnector, TcpConnector};
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

use boardxfer::config::{SerialTimings, ServerConfig};

/// Timings short enough for tests but long enough for the board task to answer
pub fn fast_timings() -> SerialTimings {
    SerialTimings {
        raw_repl_settle_ms: 5,
        upload_settle_ms: 5,
        read_timeout_ms: 1_000,
        response_deadline_ms: 3_000,
        drain_ms: 5,
        probe_wait_ms: 5,
        ..SerialTimings::default()
    }
}

/// Server config pointing archives at `archive_dir` and without a project file
pub fn test_config(archive_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        archive_dir: Some(archive_dir.to_path_buf()),
        board_config: None,
        serial: fast_timings(),
        ..ServerConfig::default()
    }
}

/// How the board reacts to programs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BoardBehavior {
    #[default]
    Normal,
    /// Every file write raises `OSError: [Errno 28] ENOSPC`
    FilesystemFull,
    /// Programs are accepted but never answered
    Unresponsive,
}

/// In-memory board state shared with the test
#[derive(Debug, Clone, Default)]
pub struct MockBoard {
    files: Arc<Mutex<HashMap<String, String>>>,
    behavior: BoardBehavior,
}

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: BoardBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn with_file(self, name: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        self
    }

    pub fn file(&self, name: &str) -> Option<String> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Run the board on one end of a duplex pipe until the other end closes
    pub async fn serve(self, mut stream: DuplexStream) {
        let mut raw_mode = false;
        let mut program = Vec::new();
        let mut buffer = [0u8; 4096];

        'serve: loop {
            let n = match stream.read(&mut buffer).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };

            for &byte in &buffer[..n] {
                let reply = match byte {
                    0x01 => {
                        raw_mode = true;
                        program.clear();
                        Some("raw REPL; CTRL-B to exit\r\n>".to_string())
                    }
                    0x02 => {
                        raw_mode = false;
                        Some("\r\nMicroPython v1.22.0\r\n>>> ".to_string())
                    }
                    0x04 if raw_mode => {
                        let source = String::from_utf8_lossy(&program).to_string();
                        program.clear();
                        self.execute(&source)
                    }
                    b'\n' if !raw_mode => Some("\r\n>>> ".to_string()),
                    other => {
                        if raw_mode {
                            program.push(other);
                        }
                        None
                    }
                };

                if let Some(reply) = reply {
                    if stream.write_all(reply.as_bytes()).await.is_err() {
                        break 'serve;
                    }
                }
            }
        }
    }

    fn execute(&self, source: &str) -> Option<String> {
        if self.behavior == BoardBehavior::Unresponsive {
            return None;
        }

        if let Some(rest) = source.strip_prefix("with open('") {
            return Some(self.write_file(rest));
        }

        if source.starts_with("try:") {
            return Some(self.read_file(source));
        }

        Some(traceback("SyntaxError: invalid syntax"))
    }

    fn write_file(&self, rest: &str) -> String {
        let Some(name_end) = rest.find("','w')") else {
            return traceback("SyntaxError: invalid syntax");
        };
        let name = &rest[..name_end];

        let Some(body_start) = rest.find("f.write('''") else {
            return traceback("SyntaxError: invalid syntax");
        };
        let body = &rest[body_start + "f.write('''".len()..];
        let Some(body_end) = body.find("'''") else {
            return traceback("SyntaxError: unterminated string");
        };

        if self.behavior == BoardBehavior::FilesystemFull {
            return traceback("OSError: [Errno 28] ENOSPC");
        }

        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), unescape(&body[..body_end]));
        "OK\u{4}\u{4}>".to_string()
    }

    fn read_file(&self, source: &str) -> String {
        let name = source
            .split("open('")
            .nth(1)
            .and_then(|rest| rest.split("','r')").next())
            .unwrap_or_default();

        match self.file(name) {
            Some(content) => format!(
                "OKFILE_START\r\n{}\r\nFILE_END\r\n\u{4}\u{4}>",
                content.replace('\n', "\r\n")
            ),
            None => "OKFILE_ERROR\r\n\u{4}\u{4}>".to_string(),
        }
    }
}

fn traceback(last_line: &str) -> String {
    format!(
        "OK\u{4}Traceback (most recent call last):\r\n  File \"<stdin>\", line 2, in <module>\r\n{}\r\n\u{4}>",
        last_line
    )
}

/// Undo the escaping applied inside `'''...'''`
pub fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Stream wrapper that records every chunk accepted by `poll_write`
pub struct RecordingStream<S> {
    inner: S,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl<S> RecordingStream<S> {
    pub fn new(inner: S, writes: Arc<Mutex<Vec<Vec<u8>>>>) -> Self {
        Self { inner, writes }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for RecordingStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for RecordingStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.writes.lock().unwrap().push(buf[..n].to_vec());
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Serial connector that plugs every opened port into the same mock board
#[derive(Clone, Default)]
pub struct MockSerialConnector {
    board: MockBoard,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    opens: Arc<AtomicUsize>,
    fail_open: bool,
}

impl MockSerialConnector {
    pub fn new(board: MockBoard) -> Self {
        Self {
            board,
            ..Self::default()
        }
    }

    /// A connector whose ports never open
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn board(&self) -> &MockBoard {
        &self.board
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SerialConnector for MockSerialConnector {
    async fn open(&self, port: &str, _baud_rate: u32) -> io::Result<BoxedStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("could not open port {}: No such file or directory", port),
            ));
        }

        let (client, device) = tokio::io::duplex(64 * 1024);
        tokio::spawn(self.board.clone().serve(device));
        Ok(Box::new(RecordingStream::new(client, self.writes.clone())))
    }
}

/// TCP connector that only counts attempts and always refuses
#[derive(Clone, Default)]
pub struct RefusingTcpConnector {
    attempts: Arc<AtomicUsize>,
}

impl RefusingTcpConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TcpConnector for RefusingTcpConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<BoxedStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("connection to {}:{} refused", host, port),
        ))
    }
}

/// Give background board tasks a moment to settle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
