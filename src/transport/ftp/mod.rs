//! Minimal FTP client (RFC 959 subset)
//!
//! Only what board transfers need: login, binary type, passive mode,
//! `STOR`, `RETR` and `QUIT`.
//!
//! - `protocol`: reply parsing and passive-address decoding
//! - `client`: stateful control connection

pub mod client;
pub mod protocol;

pub use client::FtpClient;
pub use protocol::FtpReply;
