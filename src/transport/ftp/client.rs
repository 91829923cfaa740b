//! Stateful FTP control connection

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use super::protocol::{FtpReply, format_command, parse_pasv, read_reply};
use crate::errors::FtpError;
use crate::transport::{BoxedStream, TcpConnector};

/// One logged-in (or logging-in) FTP session
pub struct FtpClient {
    control: BufReader<BoxedStream>,
    connector: Arc<dyn TcpConnector>,
    host: String,
    timeout: Duration,
}

impl FtpClient {
    /// Open the control connection and wait for the greeting
    pub async fn connect(
        connector: Arc<dyn TcpConnector>,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, FtpError> {
        let stream = tokio::time::timeout(timeout, connector.connect(host, port))
            .await
            .map_err(|_| FtpError::Timeout(timeout))??;

        let mut client = Self {
            control: BufReader::new(stream),
            connector,
            host: host.to_string(),
            timeout,
        };

        let mut greeting = client.read_reply().await?;
        // 120: service ready in nnn minutes, a 220 follows
        while greeting.code == 120 {
            greeting = client.read_reply().await?;
        }
        Self::expect("greeting", &greeting, &[220])?;

        log::debug!("FTP {}:{} greeted with {}", host, port, greeting);
        Ok(client)
    }

    /// USER/PASS authentication
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), FtpError> {
        let reply = self.command("USER", Some(username)).await?;
        if reply.code == 230 {
            return Ok(());
        }
        Self::expect("USER", &reply, &[331])?;

        let reply = self.command("PASS", Some(password)).await?;
        Self::expect("PASS", &reply, &[230, 202])?;
        Ok(())
    }

    /// Switch to image (binary) transfer type
    pub async fn binary(&mut self) -> Result<(), FtpError> {
        let reply = self.command("TYPE", Some("I")).await?;
        Self::expect("TYPE I", &reply, &[200])
    }

    /// Upload `data` as `name`
    pub async fn store(&mut self, name: &str, data: &[u8]) -> Result<(), FtpError> {
        let mut channel = self.open_data_channel().await?;

        let reply = self.command("STOR", Some(name)).await?;
        Self::expect("STOR", &reply, &[125, 150])?;

        tokio::time::timeout(self.timeout, async {
            channel.write_all(data).await?;
            channel.shutdown().await
        })
        .await
        .map_err(|_| FtpError::Timeout(self.timeout))??;
        drop(channel);

        let done = self.read_reply().await?;
        Self::expect("STOR", &done, &[226, 250])
    }

    /// Download `name` into memory
    pub async fn retrieve(&mut self, name: &str) -> Result<Vec<u8>, FtpError> {
        let mut channel = self.open_data_channel().await?;

        let reply = self.command("RETR", Some(name)).await?;
        Self::expect("RETR", &reply, &[125, 150])?;

        let mut data = Vec::new();
        tokio::time::timeout(self.timeout, channel.read_to_end(&mut data))
            .await
            .map_err(|_| FtpError::Timeout(self.timeout))??;
        drop(channel);

        let done = self.read_reply().await?;
        Self::expect("RETR", &done, &[226, 250])?;
        Ok(data)
    }

    /// Say goodbye and close the control connection
    pub async fn quit(mut self) -> Result<(), FtpError> {
        let reply = self.command("QUIT", None).await?;
        if !reply.is_completion() {
            return Err(FtpError::UnexpectedReply {
                command: "QUIT".to_string(),
                code: reply.code,
                text: reply.text,
            });
        }
        let _ = self.control.get_mut().shutdown().await;
        Ok(())
    }

    /// Enter passive mode and connect the data channel
    async fn open_data_channel(&mut self) -> Result<BoxedStream, FtpError> {
        let reply = self.command("PASV", None).await?;
        Self::expect("PASV", &reply, &[227])?;

        let (mut host, port) = parse_pasv(&reply.text)?;
        if host == "0.0.0.0" {
            host = self.host.clone();
        }

        let channel = tokio::time::timeout(self.timeout, self.connector.connect(&host, port))
            .await
            .map_err(|_| FtpError::Timeout(self.timeout))??;
        Ok(channel)
    }

    async fn command(&mut self, verb: &str, arg: Option<&str>) -> Result<FtpReply, FtpError> {
        let line = format_command(verb, arg)?;
        if verb == "PASS" {
            log::trace!("FTP > PASS ****");
        } else {
            log::trace!("FTP > {}", line.trim_end());
        }

        let stream = self.control.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;

        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<FtpReply, FtpError> {
        let reply = tokio::time::timeout(self.timeout, read_reply(&mut self.control))
            .await
            .map_err(|_| FtpError::Timeout(self.timeout))??;
        log::trace!("FTP < {}", reply);
        Ok(reply)
    }

    fn expect(command: &str, reply: &FtpReply, codes: &[u16]) -> Result<(), FtpError> {
        if codes.contains(&reply.code) {
            Ok(())
        } else {
            Err(FtpError::UnexpectedReply {
                command: command.to_string(),
                code: reply.code,
                text: reply.text.clone(),
            })
        }
    }
}
