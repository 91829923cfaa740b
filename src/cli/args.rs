//! Command line argument parsing

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::profile::{
    ConnectionProfile, DEFAULT_FTP_PORT, Endpoint, NetworkEndpoint, SerialEndpoint,
};
use crate::services::BoardRegistry;

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(name = "boardxfer")]
#[command(about = "📟 Move files to and from MicroPython boards over serial or WiFi/FTP")]
pub struct Cli {
    /// Configuration file (defaults to ./boardxfer.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease logging verbosity (only errors)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List serial ports on this host
    Ports,
    /// List registered boards (project file and config)
    Boards,
    /// Check that a board is reachable
    Test {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// Upload local files to a board
    Upload {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Files to upload; each is stored under its base name
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download files from a board into a zip archive
    Download {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Names of the files on the board
        #[arg(required = true)]
        files: Vec<String>,
        /// Where to copy the archive
        #[arg(short, long, default_value = "downloaded_files.zip")]
        output: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// How to reach the board
#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
    /// Serial port of a board running the raw REPL (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, conflicts_with_all = ["host", "board"])]
    pub serial: Option<String>,

    /// Serial baud rate
    #[arg(long, requires = "serial")]
    pub baud: Option<u32>,

    /// Address of a WiFi board running an FTP server
    #[arg(long, conflicts_with = "board")]
    pub host: Option<String>,

    /// FTP user name
    #[arg(long, default_value = "micro")]
    pub user: String,

    /// FTP password
    #[arg(long, default_value = "python")]
    pub password: String,

    /// FTP control port
    #[arg(long, default_value_t = DEFAULT_FTP_PORT)]
    pub ftp_port: u16,

    /// Id of a registered board
    #[arg(long)]
    pub board: Option<String>,
}

impl ConnectionArgs {
    /// Build the profile, falling back to the project board when nothing is given
    pub fn to_profile(
        &self,
        registry: &BoardRegistry,
        default_baud_rate: u32,
    ) -> Result<ConnectionProfile> {
        if let Some(id) = &self.board {
            return match registry.get(id) {
                Some(profile) => Ok(profile.clone()),
                None => bail!("Unknown board '{}' (see `boardxfer boards`)", id),
            };
        }

        if let Some(port) = &self.serial {
            return Ok(ConnectionProfile::new(
                "",
                port.clone(),
                Endpoint::Serial(SerialEndpoint::new(
                    port.clone(),
                    self.baud.unwrap_or(default_baud_rate),
                )),
            ));
        }

        if let Some(host) = &self.host {
            return Ok(ConnectionProfile::new(
                "",
                host.clone(),
                Endpoint::Network(
                    NetworkEndpoint::new(host.clone(), self.user.clone(), self.password.clone())
                        .with_port(self.ftp_port),
                ),
            ));
        }

        match registry.project_board() {
            Some(profile) => Ok(profile.clone()),
            None => bail!("No connection given: use --serial, --host or --board"),
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::ConnectionKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serial_upload_args() {
        let cli = Cli::try_parse_from([
            "boardxfer",
            "upload",
            "--serial",
            "/dev/ttyUSB0",
            "--baud",
            "921600",
            "main.py",
            "boot.py",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload {
                connection, files, ..
            } => {
                assert_eq!(files.len(), 2);
                let profile = connection.to_profile(&BoardRegistry::new(), 115200).unwrap();
                assert_eq!(profile.kind(), ConnectionKind::Serial);
                assert_eq!(profile.describe(), "/dev/ttyUSB0 @ 921600 baud");
            }
            _ => panic!("expected upload command"),
        }
    }

    #[test]
    fn test_serial_and_host_conflict() {
        assert!(
            Cli::try_parse_from([
                "boardxfer",
                "test",
                "--serial",
                "COM3",
                "--host",
                "192.168.4.1"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_missing_connection_without_project_board() {
        let cli = Cli::try_parse_from(["boardxfer", "test"]).unwrap();
        let Commands::Test { connection } = cli.command else {
            panic!("expected test command");
        };
        assert!(connection.to_profile(&BoardRegistry::new(), 115200).is_err());
    }
}
