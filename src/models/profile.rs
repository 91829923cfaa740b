//! Board connection profiles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default serial speed used by MicroPython boards
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default FTP control port
pub const DEFAULT_FTP_PORT: u16 = 21;

/// One board the operator can talk to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionProfile {
    /// Registry identifier (empty for ad-hoc profiles sent by a client)
    #[serde(default)]
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Kind-specific connection parameters, tagged by `type`
    #[serde(flatten)]
    pub endpoint: Endpoint,
}

/// Transport parameters. The `type` tag fully determines which fields apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Endpoint {
    /// FTP over the network ("wifi" boards)
    #[serde(alias = "wifi")]
    Network(NetworkEndpoint),
    /// Raw REPL over a serial port
    Serial(SerialEndpoint),
    /// Any `type` we do not recognise
    #[serde(other)]
    Unsupported,
}

/// FTP endpoint of a networked board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkEndpoint {
    /// Host name or IP address
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// FTP control port
    #[serde(default = "default_ftp_port")]
    pub ftp_port: u16,
}

/// Serial endpoint of a USB/UART board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialEndpoint {
    /// Port identifier, e.g. `/dev/ttyUSB0` or `COM3`
    #[serde(default)]
    pub port: String,
    /// Baud rate; browsers send `null` when the field is left empty
    #[serde(default, alias = "baud_rate")]
    pub baudrate: Option<u32>,
}

fn default_ftp_port() -> u16 {
    DEFAULT_FTP_PORT
}

/// Connection kind, derived from the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Network,
    Serial,
    Unsupported,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Network => write!(f, "network"),
            ConnectionKind::Serial => write!(f, "serial"),
            ConnectionKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

impl SerialEndpoint {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate: Some(baud_rate),
        }
    }

    pub fn baud_rate(&self) -> u32 {
        self.baudrate.unwrap_or(DEFAULT_BAUD_RATE)
    }
}

impl NetworkEndpoint {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            ftp_port: DEFAULT_FTP_PORT,
        }
    }

    pub fn with_port(mut self, ftp_port: u16) -> Self {
        self.ftp_port = ftp_port;
        self
    }
}

impl ConnectionProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint,
        }
    }

    /// Ad-hoc serial profile
    pub fn serial(port: impl Into<String>, baud_rate: u32) -> Self {
        Self::new("", "", Endpoint::Serial(SerialEndpoint::new(port, baud_rate)))
    }

    /// Ad-hoc network profile
    pub fn network(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(
            "",
            "",
            Endpoint::Network(NetworkEndpoint::new(address, username, password)),
        )
    }

    pub fn kind(&self) -> ConnectionKind {
        match self.endpoint {
            Endpoint::Network(_) => ConnectionKind::Network,
            Endpoint::Serial(_) => ConnectionKind::Serial,
            Endpoint::Unsupported => ConnectionKind::Unsupported,
        }
    }

    /// Identity of the physical link, used to serialize access to it
    pub fn lock_key(&self) -> Option<String> {
        match &self.endpoint {
            Endpoint::Network(net) => Some(format!("ftp://{}:{}", net.address, net.ftp_port)),
            Endpoint::Serial(serial) => Some(format!("serial://{}", serial.port)),
            Endpoint::Unsupported => None,
        }
    }

    /// Short description for log lines, never includes credentials
    pub fn describe(&self) -> String {
        match &self.endpoint {
            Endpoint::Network(net) => format!("{}:{}", net.address, net.ftp_port),
            Endpoint::Serial(serial) => format!("{} @ {} baud", serial.port, serial.baud_rate()),
            Endpoint::Unsupported => "unsupported connection".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wifi_profile_from_browser() {
        let profile: ConnectionProfile = serde_json::from_value(json!({
            "type": "wifi",
            "address": "192.168.4.1",
            "username": "micro",
            "password": "python"
        }))
        .unwrap();

        assert_eq!(profile.kind(), ConnectionKind::Network);
        match profile.endpoint {
            Endpoint::Network(net) => {
                assert_eq!(net.address, "192.168.4.1");
                assert_eq!(net.ftp_port, DEFAULT_FTP_PORT);
            }
            other => panic!("expected network endpoint, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_serial_profile_with_null_baudrate() {
        let profile: ConnectionProfile = serde_json::from_value(json!({
            "type": "serial",
            "port": "/dev/ttyUSB0",
            "baudrate": null
        }))
        .unwrap();

        match &profile.endpoint {
            Endpoint::Serial(serial) => assert_eq!(serial.baud_rate(), DEFAULT_BAUD_RATE),
            other => panic!("expected serial endpoint, got {:?}", other),
        }
        assert_eq!(profile.lock_key().as_deref(), Some("serial:///dev/ttyUSB0"));
    }

    #[test]
    fn test_unknown_type_is_unsupported_not_an_error() {
        let profile: ConnectionProfile = serde_json::from_value(json!({
            "type": "bluetooth",
            "mac": "00:11:22:33:44:55"
        }))
        .unwrap();

        assert_eq!(profile.kind(), ConnectionKind::Unsupported);
        assert!(profile.lock_key().is_none());
    }

    #[test]
    fn test_describe_hides_credentials() {
        let profile = ConnectionProfile::network("10.0.0.2", "micro", "secret");
        assert!(!profile.describe().contains("secret"));
    }
}
