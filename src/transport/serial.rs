//! Serial port access via tokio-serial

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio_serial::SerialStream;

use super::{BoxedStream, SerialConnector};
use crate::models::responses::SerialPortEntry;

/// Opens real serial ports
#[derive(Debug, Clone, Default)]
pub struct SystemSerialConnector;

#[async_trait]
impl SerialConnector for SystemSerialConnector {
    async fn open(&self, port: &str, baud_rate: u32) -> io::Result<BoxedStream> {
        let builder = tokio_serial::new(port, baud_rate).timeout(Duration::from_secs(1));

        let serial = SerialStream::open(&builder).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("Failed to open serial port {}: {}", port, e),
            )
        })?;

        log::debug!("🔌 Opened serial port {} at {} baud", port, baud_rate);
        Ok(Box::new(serial))
    }
}

/// Enumerate the serial ports visible to the host
pub fn list_serial_ports() -> anyhow::Result<Vec<SerialPortEntry>> {
    let ports = serialport::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let (description, hwid) = describe_port(&port.port_type);
            SerialPortEntry {
                device: port.port_name,
                description,
                hwid,
            }
        })
        .collect())
}

fn describe_port(port_type: &serialport::SerialPortType) -> (String, String) {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            let description = format!(
                "{} {}",
                usb.manufacturer.as_deref().unwrap_or("USB"),
                usb.product.as_deref().unwrap_or("Serial Port")
            );
            let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
            if let Some(serial) = &usb.serial_number {
                hwid.push_str(&format!(" SER={}", serial));
            }
            (description, hwid)
        }
        serialport::SerialPortType::BluetoothPort => ("Bluetooth Serial".into(), "n/a".into()),
        serialport::SerialPortType::PciPort => ("PCI Serial".into(), "n/a".into()),
        _ => ("Serial Port".into(), "n/a".into()),
    }
}
