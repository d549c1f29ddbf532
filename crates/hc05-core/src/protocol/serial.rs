//! Serial port handling
//!
//! Provides low-level serial port access for talking to HC-05 modules.

use serde::{Deserialize, Serialize};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{Read, Write};
use std::time::Duration;

use super::transport::timeout_as_empty;
use super::{ProtocolError, SerialBackend, Transport};

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// Free-text description of the port
    pub description: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    /// A port known only by its device path
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "n/a".to_string(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                description: usb_info
                    .product
                    .clone()
                    .unwrap_or_else(|| "USB Serial Device".to_string()),
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
                serial_number: usb_info.serial_number,
            },
            SerialPortType::BluetoothPort => Self {
                description: "Bluetooth Serial Port".to_string(),
                ..Self::bare(info.port_name)
            },
            SerialPortType::PciPort => Self {
                description: "PCI Serial Port".to_string(),
                ..Self::bare(info.port_name)
            },
            SerialPortType::Unknown => Self::bare(info.port_name),
        }
    }
}

/// One line of the port menu, 1-based:
/// `1: /dev/ttyUSB0 - CP2102 | Manufacturer: Silicon Labs | VID:PID = 10C4:EA60`
pub fn format_port_line(index: usize, port: &PortInfo) -> String {
    let mut details = format!("{}: {} - {}", index, port.name, port.description);
    if let Some(manufacturer) = &port.manufacturer {
        details.push_str(&format!(" | Manufacturer: {}", manufacturer));
    }
    if let Some(product) = &port.product {
        details.push_str(&format!(" | Product: {}", product));
    }
    if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        details.push_str(&format!(" | VID:PID = {:04X}:{:04X}", vid, pid));
    }
    details
}

/// Helper used to sort port names so that:
///  - ttyUSB* ports come first (sorted numerically by suffix)
///  - then ttyACM* ports (sorted numerically)
///  - then other ports (sorted by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    match serialport::available_ports() {
        Ok(infos) => {
            for info in infos {
                let p = PortInfo::from(info);
                map.entry(p.name.clone()).or_insert(p);
            }
        }
        Err(e) => tracing::warn!("port enumeration failed: {}", e),
    }

    // USB-TTL adapters sometimes miss udev metadata
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyUSB") || fname.starts_with("ttyACM") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open a serial port at 8N1 with the given baud and read timeout
pub fn open_port(
    name: &str,
    baud: u32,
    read_timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    if baud == 0 {
        return Err(ProtocolError::InvalidBaud(baud.to_string()));
    }

    let port = serialport::new(name, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(read_timeout)
        .open()?;

    tracing::debug!("opened {} at {} baud", name, baud);
    Ok(port)
}

/// [`Transport`] over a real serial port. Closing happens on drop.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ProtocolError> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        timeout_as_empty(self.port.read(buf))
    }
}

/// The host's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

impl SerialBackend for SystemSerial {
    fn list_ports(&mut self) -> Vec<PortInfo> {
        list_ports()
    }

    fn open(
        &mut self,
        port: &str,
        baud: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError> {
        let port = open_port(port, baud, read_timeout)?;
        Ok(Box::new(SerialTransport::new(port)))
    }
}
