// src/ports.rs
//
// Serial device discovery and validation. No device is opened here; the
// resolver only decides which path the capture pipeline should open.

use serialport::{SerialPortInfo, SerialPortType};

use crate::error::CaptureError;

/// Device-name prefixes for the USB serial adapters this tool expects:
/// CP210x/FTDI/CH34x bridges on macOS (cu.* are the non-blocking calling-unit
/// devices; tty.* block on carrier detect) and ttyUSB/ttyACM on Linux.
const USB_SERIAL_PREFIXES: &[&str] = &[
    "/dev/cu.usbserial-",
    "/dev/cu.SLAB_USBtoUART",
    "/dev/cu.wchusbserial",
    "/dev/ttyUSB",
    "/dev/ttyACM",
];

/// One row of `--list-ports` output.
pub struct PortListing {
    pub name: String,
    pub port_type: String,
    pub detail: Option<String>,
    /// Whether auto-discovery would consider this port.
    pub candidate: bool,
}

/// Whether a port name matches one of the known USB serial naming schemes.
pub fn is_candidate(port_name: &str) -> bool {
    USB_SERIAL_PREFIXES.iter().any(|p| port_name.starts_with(p))
}

/// The lexicographically last name. On these naming schemes the most
/// recently attached adapter sorts last.
fn latest(mut names: Vec<String>) -> Option<String> {
    names.sort();
    names.pop()
}

/// Resolve the device path for a session: validate an explicit path, or
/// auto-discover the most recently attached USB serial adapter.
pub fn resolve(explicit: Option<&str>) -> Result<String, CaptureError> {
    if let Some(path) = explicit {
        validate_explicit(path)?;
        return Ok(path.to_string());
    }

    let candidates: Vec<String> = available()?
        .into_iter()
        .map(|p| p.port_name)
        .filter(|n| is_candidate(n))
        .collect();

    latest(candidates).ok_or_else(|| {
        CaptureError::DeviceNotFound("no USB serial adapter detected".to_string())
    })
}

/// Every detected port with its USB metadata, for `--list-ports`.
pub fn list_ports() -> Result<Vec<PortListing>, CaptureError> {
    let mut listings: Vec<PortListing> = available()?.into_iter().map(describe).collect();
    listings.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listings)
}

fn available() -> Result<Vec<SerialPortInfo>, CaptureError> {
    serialport::available_ports()
        .map_err(|e| CaptureError::DeviceNotFound(format!("port enumeration failed: {e}")))
}

fn describe(port: SerialPortInfo) -> PortListing {
    let candidate = is_candidate(&port.port_name);
    let (port_type, detail) = match port.port_type {
        SerialPortType::UsbPort(info) => {
            let mut parts = Vec::new();
            if let Some(manufacturer) = info.manufacturer {
                parts.push(manufacturer);
            }
            if let Some(product) = info.product {
                parts.push(product);
            }
            let detail = if parts.is_empty() {
                format!("{:04x}:{:04x}", info.vid, info.pid)
            } else {
                format!("{} {:04x}:{:04x}", parts.join(" "), info.vid, info.pid)
            };
            ("USB".to_string(), Some(detail))
        }
        SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None),
        SerialPortType::PciPort => ("PCI".to_string(), None),
        SerialPortType::Unknown => ("Unknown".to_string(), None),
    };
    PortListing {
        name: port.port_name,
        port_type,
        detail,
        candidate,
    }
}

#[cfg(unix)]
fn validate_explicit(path: &str) -> Result<(), CaptureError> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::metadata(path) {
        Ok(md) if md.file_type().is_char_device() => Ok(()),
        Ok(_) => Err(CaptureError::DeviceNotFound(format!(
            "{path} is not a character device"
        ))),
        Err(_) => Err(CaptureError::DeviceNotFound(format!(
            "{path} does not exist"
        ))),
    }
}

// Windows COM port names are not filesystem paths; let open() sort it out.
#[cfg(not(unix))]
fn validate_explicit(_path: &str) -> Result<(), CaptureError> {
    Ok(())
}
