// src/serial.rs
//
// Serial frame settings and conversions to serialport types.

use std::time::Duration;

use serialport::{DataBits, Parity as SpParity, SerialPort, StopBits};

use crate::error::CaptureError;

/// Bounded read timeout for the capture loop. Cancellation and duration
/// deadlines are observed within one timeout window.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Parity setting for the capture port
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Default for Parity {
    fn default() -> Self {
        Parity::None
    }
}

/// Serial frame settings for the capture port (8N1 unless overridden)
#[derive(Clone, Copy, Debug)]
pub struct FrameSettings {
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl Default for FrameSettings {
    fn default() -> Self {
        FrameSettings {
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }
}

/// Convert our Parity enum to serialport crate's Parity type
pub fn to_serialport_parity(p: Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Convert data bits count to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// Open the capture port with the bounded read timeout applied.
/// Open failure is terminal for the session; there is no retry.
pub fn open_port(
    path: &str,
    baud_rate: u32,
    frame: FrameSettings,
) -> Result<Box<dyn SerialPort>, CaptureError> {
    serialport::new(path, baud_rate)
        .data_bits(to_serialport_data_bits(frame.data_bits))
        .stop_bits(to_serialport_stop_bits(frame.stop_bits))
        .parity(to_serialport_parity(frame.parity))
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| CaptureError::DeviceOpenError {
            port: path.to_string(),
            source: e,
        })
}
