// src/error.rs
//
// Error taxonomy for the capture pipeline. Fatal variants carry remediation
// hints that the CLI prints alongside the diagnosis.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can prevent or abort a capture session.
///
/// Transient read errors are not represented here; they are retried inside
/// the capture loop. A device disappearing mid-session ends the session via
/// a drain, not an error return.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No usable device: nothing auto-discovered, or the explicit path does
    /// not name a serial device.
    #[error("serial device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open {port}: {source}")]
    DeviceOpenError {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("cannot create output directory {}: {source}", .dir.display())]
    OutputDirUnavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write to {}: {source}", .path.display())]
    OutputWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rules file {}: {reason}", .path.display())]
    RulesFileInvalid { path: PathBuf, reason: String },

    /// The blocking capture task died without returning. A bug, surfaced
    /// as a fatal error rather than a silent hang.
    #[error("capture task failed: {0}")]
    Internal(String),
}

impl CaptureError {
    /// Remediation hints printed under the diagnosis for fatal errors.
    pub fn remediation(&self) -> &'static [&'static str] {
        match self {
            CaptureError::DeviceNotFound(_) => &[
                "check the device is plugged in",
                "run with --list-ports to see every detected port",
                "pass the device path explicitly with --port",
            ],
            CaptureError::DeviceOpenError { .. } => &[
                "check the device is still connected",
                "check no other program (IDE monitor, flasher) holds the port open",
                "check you have permission to open the device (dialout group on Linux)",
            ],
            CaptureError::OutputDirUnavailable { .. } => &[
                "check the path is writable, or pass a different --output-dir",
            ],
            CaptureError::OutputWriteError { .. } => &[
                "check free disk space and permissions on the output directory",
            ],
            CaptureError::RulesFileInvalid { .. } => &[
                "fix the rules file, or drop --rules to use the built-in rules",
            ],
            CaptureError::Internal(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_display() {
        let err = CaptureError::DeviceNotFound("no USB serial adapter detected".to_string());
        assert_eq!(
            err.to_string(),
            "serial device not found: no USB serial adapter detected"
        );
    }

    #[test]
    fn test_rules_file_invalid_display() {
        let err = CaptureError::RulesFileInvalid {
            path: PathBuf::from("rules.toml"),
            reason: "unknown category \"bogus\"".to_string(),
        };
        assert!(err.to_string().contains("rules.toml"));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_fatal_errors_carry_hints() {
        let err = CaptureError::DeviceNotFound("x".to_string());
        assert!(!err.remediation().is_empty());
        let err = CaptureError::OutputDirUnavailable {
            dir: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.remediation().is_empty());
    }

}
