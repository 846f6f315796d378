// src/logfile.rs
//
// The session log file: header block, timestamped body lines, statistics
// footer. Console markup never reaches this file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::CaptureError;
use crate::stats::StatsReport;

/// Width of the rule under the session header.
const HEADER_RULE_WIDTH: usize = 50;

/// Session facts recorded in the file header.
pub struct SessionHeader<'a> {
    pub device: &'a str,
    pub baud: u32,
    pub filter: &'a str,
    pub started: DateTime<Local>,
}

/// Owns the output file for one session. Every line is flushed as written,
/// so a crash loses at most the line in flight.
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    file: File,
}

impl LogWriter {
    /// Create the session file and write the header block. The path comes
    /// from the allocator and must be fresh; an existing file is an error,
    /// never silently overwritten.
    pub fn create(path: &Path, header: &SessionHeader) -> Result<LogWriter, CaptureError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| CaptureError::OutputWriteError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut writer = LogWriter {
            path: path.to_path_buf(),
            file,
        };
        writer.write(format!(
            "=== capture started {} ===\n",
            header.started.format("%Y-%m-%d %H:%M:%S")
        ))?;
        writer.write(format!("device: {}\n", header.device))?;
        writer.write(format!("baud: {}\n", header.baud))?;
        writer.write(format!("filter: {}\n", header.filter))?;
        writer.write(format!("{}\n", "-".repeat(HEADER_RULE_WIDTH)))?;
        Ok(writer)
    }

    /// Append one captured line, timestamped, without markup.
    pub fn write_line(&mut self, at: DateTime<Local>, line: &str) -> Result<(), CaptureError> {
        self.write(format!("[{}] {}\n", at.format("%H:%M:%S%.3f"), line))
    }

    /// Append the statistics footer.
    pub fn write_footer(
        &mut self,
        ended: DateTime<Local>,
        report: &StatsReport,
    ) -> Result<(), CaptureError> {
        self.write(format!(
            "\n=== capture ended {} ===\n",
            ended.format("%Y-%m-%d %H:%M:%S")
        ))?;
        self.write(format!("total lines: {}\n", report.total))?;
        self.write(format!("error lines: {}\n", report.errors))?;
        self.write(format!("mqtt lines: {}\n", report.mqtt))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, text: String) -> Result<(), CaptureError> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| CaptureError::OutputWriteError {
                path: self.path.clone(),
                source: e,
            })
    }
}
