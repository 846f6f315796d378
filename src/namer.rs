// src/namer.rs
//
// Output file allocation: one date-scoped, sequence-numbered log per session.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::CaptureError;

/// Allocate the next session log path: `<dir>/<YYYY-MM-DD>_<NN>.log`.
///
/// NN is two-digit and 1-based, chosen as max+1 over the suffixes already
/// present for that date, so repeated runs on the same day never collide.
/// Creates the directory if needed.
pub fn allocate(dir: &Path, date: NaiveDate) -> Result<PathBuf, CaptureError> {
    std::fs::create_dir_all(dir).map_err(|e| CaptureError::OutputDirUnavailable {
        dir: dir.to_path_buf(),
        source: e,
    })?;

    let prefix = format!("{}_", date.format("%Y-%m-%d"));
    let entries = std::fs::read_dir(dir).map_err(|e| CaptureError::OutputDirUnavailable {
        dir: dir.to_path_buf(),
        source: e,
    })?;

    let mut max_seq = 0u32;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if let Some(seq) = parse_sequence(&name.to_string_lossy(), &prefix) {
            max_seq = max_seq.max(seq);
        }
    }

    Ok(dir.join(format!("{}{:02}.log", prefix, max_seq + 1)))
}

/// Extract NN from `<prefix>NN.log`. Names that carry the date prefix but
/// not a numeric suffix are ignored rather than rejected.
fn parse_sequence(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?.strip_suffix(".log")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
