// src/cli.rs
//
// Command-line surface.

use std::path::PathBuf;

use clap::Parser;

use crate::serial::Parity;

/// Serial console capture and analysis tool.
///
/// Attaches to a serial device, echoes classified output to the console,
/// and archives every session under the output directory.
#[derive(Debug, Parser)]
#[command(name = "serialtap", version, about)]
pub struct Cli {
    /// Serial device path (auto-discovered when omitted)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = 115200)]
    pub baud: u32,

    /// Stop after this many seconds (capture until Ctrl-C when omitted)
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Only keep lines containing this substring (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Directory for session log files
    #[arg(short, long, default_value = "consoleout")]
    pub output_dir: PathBuf,

    /// Data bits (5-8)
    #[arg(long, default_value_t = 8)]
    pub data_bits: u8,

    /// Stop bits (1 or 2)
    #[arg(long, default_value_t = 1)]
    pub stop_bits: u8,

    /// Parity
    #[arg(long, value_enum, default_value_t = Parity::None)]
    pub parity: Parity,

    /// Classification rules file (TOML); built-in rules when omitted
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// List detected serial devices and exit
    #[arg(long)]
    pub list_ports: bool,
}
