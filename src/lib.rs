//! Serial console capture and analysis.
//!
//! serialtap tails a device's serial output, classifies each line against an
//! ordered keyword rule table, optionally filters the stream, and archives
//! every session to a date-scoped log file with a statistics footer.

pub mod capture;
pub mod classify;
pub mod cli;
pub mod console;
pub mod error;
pub mod filter;
pub mod framer;
pub mod logfile;
pub mod namer;
pub mod ports;
pub mod serial;
pub mod stats;
