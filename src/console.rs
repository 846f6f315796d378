// src/console.rs
//
// Console rendering: session banner, per-line echo with category markup,
// end-of-session statistics block. Everything here is display-only.

use std::path::Path;

use crossterm::style::{style, Color, Stylize};

use crate::classify::Category;
use crate::stats::StatsReport;

/// Width of the banner and summary rules.
const RULE_WIDTH: usize = 60;

/// Print the session banner before capture starts.
pub fn print_banner(device: &str, baud: u32, log_path: &Path, filter: &str) {
    println!("{}", "serialtap - serial console capture".bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("device:  {}", style(device).with(Color::Green));
    println!("baud:    {}", style(baud).with(Color::Green));
    println!("output:  {}", style(log_path.display()).with(Color::Green));
    println!("filter:  {filter}");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("capturing (Ctrl-C to stop)");
}

/// Echo one captured line with its sequence number and category colour.
/// The log file gets the same text without the number or the markup.
pub fn print_line(seq: u64, category: Option<Category>, line: &str) {
    match category {
        Some(category) => println!("[{seq:04}] {}", style(line).with(category.colour())),
        None => println!("[{seq:04}] {line}"),
    }
}

/// Print the statistics block. Called exactly once per session, however the
/// session ends.
pub fn print_summary(report: &StatsReport, log_path: &Path) {
    println!();
    println!("{}", "capture statistics".bold());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("duration:    {:.1} s", report.elapsed.as_secs_f64());
    println!("total lines: {}", report.total);
    println!("error lines: {}", report.errors);
    println!("mqtt lines:  {}", report.mqtt);
    println!("rate:        {:.1} lines/s", report.lines_per_second);
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("log saved to {}", log_path.display());
}
