// src/main.rs
//
// serialtap entry point: flag parsing, port and output resolution, and the
// lifetime of one capture session.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::style::Stylize;

use serialtap::capture::{
    CaptureConfig, CaptureOutcome, CapturePipeline, EndReason, READ_ERROR_PAUSE, SETTLE_DELAY,
};
use serialtap::classify::RuleSet;
use serialtap::cli::Cli;
use serialtap::error::CaptureError;
use serialtap::filter::LineFilter;
use serialtap::serial::FrameSettings;
use serialtap::{namer, ports};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr and stay quiet unless RUST_LOG says otherwise;
    // the captured stream owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_ports {
        return match print_port_list() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => report_fatal(&e),
        };
    }

    match run(cli).await {
        Ok(outcome) => {
            if outcome.reason == EndReason::DeviceLost {
                eprintln!(
                    "{} device lost mid-session; the log is complete up to disconnection",
                    "warning:".yellow().bold()
                );
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => report_fatal(&e),
    }
}

async fn run(cli: Cli) -> Result<CaptureOutcome, CaptureError> {
    let rules = match &cli.rules {
        Some(path) => RuleSet::load(path)?,
        None => RuleSet::default(),
    };
    let port = ports::resolve(cli.port.as_deref())?;
    let log_path = namer::allocate(&cli.output_dir, chrono::Local::now().date_naive())?;

    let config = CaptureConfig {
        port,
        baud: cli.baud,
        frame: FrameSettings {
            data_bits: cli.data_bits,
            stop_bits: cli.stop_bits,
            parity: cli.parity,
        },
        log_path,
        duration: cli.duration.map(Duration::from_secs),
        filter: LineFilter::new(cli.filter.as_deref()),
        rules,
        settle_delay: SETTLE_DELAY,
        read_error_pause: READ_ERROR_PAUSE,
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let pipeline = CapturePipeline::new(config, Arc::clone(&cancel));

    // Ctrl-C sets the flag; the loop observes it within one read timeout.
    let signal_cancel = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.store(true, Ordering::Relaxed);
        }
    });

    tokio::task::spawn_blocking(move || pipeline.run())
        .await
        .map_err(|e| CaptureError::Internal(e.to_string()))?
}

fn print_port_list() -> Result<(), CaptureError> {
    let listings = ports::list_ports()?;
    if listings.is_empty() {
        println!("no serial ports detected");
        return Ok(());
    }
    println!("available serial ports:");
    for listing in &listings {
        let marker = if listing.candidate { "*" } else { " " };
        match &listing.detail {
            Some(detail) => println!(
                "  {marker} {}  {} ({detail})",
                listing.name, listing.port_type
            ),
            None => println!("  {marker} {}  {}", listing.name, listing.port_type),
        }
    }
    println!("(* = auto-discovery candidate)");
    Ok(())
}

fn report_fatal(err: &CaptureError) -> ExitCode {
    eprintln!("{} {err}", "error:".red().bold());
    for hint in err.remediation() {
        eprintln!("  hint: {hint}");
    }
    ExitCode::FAILURE
}
