// src/capture.rs
//
// The capture pipeline. Owns the device handle and the session log, drives
// the bounded-timeout read loop, and runs every decoded line through
// filter -> classify -> record -> emit. Runs blocking on a dedicated task.

use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, warn};

use crate::classify::RuleSet;
use crate::console;
use crate::error::CaptureError;
use crate::filter::LineFilter;
use crate::framer::LineFramer;
use crate::logfile::{LogWriter, SessionHeader};
use crate::serial::{self, FrameSettings};
use crate::stats::{SessionStats, StatsReport};

// ============================================================================
// Types and Configuration
// ============================================================================

/// Wait after opening the device before reading; boards spew spurious bytes
/// right after the open-triggered reset.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Pause after a transient read error before retrying. Retries are unbounded;
/// only cancellation or the session deadline ends them.
pub const READ_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Pipeline states. Transitions are logged at debug level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Connecting,
    Capturing,
    Draining,
    Closed,
}

/// Why a session left the capturing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    DurationElapsed,
    Cancelled,
    /// The device disconnected mid-session. The log file is still completed
    /// with a footer; the exit code reflects the abnormal end.
    DeviceLost,
}

/// Everything a session needs to run. Immutable once the loop starts.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub port: String,
    pub baud: u32,
    pub frame: FrameSettings,
    pub log_path: PathBuf,
    pub duration: Option<Duration>,
    pub filter: LineFilter,
    pub rules: RuleSet,
    pub settle_delay: Duration,
    pub read_error_pause: Duration,
}

/// Result of a completed session.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub reason: EndReason,
    pub report: StatsReport,
    pub log_path: PathBuf,
}

enum LoopEnd {
    Ended(EndReason),
    Failed(CaptureError),
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct CapturePipeline {
    config: CaptureConfig,
    cancel: Arc<AtomicBool>,
    state: CaptureState,
}

impl CapturePipeline {
    pub fn new(config: CaptureConfig, cancel: Arc<AtomicBool>) -> Self {
        CapturePipeline {
            config,
            cancel,
            state: CaptureState::Idle,
        }
    }

    /// Open the device and run the session to completion. Open failure is
    /// terminal: the session never retries the connection itself.
    pub fn run(mut self) -> Result<CaptureOutcome, CaptureError> {
        self.set_state(CaptureState::Connecting);
        let port = serial::open_port(&self.config.port, self.config.baud, self.config.frame)?;
        debug!(port = %self.config.port, baud = self.config.baud, "device opened, settling");
        self.pause(self.config.settle_delay);
        self.capture(port)
    }

    /// Run the capture loop over an already-open byte source. `run` is the
    /// production entry; the scripted-source tests call this directly.
    pub fn capture<R: Read>(mut self, mut source: R) -> Result<CaptureOutcome, CaptureError> {
        let started = Local::now();
        let start_instant = Instant::now();
        let deadline = self
            .config
            .duration
            .and_then(|d| start_instant.checked_add(d));

        let mut writer = {
            let header = SessionHeader {
                device: &self.config.port,
                baud: self.config.baud,
                filter: self.config.filter.describe(),
                started,
            };
            LogWriter::create(&self.config.log_path, &header)?
        };

        console::print_banner(
            &self.config.port,
            self.config.baud,
            writer.path(),
            self.config.filter.describe(),
        );

        self.set_state(CaptureState::Capturing);
        let mut framer = LineFramer::new();
        let mut stats = SessionStats::new();

        let end = self.run_loop(&mut source, &mut framer, &mut stats, &mut writer, deadline);

        // Drain: runs on every exit path. The footer and the console summary
        // are written exactly once; the handles close with this scope.
        self.set_state(CaptureState::Draining);
        if let Some(tail) = framer.flush() {
            if !tail.trim_end().is_empty() {
                debug!(bytes = tail.len(), "discarding unterminated tail line");
            }
        }
        if framer.invalid_drops() > 0 {
            debug!(
                sequences = framer.invalid_drops(),
                "invalid byte sequences dropped during decode"
            );
        }

        let report = stats.snapshot(start_instant.elapsed());
        let footer = writer.write_footer(Local::now(), &report);
        console::print_summary(&report, writer.path());
        self.set_state(CaptureState::Closed);

        match end {
            LoopEnd::Failed(e) => Err(e),
            LoopEnd::Ended(reason) => {
                footer?;
                Ok(CaptureOutcome {
                    reason,
                    report,
                    log_path: self.config.log_path.clone(),
                })
            }
        }
    }

    fn run_loop<R: Read>(
        &mut self,
        source: &mut R,
        framer: &mut LineFramer,
        stats: &mut SessionStats,
        writer: &mut LogWriter,
        deadline: Option<Instant>,
    ) -> LoopEnd {
        let mut buf = [0u8; 512];

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return LoopEnd::Ended(EndReason::Cancelled);
            }
            if let Some(at) = deadline {
                if Instant::now() >= at {
                    return LoopEnd::Ended(EndReason::DurationElapsed);
                }
            }

            match source.read(&mut buf) {
                Ok(0) => {
                    // EOF from a serial handle means the device is gone.
                    warn!("device reported end of stream");
                    return LoopEnd::Ended(EndReason::DeviceLost);
                }
                Ok(n) => {
                    for line in framer.feed(&buf[..n]) {
                        if let Err(e) = self.admit(&line, stats, writer) {
                            return LoopEnd::Failed(e);
                        }
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    // Timeout is the ordinary no-data case.
                }
                Err(e) => {
                    if self.device_vanished() {
                        warn!(error = %e, "device path vanished");
                        return LoopEnd::Ended(EndReason::DeviceLost);
                    }
                    warn!(error = %e, "read error, retrying");
                    self.pause(self.config.read_error_pause);
                }
            }
        }
    }

    /// Filter -> classify -> record -> emit for one decoded line. Blank lines
    /// and filtered lines never reach numbering or statistics.
    fn admit(
        &self,
        line: &str,
        stats: &mut SessionStats,
        writer: &mut LogWriter,
    ) -> Result<(), CaptureError> {
        let line = line.trim_end();
        if line.is_empty() {
            return Ok(());
        }
        if !self.config.filter.retains(line) {
            return Ok(());
        }
        let category = self.config.rules.classify(line);
        let seq = stats.record(category);
        console::print_line(seq, category, line);
        writer.write_line(Local::now(), line)
    }

    /// A read error from a device whose path no longer exists means the
    /// adapter itself is gone, not a transient fault.
    fn device_vanished(&self) -> bool {
        #[cfg(unix)]
        {
            !std::path::Path::new(&self.config.port).exists()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Sleep in short slices so cancellation stays responsive during waits.
    fn pause(&self, total: Duration) {
        let slice = Duration::from_millis(100);
        let deadline = Instant::now() + total;
        while !self.cancel.load(Ordering::Relaxed) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(slice));
        }
    }

    fn set_state(&mut self, next: CaptureState) {
        debug!(from = ?self.state, to = ?next, "capture state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted byte source standing in for a serial port. Once the script
    /// runs out it reports EOF, like an unplugged device.
    enum Step {
        Chunk(&'static [u8]),
        Timeout,
        Error(io::ErrorKind),
        /// Trip the cancellation flag, then report a timeout.
        Cancel,
    }

    struct ScriptedPort {
        steps: VecDeque<Step>,
        cancel: Arc<AtomicBool>,
    }

    impl ScriptedPort {
        fn new(steps: Vec<Step>, cancel: Arc<AtomicBool>) -> Self {
            ScriptedPort {
                steps: steps.into(),
                cancel,
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Step::Chunk(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                }
                Some(Step::Timeout) => Err(io::ErrorKind::TimedOut.into()),
                Some(Step::Error(kind)) => Err(kind.into()),
                Some(Step::Cancel) => {
                    self.cancel.store(true, Ordering::Relaxed);
                    Err(io::ErrorKind::TimedOut.into())
                }
                None => Ok(0),
            }
        }
    }

    fn config(log_path: PathBuf) -> CaptureConfig {
        CaptureConfig {
            // A path that exists, so read errors stay transient in tests.
            port: "/".to_string(),
            baud: 115200,
            frame: FrameSettings::default(),
            log_path,
            duration: None,
            filter: LineFilter::new(None),
            rules: RuleSet::default(),
            settle_delay: Duration::ZERO,
            read_error_pause: Duration::from_millis(1),
        }
    }

    fn run_session(
        config: CaptureConfig,
        steps: Vec<Step>,
    ) -> Result<CaptureOutcome, CaptureError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let pipeline = CapturePipeline::new(config, Arc::clone(&cancel));
        pipeline.capture(ScriptedPort::new(steps, cancel))
    }

    #[test]
    fn test_unfiltered_session_counts_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("a.log");
        let outcome = run_session(
            config(log_path.clone()),
            vec![
                Step::Chunk(b"boot ok\n"),
                Step::Timeout,
                Step::Chunk(b"ERROR: sensor timeout\n+MQTT: connected\n"),
                Step::Cancel,
            ],
        )
        .unwrap();

        assert_eq!(outcome.reason, EndReason::Cancelled);
        assert_eq!(outcome.report.total, 3);
        assert_eq!(outcome.report.errors, 1);
        assert_eq!(outcome.report.mqtt, 1);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("] boot ok\n"));
        assert!(content.contains("] ERROR: sensor timeout\n"));
        assert!(content.contains("] +MQTT: connected\n"));
        assert!(content.contains("total lines: 3\n"));
        assert!(content.contains("error lines: 1\n"));
        assert!(content.contains("mqtt lines: 1\n"));
    }

    #[test]
    fn test_filtered_session_drops_non_matching_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("b.log");
        let mut cfg = config(log_path.clone());
        cfg.filter = LineFilter::new(Some("mqtt"));

        let outcome = run_session(
            cfg,
            vec![
                Step::Chunk(b"boot ok\nERROR: sensor timeout\n+MQTT: connected\n"),
                Step::Cancel,
            ],
        )
        .unwrap();

        assert_eq!(outcome.report.total, 1);
        assert_eq!(outcome.report.mqtt, 1);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(!content.contains("boot ok"));
        assert!(!content.contains("sensor timeout"));
        assert!(content.contains("] +MQTT: connected\n"));
        assert!(content.contains("total lines: 1\n"));
    }

    #[test]
    fn test_zero_duration_drains_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("c.log");
        let mut cfg = config(log_path.clone());
        cfg.duration = Some(Duration::ZERO);

        let outcome = run_session(cfg, vec![Step::Chunk(b"never read\n")]).unwrap();

        assert_eq!(outcome.reason, EndReason::DurationElapsed);
        assert_eq!(outcome.report.total, 0);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("=== capture started "));
        assert!(content.contains("=== capture ended "));
        assert!(content.contains("total lines: 0\n"));
        assert!(!content.contains("never read"));
    }

    #[test]
    fn test_cancellation_mid_stream_completes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("d.log");
        let outcome = run_session(
            config(log_path.clone()),
            vec![
                Step::Chunk(b"one\ntwo\n"),
                Step::Cancel,
                Step::Chunk(b"three\nfour\nfive\n"),
            ],
        )
        .unwrap();

        assert_eq!(outcome.reason, EndReason::Cancelled);
        assert_eq!(outcome.report.total, 2);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("total lines: 2\n"));
        assert!(!content.contains("three"));

        // Handles are released: the same path opens again without trouble.
        let reopened = std::fs::File::open(&log_path);
        assert!(reopened.is_ok());
    }

    #[test]
    fn test_eof_means_device_lost_but_file_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("e.log");
        let outcome =
            run_session(config(log_path.clone()), vec![Step::Chunk(b"last words\n")]).unwrap();

        assert_eq!(outcome.reason, EndReason::DeviceLost);
        assert_eq!(outcome.report.total, 1);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("] last words\n"));
        assert!(content.contains("total lines: 1\n"));
    }

    #[test]
    fn test_transient_read_error_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("f.log");
        let outcome = run_session(
            config(log_path.clone()),
            vec![
                Step::Error(io::ErrorKind::Other),
                Step::Chunk(b"survived\n"),
                Step::Cancel,
            ],
        )
        .unwrap();

        assert_eq!(outcome.reason, EndReason::Cancelled);
        assert_eq!(outcome.report.total, 1);
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("] survived\n"));
    }

    #[test]
    fn test_blank_lines_never_reach_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("g.log");
        let outcome = run_session(
            config(log_path.clone()),
            vec![Step::Chunk(b"\n   \nreal line\n"), Step::Cancel],
        )
        .unwrap();

        assert_eq!(outcome.report.total, 1);
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("] real line\n"));
    }

    #[test]
    fn test_unterminated_tail_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("h.log");
        let outcome = run_session(
            config(log_path.clone()),
            vec![Step::Chunk(b"whole\npartial without newline"), Step::Cancel],
        )
        .unwrap();

        assert_eq!(outcome.report.total, 1);
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("] whole\n"));
        assert!(!content.contains("partial without newline"));
    }
}
