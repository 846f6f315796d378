// src/stats.rs
//
// Per-session statistics. One value owned by the pipeline, nothing global,
// so repeated sessions in one process never leak counts into each other.

use std::time::Duration;

use crate::classify::{Category, CATEGORY_COUNT};

/// Running counters for one capture session.
#[derive(Debug, Default)]
pub struct SessionStats {
    total: u64,
    by_category: [u64; CATEGORY_COUNT],
}

impl SessionStats {
    pub fn new() -> Self {
        SessionStats::default()
    }

    /// Count one admitted line. Returns the line's sequence number: totals
    /// and sequence numbers are the same counter, so they cannot diverge.
    pub fn record(&mut self, category: Option<Category>) -> u64 {
        self.total += 1;
        if let Some(category) = category {
            self.by_category[category.index()] += 1;
        }
        self.total
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, category: Category) -> u64 {
        self.by_category[category.index()]
    }

    /// Summarise the session. Valid at any point, including before the first
    /// `record`; the rate is 0 when no time has elapsed.
    pub fn snapshot(&self, elapsed: Duration) -> StatsReport {
        let secs = elapsed.as_secs_f64();
        let lines_per_second = if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        };
        StatsReport {
            total: self.total,
            errors: self.count(Category::Error),
            mqtt: self.count(Category::Mqtt),
            elapsed,
            lines_per_second,
        }
    }
}

/// End-of-session summary, rendered once to the console and once as the
/// log file footer.
#[derive(Clone, Debug)]
pub struct StatsReport {
    pub total: u64,
    pub errors: u64,
    pub mqtt: u64,
    pub elapsed: Duration,
    pub lines_per_second: f64,
}
