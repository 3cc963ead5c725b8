//! Progress reporter implementation
//!
//! Uses indicatif for progress bars with:
//! - Item count progress (sequences, regions, variants)
//! - Throughput and ETA display
//! - A hidden mode for quiet runs and tests

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Progress reporter for loading and encoding steps
pub struct ProgressReporter {
    /// Item progress bar
    bar: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Total items
    total: AtomicU64,
    /// Items processed so far
    processed: AtomicU64,
    /// Is progress enabled
    enabled: AtomicBool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new(label: &str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA {eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(label.to_string());

        Self {
            bar,
            start_time: Instant::now(),
            total: AtomicU64::new(total),
            processed: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a disabled progress reporter (for quiet mode)
    pub fn disabled() -> Self {
        let reporter = Self::new("", 0);
        reporter.enabled.store(false, Ordering::SeqCst);
        reporter.bar.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Create an enabled or disabled reporter
    pub fn with_enabled(enabled: bool, label: &str, total: u64) -> Self {
        if enabled {
            Self::new(label, total)
        } else {
            let reporter = Self::disabled();
            reporter.set_total(total);
            reporter
        }
    }

    /// Set total items
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.bar.set_length(total);
    }

    /// Increment processed items
    pub fn inc(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Relaxed);
        self.bar.inc(count);
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Items per second
    pub fn throughput(&self) -> f64 {
        let processed = self.processed.load(Ordering::Relaxed);
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Finish progress with success message
    pub fn finish_success(&self, message: &str) {
        self.bar.finish_with_message(format!("✓ {}", message));
    }

    /// Finish progress with error message
    pub fn finish_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("✗ {}", message));
    }

    /// Check if progress is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Get progress summary
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            total: self.total.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
            throughput: self.throughput(),
        }
    }
}

/// Progress summary
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    /// Total items
    pub total: u64,
    /// Items processed
    pub processed: u64,
    /// Elapsed time
    pub elapsed: Duration,
    /// Items per second
    pub throughput: f64,
}

impl ProgressSummary {
    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }

    /// Elapsed time rounded to milliseconds, human readable
    pub fn elapsed_human(&self) -> String {
        let rounded = Duration::from_millis(self.elapsed.as_millis() as u64);
        humantime::format_duration(rounded).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reporter() {
        let reporter = ProgressReporter::disabled();
        assert!(!reporter.is_enabled());

        reporter.set_total(10);
        reporter.inc(4);
        reporter.inc(1);

        let summary = reporter.summary();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.percentage(), 50.0);
    }

    #[test]
    fn test_with_enabled_false_keeps_total() {
        let reporter = ProgressReporter::with_enabled(false, "Loading", 8);
        assert_eq!(reporter.summary().total, 8);
        assert_eq!(reporter.summary().percentage(), 0.0);
    }
}
