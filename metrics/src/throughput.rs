use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::window::TimeWindow;

const DEFAULT_WINDOW: Duration = Duration::from_secs(10);
const DEFAULT_BUCKET: Duration = Duration::from_secs(1);

/// Two views of throughput.
///
/// The monotonic read/write counters divided by elapsed test time are the
/// authoritative rates a report quotes. The sliding window is for live
/// monitoring only: it answers "what is happening right now" and decays to
/// zero when traffic stops.
pub struct ThroughputTracker {
    window: TimeWindow,
    read_count: AtomicU64,
    write_count: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ThroughputMetrics {
    pub read_count: u64,
    pub write_count: u64,
    pub rps: f64,
    pub read_rps: f64,
    pub write_rps: f64,
    /// Instantaneous rate from the sliding window.
    pub current_rate: f64,
}

impl Default for ThroughputTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_BUCKET)
    }
}

impl ThroughputTracker {
    pub fn new(window_size: Duration, bucket_size: Duration) -> Self {
        Self {
            window: TimeWindow::new(window_size, bucket_size),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, is_read: bool) {
        self.window.record(1);
        if is_read {
            self.read_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.write_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// `elapsed` is the test duration so far, used for the test-wide rates.
    pub fn snapshot(&self, elapsed: Duration) -> ThroughputMetrics {
        let read = self.read_count.load(Ordering::Relaxed);
        let write = self.write_count.load(Ordering::Relaxed);
        let secs = elapsed.as_secs_f64();
        let (rps, read_rps, write_rps) = if secs > 0.0 {
            (
                (read + write) as f64 / secs,
                read as f64 / secs,
                write as f64 / secs,
            )
        } else {
            (0.0, 0.0, 0.0)
        };
        ThroughputMetrics {
            read_count: read,
            write_count: write,
            rps,
            read_rps,
            write_rps,
            current_rate: self.window.rate(),
        }
    }

    pub fn reset(&self) {
        self.window.reset();
        self.read_count.store(0, Ordering::Relaxed);
        self.write_count.store(0, Ordering::Relaxed);
    }
}
