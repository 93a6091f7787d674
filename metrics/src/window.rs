use std::sync::Mutex;
use std::time::{Duration, Instant};

struct WindowInner {
    buckets: Vec<u64>,
    /// Index of the bucket currently being written.
    cursor: usize,
    last_update: Instant,
}

/// Bucketed rolling counter producing a per-second rate over a sliding
/// window.
///
/// The whole window state (cursor + buckets) lives behind one mutex:
/// rotation and the indexed bucket write must be observed together, and an
/// atomics-per-bucket variant with a separately-read cursor races rotation
/// against recording.
pub struct TimeWindow {
    inner: Mutex<WindowInner>,
    window_size: Duration,
    bucket_size: Duration,
}

impl TimeWindow {
    /// `window_size` must be a multiple of `bucket_size`; the bucket count
    /// is rounded up to at least 1.
    pub fn new(window_size: Duration, bucket_size: Duration) -> Self {
        let bucket_size = if bucket_size.is_zero() {
            Duration::from_millis(100)
        } else {
            bucket_size
        };
        let count = (window_size.as_nanos() / bucket_size.as_nanos()).max(1) as usize;
        Self {
            inner: Mutex::new(WindowInner {
                buckets: vec![0; count],
                cursor: 0,
                last_update: Instant::now(),
            }),
            window_size: bucket_size * count as u32,
            bucket_size,
        }
    }

    fn advance(&self, inner: &mut WindowInner, now: Instant) {
        let elapsed = now.duration_since(inner.last_update);
        if elapsed < self.bucket_size {
            return;
        }
        let steps = (elapsed.as_nanos() / self.bucket_size.as_nanos()) as usize;
        let count = inner.buckets.len();
        // More steps than buckets means everything in the window is stale.
        for _ in 0..steps.min(count) {
            inner.cursor = (inner.cursor + 1) % count;
            inner.buckets[inner.cursor] = 0;
        }
        if steps >= count {
            inner.buckets.iter_mut().for_each(|b| *b = 0);
        }
        inner.last_update += self.bucket_size * steps as u32;
    }

    pub fn record(&self, n: u64) {
        let mut inner = self.inner.lock().expect("poisoned time window");
        self.advance(&mut inner, Instant::now());
        let cursor = inner.cursor;
        inner.buckets[cursor] += n;
    }

    /// Events per second over the window, after expiring stale buckets.
    pub fn rate(&self) -> f64 {
        let mut inner = self.inner.lock().expect("poisoned time window");
        self.advance(&mut inner, Instant::now());
        let total: u64 = inner.buckets.iter().sum();
        total as f64 / self.window_size.as_secs_f64()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("poisoned time window");
        inner.buckets.iter_mut().for_each(|b| *b = 0);
        inner.cursor = 0;
        inner.last_update = Instant::now();
    }

    pub fn window_size(&self) -> Duration {
        self.window_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_into_rate() {
        let window = TimeWindow::new(Duration::from_secs(10), Duration::from_secs(1));
        for _ in 0..50 {
            window.record(2);
        }
        // 100 events over a 10s window.
        let rate = window.rate();
        assert!((rate - 10.0).abs() < f64::EPSILON, "rate was {rate}");
    }

    #[test]
    fn quiescence_decays_to_zero() {
        let window = TimeWindow::new(Duration::from_millis(500), Duration::from_millis(100));
        window.record(100);
        assert!(window.rate() > 0.0);

        // A full window of silence must expire every bucket.
        std::thread::sleep(Duration::from_millis(600));
        assert_eq!(window.rate(), 0.0);
    }

    #[test]
    fn partial_expiry_keeps_recent_buckets() {
        let window = TimeWindow::new(Duration::from_secs(2), Duration::from_millis(500));
        window.record(40);
        std::thread::sleep(Duration::from_millis(600));
        window.record(4);
        // First bucket may or may not have expired depending on alignment,
        // but the recent one must still be counted.
        assert!(window.rate() >= 2.0);
    }

    #[test]
    fn reset_zeroes_everything() {
        let window = TimeWindow::new(Duration::from_secs(1), Duration::from_millis(100));
        window.record(1000);
        window.reset();
        assert_eq!(window.rate(), 0.0);
    }
}
