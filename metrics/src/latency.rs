use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::ring::RingBuffer;
use crate::snapshot::duration_ms;

const DEFAULT_HISTORY_SIZE: usize = 10_000;
const DEFAULT_COMPUTE_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bounds (exclusive, in milliseconds) of the fixed distribution
/// buckets; everything at or above the last bound lands in the overflow
/// bucket.
pub const DISTRIBUTION_BOUNDS_MS: [u64; 7] = [1, 5, 10, 50, 100, 500, 1000];

pub const DISTRIBUTION_LABELS: [&str; 8] = [
    "<1ms", "<5ms", "<10ms", "<50ms", "<100ms", "<500ms", "<1000ms", ">=1s",
];

/// Sample counts per fixed latency bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct LatencyDistribution {
    pub buckets: [u64; 8],
}

impl LatencyDistribution {
    fn from_sorted(sorted: &[Duration]) -> Self {
        let mut buckets = [0u64; 8];
        for sample in sorted {
            let ms = sample.as_millis() as u64;
            let slot = DISTRIBUTION_BOUNDS_MS
                .iter()
                .position(|bound| ms < *bound)
                .unwrap_or(DISTRIBUTION_BOUNDS_MS.len());
            buckets[slot] += 1;
        }
        Self { buckets }
    }
}

/// Latency sampling and percentile estimation.
///
/// Samples land in a bounded ring (oldest evicted first) while running
/// min/max/sum/count accumulate in atomics. Percentiles are deferred: the
/// first `snapshot` after `compute_interval` copies the ring, sorts it, and
/// caches the result, so the sort cost is amortized no matter how often
/// snapshots are taken.
pub struct LatencyTracker {
    ring: RingBuffer<Duration>,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
    sum_ns: AtomicU64,
    count: AtomicU64,
    sampling_rate: f64,
    compute_interval: Duration,
    cache: Mutex<PercentileCache>,
}

#[derive(Default, Clone, Copy)]
struct PercentileCache {
    computed_at: Option<Instant>,
    p50: Duration,
    p90: Duration,
    p95: Duration,
    p99: Duration,
    p999: Duration,
    std_dev: Duration,
    distribution: LatencyDistribution,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct LatencyMetrics {
    pub count: u64,
    #[serde(with = "duration_ms")]
    pub min: Duration,
    #[serde(with = "duration_ms")]
    pub max: Duration,
    #[serde(with = "duration_ms")]
    pub avg: Duration,
    #[serde(with = "duration_ms")]
    pub std_dev: Duration,
    #[serde(with = "duration_ms")]
    pub p50: Duration,
    #[serde(with = "duration_ms")]
    pub p90: Duration,
    #[serde(with = "duration_ms")]
    pub p95: Duration,
    #[serde(with = "duration_ms")]
    pub p99: Duration,
    #[serde(with = "duration_ms")]
    pub p999: Duration,
    pub distribution: LatencyDistribution,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE, 1.0, DEFAULT_COMPUTE_INTERVAL)
    }
}

impl LatencyTracker {
    pub fn new(history_size: usize, sampling_rate: f64, compute_interval: Duration) -> Self {
        Self {
            ring: RingBuffer::new(history_size),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
            sum_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            compute_interval,
            cache: Mutex::new(PercentileCache::default()),
        }
    }

    pub fn record(&self, latency: Duration) {
        if self.sampling_rate < 1.0 && rand::random::<f64>() >= self.sampling_rate {
            return;
        }
        let nanos = latency.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.ring.push(latency);
        self.min_ns.fetch_min(nanos, Ordering::Relaxed);
        self.max_ns.fetch_max(nanos, Ordering::Relaxed);
        self.sum_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LatencyMetrics {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return LatencyMetrics::default();
        }

        let min_ns = self.min_ns.load(Ordering::Relaxed);
        let min = if min_ns == u64::MAX {
            Duration::ZERO
        } else {
            Duration::from_nanos(min_ns)
        };
        let max = Duration::from_nanos(self.max_ns.load(Ordering::Relaxed));
        let avg = Duration::from_nanos(self.sum_ns.load(Ordering::Relaxed) / count);

        let cache = self.computed_percentiles();
        LatencyMetrics {
            count,
            min,
            max,
            avg,
            std_dev: cache.std_dev,
            p50: cache.p50,
            p90: cache.p90,
            p95: cache.p95,
            p99: cache.p99,
            p999: cache.p999,
            distribution: cache.distribution,
        }
    }

    /// Return the cached percentile set, recomputing it from the ring when
    /// the compute interval has elapsed (or nothing was ever computed).
    fn computed_percentiles(&self) -> PercentileCache {
        let mut cache = self.cache.lock().expect("poisoned percentile cache");
        let stale = match cache.computed_at {
            None => true,
            Some(at) => at.elapsed() >= self.compute_interval,
        };
        if !stale {
            return *cache;
        }

        let mut samples = self.ring.snapshot();
        if samples.is_empty() {
            *cache = PercentileCache {
                computed_at: Some(Instant::now()),
                ..PercentileCache::default()
            };
            return *cache;
        }
        samples.sort_unstable();

        *cache = PercentileCache {
            computed_at: Some(Instant::now()),
            p50: percentile(&samples, 50.0),
            p90: percentile(&samples, 90.0),
            p95: percentile(&samples, 95.0),
            p99: percentile(&samples, 99.0),
            p999: percentile(&samples, 99.9),
            std_dev: std_dev(&samples),
            distribution: LatencyDistribution::from_sorted(&samples),
        };
        *cache
    }

    pub fn reset(&self) {
        self.ring.clear();
        self.min_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
        self.sum_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        *self.cache.lock().expect("poisoned percentile cache") = PercentileCache::default();
    }
}

/// Index-based percentile over a sorted slice: `idx = len * p / 100`,
/// clamped to the valid range.
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let idx = ((sorted.len() as f64 * p / 100.0) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Sample standard deviation; zero when fewer than two samples.
fn std_dev(samples: &[Duration]) -> Duration {
    let n = samples.len();
    if n <= 1 {
        return Duration::ZERO;
    }
    let mean = samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / n as f64;
    let variance = samples
        .iter()
        .map(|d| {
            let diff = d.as_secs_f64() - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    Duration::from_secs_f64(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LatencyTracker {
        // Zero compute interval: every snapshot recomputes, which keeps
        // assertions deterministic.
        LatencyTracker::new(10_000, 1.0, Duration::ZERO)
    }

    #[test]
    fn empty_tracker_is_all_zero() {
        let metrics = tracker().snapshot();
        assert_eq!(metrics, LatencyMetrics::default());
    }

    #[test]
    fn min_avg_max_ordering_holds() {
        let t = tracker();
        for ms in [5u64, 10, 20, 40, 80] {
            t.record(Duration::from_millis(ms));
        }
        let m = t.snapshot();
        assert_eq!(m.count, 5);
        assert_eq!(m.min, Duration::from_millis(5));
        assert_eq!(m.max, Duration::from_millis(80));
        assert!(m.min <= m.avg && m.avg <= m.max);
        assert_eq!(m.avg, Duration::from_millis(31));
    }

    #[test]
    fn skewed_distribution_percentiles() {
        let t = tracker();
        // 9500 fast samples and 500 slow ones.
        for _ in 0..9500 {
            t.record(Duration::from_millis(10));
        }
        for _ in 0..500 {
            t.record(Duration::from_secs(1));
        }
        let m = t.snapshot();
        assert_eq!(m.count, 10_000);
        assert_eq!(m.p50, Duration::from_millis(10));
        assert_eq!(m.p90, Duration::from_millis(10));
        // Index math puts p95 exactly on the first slow sample.
        assert_eq!(m.p95, Duration::from_secs(1));
        assert_eq!(m.p99, Duration::from_secs(1));
        assert_eq!(m.max, Duration::from_secs(1));
        let avg_ms = m.avg.as_secs_f64() * 1000.0;
        assert!((avg_ms - 59.5).abs() < 1.0, "avg was {avg_ms} ms");
        assert!(m.p50 <= m.p95 && m.p95 <= m.p99);
        // 10ms samples land in the <50ms bucket, the 1s tail in overflow.
        assert_eq!(m.distribution.buckets[3], 9500);
        assert_eq!(m.distribution.buckets[7], 500);
    }

    #[test]
    fn percentiles_are_cached_between_intervals() {
        let t = LatencyTracker::new(1000, 1.0, Duration::from_secs(3600));
        t.record(Duration::from_millis(10));
        let first = t.snapshot();
        assert_eq!(first.p99, Duration::from_millis(10));

        // New data within the interval does not move cached percentiles,
        // but the atomics stay live.
        for _ in 0..100 {
            t.record(Duration::from_secs(2));
        }
        let second = t.snapshot();
        assert_eq!(second.p99, Duration::from_millis(10));
        assert_eq!(second.max, Duration::from_secs(2));
        assert_eq!(second.count, 101);
    }

    #[test]
    fn std_dev_of_identical_samples_is_zero() {
        let t = tracker();
        for _ in 0..10 {
            t.record(Duration::from_millis(25));
        }
        assert_eq!(t.snapshot().std_dev, Duration::ZERO);
    }

    #[test]
    fn single_sample_has_zero_std_dev() {
        let t = tracker();
        t.record(Duration::from_millis(7));
        assert_eq!(t.snapshot().std_dev, Duration::ZERO);
    }

    #[test]
    fn reset_clears_everything() {
        let t = tracker();
        t.record(Duration::from_millis(10));
        t.reset();
        assert_eq!(t.snapshot(), LatencyMetrics::default());
    }

    #[test]
    fn sampling_rate_zero_records_nothing() {
        let t = LatencyTracker::new(100, 0.0, Duration::ZERO);
        for _ in 0..1000 {
            t.record(Duration::from_millis(1));
        }
        assert_eq!(t.snapshot().count, 0);
    }
}
