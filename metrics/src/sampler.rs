use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use stampede_core::SystemSample;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ring::RingBuffer;

/// Counts cooperative tasks alive in the harness.
///
/// The engine registers a guard per spawned task (workers, dispatcher,
/// sink); dropping the guard deregisters. Under a work-stealing runtime the
/// OS thread count says nothing useful, so this gauge is what feeds the
/// "task count" reading in system samples.
#[derive(Clone, Default)]
pub struct TaskGauge(Arc<AtomicI64>);

pub struct TaskGuard(Arc<AtomicI64>);

impl TaskGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> TaskGuard {
        self.0.fetch_add(1, Ordering::Relaxed);
        TaskGuard(self.0.clone())
    }

    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed).max(0) as u64
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub monitor_interval: Duration,
    /// History ring capacity.
    pub snapshot_retention: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            monitor_interval: Duration::from_secs(1),
            snapshot_retention: 120,
        }
    }
}

/// High-water marks observed over the sampler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePeaks {
    pub max_resident_bytes: u64,
    pub max_task_count: u64,
}

struct Peaks {
    max_resident: AtomicU64,
    max_tasks: AtomicU64,
}

/// Background task sampling runtime state on a fixed interval.
///
/// Samples go into a bounded history ring; errors reading allocator stats
/// degrade to zeroed fields rather than aborting anything. `stop` is
/// idempotent and the task also dies with the collector's cancellation
/// token.
pub struct SystemSampler {
    history: Arc<RingBuffer<SystemSample>>,
    peaks: Arc<Peaks>,
    cancel: CancellationToken,
}

impl SystemSampler {
    pub fn spawn(config: SamplerConfig, gauge: TaskGauge) -> Self {
        let history = Arc::new(RingBuffer::new(config.snapshot_retention));
        let peaks = Arc::new(Peaks {
            max_resident: AtomicU64::new(0),
            max_tasks: AtomicU64::new(0),
        });
        let cancel = CancellationToken::new();

        let task_history = history.clone();
        let task_peaks = peaks.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.monitor_interval);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let sample = take_sample(&gauge);
                        task_peaks
                            .max_resident
                            .fetch_max(sample.resident_bytes, Ordering::Relaxed);
                        task_peaks
                            .max_tasks
                            .fetch_max(sample.task_count, Ordering::Relaxed);
                        metrics::gauge!("bench_resident_bytes")
                            .set(sample.resident_bytes as f64);
                        metrics::gauge!("bench_task_count").set(sample.task_count as f64);
                        task_history.push(sample);
                    }
                }
            }
            debug!("system sampler stopped");
        });

        Self {
            history,
            peaks,
            cancel,
        }
    }

    pub fn latest(&self) -> Option<SystemSample> {
        self.history.snapshot().pop()
    }

    pub fn history(&self) -> Vec<SystemSample> {
        self.history.snapshot()
    }

    pub fn peaks(&self) -> ResourcePeaks {
        ResourcePeaks {
            max_resident_bytes: self.peaks.max_resident.load(Ordering::Relaxed),
            max_task_count: self.peaks.max_tasks.load(Ordering::Relaxed),
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SystemSampler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn take_sample(gauge: &TaskGauge) -> SystemSample {
    let alloc = common_alloc::read_alloc_stats();
    let tasks = gauge.count();
    let cores = num_cpus::get().max(1);
    SystemSample {
        sampled_at: SystemTime::now(),
        allocated_bytes: alloc.allocated,
        resident_bytes: alloc.resident,
        gc_count: 0,
        gc_pause_total_ns: 0,
        task_count: tasks,
        cpu_estimate: (tasks as f64 / cores as f64 * 10.0).min(100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn assert_or_retry<F: Fn() -> bool>(check: F) {
        for _ in 0..50 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(check());
    }

    #[test]
    fn gauge_tracks_guards() {
        let gauge = TaskGauge::new();
        assert_eq!(gauge.count(), 0);
        let a = gauge.register();
        let b = gauge.register();
        assert_eq!(gauge.count(), 2);
        drop(a);
        assert_eq!(gauge.count(), 1);
        drop(b);
        assert_eq!(gauge.count(), 0);
    }

    #[test]
    fn cpu_estimate_is_bounded() {
        let gauge = TaskGauge::new();
        let guards: Vec<_> = (0..100_000).map(|_| gauge.register()).collect();
        let sample = take_sample(&gauge);
        assert_eq!(sample.cpu_estimate, 100.0);
        assert_eq!(sample.task_count, guards.len() as u64);
        drop(guards);
    }

    #[tokio::test]
    async fn sampler_produces_history_and_peaks() {
        let gauge = TaskGauge::new();
        let _busy = gauge.register();
        let sampler = SystemSampler::spawn(
            SamplerConfig {
                monitor_interval: Duration::from_millis(10),
                snapshot_retention: 5,
            },
            gauge,
        );

        assert_or_retry(|| sampler.history().len() >= 2).await;
        // Retention bounds the history.
        assert_or_retry(|| sampler.history().len() <= 5).await;
        let latest = sampler.latest().expect("sampler produced no samples");
        assert!(latest.task_count >= 1);
        assert!(sampler.peaks().max_task_count >= 1);

        sampler.stop();
        sampler.stop(); // idempotent
    }

    #[tokio::test]
    async fn stopped_sampler_stops_sampling() {
        let sampler = SystemSampler::spawn(
            SamplerConfig {
                monitor_interval: Duration::from_millis(5),
                snapshot_retention: 100,
            },
            TaskGauge::new(),
        );
        assert_or_retry(|| !sampler.history().is_empty()).await;
        sampler.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let frozen = sampler.history().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sampler.history().len(), frozen);
    }
}
