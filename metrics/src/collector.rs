use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use stampede_core::OperationResult;

use crate::latency::LatencyTracker;
use crate::operation::OperationTracker;
use crate::sampler::{SamplerConfig, SystemSampler, TaskGauge};
use crate::snapshot::MetricsSnapshot;
use crate::throughput::ThroughputTracker;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Latency ring capacity.
    pub history_size: usize,
    /// Probability that a latency sample is recorded; 1.0 records all.
    pub sampling_rate: f64,
    /// How often percentiles are recomputed from the ring.
    pub compute_interval: Duration,
    pub window_size: Duration,
    pub bucket_size: Duration,
    pub sampler: SamplerConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            history_size: 10_000,
            sampling_rate: 1.0,
            compute_interval: Duration::from_secs(1),
            window_size: Duration::from_secs(10),
            bucket_size: Duration::from_secs(1),
            sampler: SamplerConfig::default(),
        }
    }
}

/// Composes all trackers behind the one `record` call the engine's result
/// sink makes per operation.
///
/// Records arrive serialized through that sink, so per-tracker atomics are
/// all the synchronization the write path needs. Must be constructed inside
/// a tokio runtime (it spawns the background system sampler).
pub struct MetricsCollector {
    operations: OperationTracker,
    latency: LatencyTracker,
    throughput: ThroughputTracker,
    sampler: SystemSampler,
    gauge: TaskGauge,
    protocol: Mutex<serde_json::Map<String, serde_json::Value>>,
    started_at: Mutex<Instant>,
    stopped: AtomicBool,
}

impl MetricsCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let gauge = TaskGauge::new();
        let sampler = SystemSampler::spawn(config.sampler.clone(), gauge.clone());
        Self {
            operations: OperationTracker::new(),
            latency: LatencyTracker::new(
                config.history_size,
                config.sampling_rate,
                config.compute_interval,
            ),
            throughput: ThroughputTracker::new(config.window_size, config.bucket_size),
            sampler,
            gauge,
            protocol: Mutex::new(serde_json::Map::new()),
            started_at: Mutex::new(Instant::now()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Gauge handle for the engine to register its tasks on.
    pub fn task_gauge(&self) -> TaskGauge {
        self.gauge.clone()
    }

    /// Record one finished operation. No-op once the collector is stopped.
    pub fn record(&self, result: &OperationResult) {
        if self.stopped.load(Ordering::Relaxed) {
            return;
        }
        self.operations.record(result);
        self.latency.record(result.duration);
        self.throughput.record(result.is_read);

        let status = if result.success { "ok" } else { "error" };
        metrics::counter!("bench_operations_total", &[("status", status)]).increment(1);
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.lock().expect("poisoned start time").elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed = self.elapsed();
        MetricsSnapshot {
            duration: elapsed,
            operations: self.operations.snapshot(),
            latency: self.latency.snapshot(),
            throughput: self.throughput.snapshot(elapsed),
            system: self.sampler.latest(),
            peaks: self.sampler.peaks(),
            protocol: self.protocol.lock().expect("poisoned protocol metrics").clone(),
        }
    }

    /// Zero all trackers and restart the clock. The system sampler keeps
    /// running; its history describes the process, not one run.
    pub fn reset(&self) {
        self.operations.reset();
        self.latency.reset();
        self.throughput.reset();
        self.protocol
            .lock()
            .expect("poisoned protocol metrics")
            .clear();
        *self.started_at.lock().expect("poisoned start time") = Instant::now();
    }

    /// Replace the adapter-supplied protocol payload wholesale.
    pub fn update_protocol_metrics(&self, m: serde_json::Map<String, serde_json::Value>) {
        *self.protocol.lock().expect("poisoned protocol metrics") = m;
    }

    /// Stop background sampling and turn `record` into a no-op. Idempotent.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.sampler.stop();
    }
}
