//! Concurrent metrics collection for benchmark runs.
//!
//! The hot path is `MetricsCollector::record`, called once per completed
//! operation by the engine's result sink. Everything it touches is either
//! an atomic counter or a briefly-held mutex; the expensive work (sorting
//! for percentiles) is deferred and amortized behind a compute interval.
//!
//! A background sampler task periodically captures runtime state (allocator
//! bytes, live task count) into a bounded history so that reports can show
//! resource consumption over the run, not just at the end.

pub mod collector;
pub mod latency;
pub mod operation;
pub mod ring;
pub mod sampler;
pub mod snapshot;
pub mod throughput;
pub mod window;

pub use collector::{CollectorConfig, MetricsCollector};
pub use latency::{LatencyDistribution, LatencyMetrics, LatencyTracker, DISTRIBUTION_LABELS};
pub use operation::{OperationMetrics, OperationTracker};
pub use ring::RingBuffer;
pub use sampler::{ResourcePeaks, SamplerConfig, SystemSampler, TaskGauge};
pub use snapshot::MetricsSnapshot;
pub use throughput::{ThroughputMetrics, ThroughputTracker};
pub use window::TimeWindow;
