use std::time::Duration;

use serde::Serialize;
use stampede_core::SystemSample;

use crate::latency::LatencyMetrics;
use crate::operation::OperationMetrics;
use crate::sampler::ResourcePeaks;
use crate::throughput::ThroughputMetrics;

/// Point-in-time copy of every tracker.
///
/// Each component loads its own atomics independently, so the snapshot is
/// consistent-enough rather than a globally atomic cut; presented metrics
/// are advisory and downstream code must not assume cross-component
/// linearizability. Immutable after creation and shares no state with the
/// collector.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Elapsed test time at the moment of the snapshot.
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub operations: OperationMetrics,
    pub latency: LatencyMetrics,
    pub throughput: ThroughputMetrics,
    /// Most recent system sample, if the sampler has produced one yet.
    pub system: Option<SystemSample>,
    pub peaks: ResourcePeaks,
    /// Opaque adapter-supplied payload; only renderers interpret it.
    pub protocol: serde_json::Map<String, serde_json::Value>,
}

/// Serialize a `Duration` as fractional milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_serialize_as_milliseconds() {
        let snapshot = MetricsSnapshot {
            duration: Duration::from_millis(1500),
            operations: OperationMetrics::default(),
            latency: LatencyMetrics::default(),
            throughput: ThroughputMetrics::default(),
            system: None,
            peaks: ResourcePeaks::default(),
            protocol: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["duration"], 1500.0);
        assert_eq!(json["latency"]["p99"], 0.0);
    }
}
