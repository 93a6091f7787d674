use std::time::SystemTime;

use serde::Serialize;

/// One periodic reading of process runtime state.
///
/// Produced by the metrics collector's background sampler and consumed by
/// the health checker and the report pipeline. The GC fields exist for
/// report-shape compatibility with collected runtimes and read zero here;
/// allocator pressure shows up in the jemalloc byte counters instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemSample {
    #[serde(with = "epoch_secs")]
    pub sampled_at: SystemTime,
    pub allocated_bytes: u64,
    pub resident_bytes: u64,
    pub gc_count: u64,
    pub gc_pause_total_ns: u64,
    /// Cooperative tasks alive in the harness (workers, dispatcher, sink).
    pub task_count: u64,
    /// Coarse estimate in [0, 100]; not a true per-process CPU reading.
    pub cpu_estimate: f64,
}

impl Default for SystemSample {
    fn default() -> Self {
        Self {
            sampled_at: SystemTime::UNIX_EPOCH,
            allocated_bytes: 0,
            resident_bytes: 0,
            gc_count: 0,
            gc_pause_total_ns: 0,
            task_count: 0,
            cpu_estimate: 0.0,
        }
    }
}

mod epoch_secs {
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde::Serializer;

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        s.serialize_u64(secs)
    }
}
