use chrono::{DateTime, Utc};
use health::{HealthReport, HealthThresholds};
use serde::Serialize;
use stampede_core::{SystemSample, WorkloadConfig};
use stampede_metrics::{
    LatencyMetrics, MetricsSnapshot, OperationMetrics, ThroughputMetrics,
};
use uuid::Uuid;

/// Everything the report needs beyond the snapshot itself: identity,
/// wall-clock, and the operator's configuration echo.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub protocol: String,
    pub test_case: String,
    pub workload: WorkloadConfig,
    pub thresholds: HealthThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Good,
    Warning,
    Critical,
}

impl StatusLevel {
    pub fn as_tag(&self) -> &'static str {
        match self {
            StatusLevel::Good => "good",
            StatusLevel::Warning => "warning",
            StatusLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Heuristic score in [0, 100] over success rate, latency, and RPS.
    pub performance_score: f64,
    pub status: StatusLevel,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsBreakdown {
    pub operations: OperationMetrics,
    pub latency: LatencyMetrics,
    pub throughput: ThroughputMetrics,
    /// Adapter-supplied payload, passed through untouched.
    pub protocol: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryProfile {
    pub allocated_bytes: u64,
    pub resident_bytes: u64,
    pub peak_resident_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    pub memory: MemoryProfile,
    pub runtime: HealthReport,
    pub peak_task_count: u64,
    pub latest_sample: Option<SystemSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadSummary {
    pub total: u64,
    pub parallels: usize,
    pub data_size: usize,
    pub duration_ms: u64,
    pub read_percent: u8,
    pub test_case: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub os: &'static str,
    pub arch: &'static str,
    pub cores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMetadata {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub protocol: String,
    pub workload: WorkloadSummary,
    pub environment: Environment,
    /// Elapsed test time the snapshot covers, milliseconds.
    pub run_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredReport {
    pub dashboard: Dashboard,
    pub metrics_breakdown: MetricsBreakdown,
    pub system_health: SystemHealth,
    pub context_metadata: ContextMetadata,
}

/// Transform a snapshot into a report. Pure: equal inputs give equal
/// reports (the wall-clock fields come in via the context).
pub fn build_report(snapshot: &MetricsSnapshot, context: &ReportContext) -> StructuredReport {
    let operations = snapshot.operations;
    let latency = snapshot.latency;
    let throughput = snapshot.throughput;

    let score = performance_score(&operations, &latency, &throughput);
    let status = status_level(&operations, &latency);

    let runtime = match &snapshot.system {
        Some(sample) => health::evaluate(sample, &context.thresholds),
        None => health::evaluate(&SystemSample::default(), &context.thresholds),
    };

    StructuredReport {
        dashboard: Dashboard {
            performance_score: score,
            status,
            insights: insights(&operations, &latency, &throughput),
            recommendations: recommendations(&operations, &latency, score),
        },
        metrics_breakdown: MetricsBreakdown {
            operations,
            latency,
            throughput,
            protocol: snapshot.protocol.clone(),
        },
        system_health: SystemHealth {
            memory: MemoryProfile {
                allocated_bytes: snapshot.system.map_or(0, |s| s.allocated_bytes),
                resident_bytes: snapshot.system.map_or(0, |s| s.resident_bytes),
                peak_resident_bytes: snapshot.peaks.max_resident_bytes,
            },
            runtime,
            peak_task_count: snapshot.peaks.max_task_count,
            latest_sample: snapshot.system,
        },
        context_metadata: ContextMetadata {
            session_id: context.session_id,
            generated_at: context.generated_at,
            protocol: context.protocol.clone(),
            workload: WorkloadSummary {
                total: context.workload.total,
                parallels: context.workload.parallels,
                data_size: context.workload.data_size,
                duration_ms: context.workload.duration.as_millis() as u64,
                read_percent: context.workload.read_percent,
                test_case: context.test_case.clone(),
            },
            environment: Environment {
                os: std::env::consts::OS,
                arch: std::env::consts::ARCH,
                cores: num_cpus::get(),
            },
            run_duration_ms: snapshot.duration.as_millis() as u64,
        },
    }
}

/// Score = 50% success rate, 30% latency, 20% throughput, clamped.
///
/// The latency term decays smoothly: full marks at instant responses, half
/// at 100ms average. The throughput term saturates at 10k ops/s.
fn performance_score(
    operations: &OperationMetrics,
    latency: &LatencyMetrics,
    throughput: &ThroughputMetrics,
) -> f64 {
    if operations.total == 0 {
        return 0.0;
    }
    let avg_ms = latency.avg.as_secs_f64() * 1000.0;
    let latency_term = 100.0 / (1.0 + avg_ms / 100.0);
    let throughput_term = if throughput.rps <= 1.0 {
        0.0
    } else {
        (throughput.rps.log10() * 25.0).min(100.0)
    };
    (operations.success_rate * 0.5 + latency_term * 0.3 + throughput_term * 0.2)
        .clamp(0.0, 100.0)
}

fn status_level(operations: &OperationMetrics, latency: &LatencyMetrics) -> StatusLevel {
    let error_rate = 100.0 - operations.success_rate;
    let avg_ms = latency.avg.as_secs_f64() * 1000.0;
    if operations.total == 0 {
        StatusLevel::Warning
    } else if error_rate > 10.0 || avg_ms > 1000.0 {
        StatusLevel::Critical
    } else if error_rate > 1.0 || avg_ms > 500.0 {
        StatusLevel::Warning
    } else {
        StatusLevel::Good
    }
}

fn insights(
    operations: &OperationMetrics,
    latency: &LatencyMetrics,
    throughput: &ThroughputMetrics,
) -> Vec<String> {
    let mut out = Vec::new();
    if operations.total == 0 {
        out.push("no operations were recorded".to_string());
        return out;
    }
    out.push(format!(
        "{} operations completed at {:.1} ops/s ({:.2}% success)",
        operations.total, throughput.rps, operations.success_rate
    ));
    if latency.p50 > std::time::Duration::ZERO && latency.p99 >= latency.p50 * 10 {
        out.push(format!(
            "long tail: p99 ({:.1}ms) is more than 10x the median ({:.1}ms)",
            latency.p99.as_secs_f64() * 1000.0,
            latency.p50.as_secs_f64() * 1000.0
        ));
    }
    if operations.failed > 0 {
        out.push(format!(
            "{} operations failed ({:.2}% error rate)",
            operations.failed,
            100.0 - operations.success_rate
        ));
    }
    out
}

fn recommendations(
    operations: &OperationMetrics,
    latency: &LatencyMetrics,
    score: f64,
) -> Vec<String> {
    let mut out = Vec::new();
    if operations.total == 0 {
        return out;
    }
    if operations.success_rate < 95.0 {
        out.push(
            "success rate is below 95%: inspect the error breakdown before trusting latency numbers"
                .to_string(),
        );
    }
    if latency.avg.as_millis() > 500 {
        out.push(
            "average latency exceeds 500ms: lower parallelism or raise operation timeouts"
                .to_string(),
        );
    }
    if score >= 90.0 {
        out.push("target has headroom: consider increasing parallels or total".to_string());
    }
    out
}

/// Shared fixtures for renderer tests.
#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use std::time::Duration;
    use stampede_metrics::{LatencyDistribution, ResourcePeaks};

    pub(crate) fn sample_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            duration: Duration::from_secs(10),
            operations: OperationMetrics {
                total: 1000,
                success: 990,
                failed: 10,
                read: 300,
                write: 700,
                success_rate: 99.0,
            },
            latency: LatencyMetrics {
                count: 1000,
                min: Duration::from_millis(1),
                max: Duration::from_millis(120),
                avg: Duration::from_millis(12),
                std_dev: Duration::from_millis(4),
                p50: Duration::from_millis(10),
                p90: Duration::from_millis(25),
                p95: Duration::from_millis(40),
                p99: Duration::from_millis(90),
                p999: Duration::from_millis(120),
                distribution: LatencyDistribution {
                    buckets: [10, 90, 400, 450, 40, 10, 0, 0],
                },
            },
            throughput: ThroughputMetrics {
                read_count: 300,
                write_count: 700,
                rps: 100.0,
                read_rps: 30.0,
                write_rps: 70.0,
                current_rate: 95.0,
            },
            system: Some(SystemSample {
                allocated_bytes: 12 * 1024 * 1024,
                resident_bytes: 48 * 1024 * 1024,
                task_count: 11,
                cpu_estimate: 13.75,
                ..SystemSample::default()
            }),
            peaks: ResourcePeaks {
                max_resident_bytes: 64 * 1024 * 1024,
                max_task_count: 12,
            },
            protocol: serde_json::json!({"connections": 8})
                .as_object()
                .unwrap()
                .clone(),
        }
    }

    pub(crate) fn sample_context() -> ReportContext {
        ReportContext {
            session_id: Uuid::nil(),
            generated_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            protocol: "tcp".to_string(),
            test_case: "echo_test".to_string(),
            workload: WorkloadConfig::default(),
            thresholds: HealthThresholds::default(),
        }
    }

    pub(crate) fn sample_report() -> StructuredReport {
        build_report(&sample_snapshot(), &sample_context())
    }
}
