use std::fmt::Write;

use stampede_core::BenchError;
use stampede_metrics::DISTRIBUTION_LABELS;

use crate::builder::StructuredReport;
use crate::render::{Renderer, ReportFormat};

const BANNER: &str = "==============================================================";

/// Fixed banner-and-sections text layout for terminals.
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Console
    }

    fn render(&self, report: &StructuredReport) -> Result<Vec<u8>, BenchError> {
        let mut out = String::with_capacity(2048);
        let meta = &report.context_metadata;
        let ops = &report.metrics_breakdown.operations;
        let latency = &report.metrics_breakdown.latency;
        let throughput = &report.metrics_breakdown.throughput;

        writeln!(out, "{BANNER}").ok();
        writeln!(
            out,
            "  STAMPEDE BENCHMARK REPORT  [{}] {}",
            meta.protocol, meta.workload.test_case
        )
        .ok();
        writeln!(out, "  session {}  generated {}", meta.session_id, meta.generated_at).ok();
        writeln!(out, "{BANNER}").ok();

        writeln!(out, "\n-- Dashboard").ok();
        writeln!(
            out,
            "  status: {}    performance score: {:.1}/100",
            report.dashboard.status.as_tag(),
            report.dashboard.performance_score
        )
        .ok();
        for insight in &report.dashboard.insights {
            writeln!(out, "  * {insight}").ok();
        }
        for rec in &report.dashboard.recommendations {
            writeln!(out, "  > {rec}").ok();
        }

        writeln!(out, "\n-- Operations").ok();
        writeln!(
            out,
            "  total: {}  success: {}  failed: {}  ({:.2}% success)",
            ops.total, ops.success, ops.failed, ops.success_rate
        )
        .ok();
        writeln!(
            out,
            "  reads: {}  writes: {}  ({} ops/s read, {} ops/s write)",
            ops.read,
            ops.write,
            format_rate(throughput.read_rps),
            format_rate(throughput.write_rps)
        )
        .ok();
        writeln!(out, "  throughput: {} ops/s", format_rate(throughput.rps)).ok();

        writeln!(out, "\n-- Latency").ok();
        writeln!(
            out,
            "  min/avg/max: {} / {} / {}   stddev: {}",
            format_ms(latency.min),
            format_ms(latency.avg),
            format_ms(latency.max),
            format_ms(latency.std_dev)
        )
        .ok();
        writeln!(
            out,
            "  p50: {}  p90: {}  p95: {}  p99: {}  p99.9: {}",
            format_ms(latency.p50),
            format_ms(latency.p90),
            format_ms(latency.p95),
            format_ms(latency.p99),
            format_ms(latency.p999)
        )
        .ok();
        writeln!(out, "  distribution:").ok();
        for (label, count) in DISTRIBUTION_LABELS
            .iter()
            .zip(latency.distribution.buckets.iter())
        {
            writeln!(out, "    {label:>8}  {count}").ok();
        }

        writeln!(out, "\n-- System").ok();
        let memory = &report.system_health.memory;
        writeln!(
            out,
            "  heap allocated: {}  resident: {}  peak resident: {}",
            format_bytes(memory.allocated_bytes),
            format_bytes(memory.resident_bytes),
            format_bytes(memory.peak_resident_bytes)
        )
        .ok();
        writeln!(
            out,
            "  runtime health: {}  peak tasks: {}",
            report.system_health.runtime.overall.as_tag(),
            report.system_health.peak_task_count
        )
        .ok();
        for issue in &report.system_health.runtime.issues {
            writeln!(
                out,
                "    {:?}: {:.0} over threshold {:.0} ({})",
                issue.kind,
                issue.current,
                issue.threshold,
                issue.severity.as_tag()
            )
            .ok();
        }

        if !report.metrics_breakdown.protocol.is_empty() {
            writeln!(out, "\n-- Protocol").ok();
            for (key, value) in &report.metrics_breakdown.protocol {
                writeln!(out, "  {key}: {value}").ok();
            }
        }

        writeln!(out, "\n{BANNER}").ok();
        Ok(out.into_bytes())
    }
}

fn format_ms(d: std::time::Duration) -> String {
    format!("{:.2}ms", d.as_secs_f64() * 1000.0)
}

fn format_rate(rate: f64) -> String {
    format!("{rate:.1}")
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1}{}", UNITS[unit])
}
