use std::fmt::Write;

use stampede_core::BenchError;
use stampede_metrics::DISTRIBUTION_LABELS;

use crate::builder::StructuredReport;
use crate::render::{Renderer, ReportFormat};

/// Single self-contained HTML page, no external assets.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn render(&self, report: &StructuredReport) -> Result<Vec<u8>, BenchError> {
        let meta = &report.context_metadata;
        let ops = &report.metrics_breakdown.operations;
        let latency = &report.metrics_breakdown.latency;
        let throughput = &report.metrics_breakdown.throughput;
        let ms = |d: std::time::Duration| format!("{:.2}", d.as_secs_f64() * 1000.0);

        let mut distribution_rows = String::new();
        for (label, count) in DISTRIBUTION_LABELS
            .iter()
            .zip(latency.distribution.buckets.iter())
        {
            writeln!(
                distribution_rows,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(label),
                count
            )
            .ok();
        }

        let mut insight_items = String::new();
        for insight in &report.dashboard.insights {
            writeln!(insight_items, "<li>{}</li>", escape(insight)).ok();
        }
        for rec in &report.dashboard.recommendations {
            writeln!(insight_items, "<li><em>{}</em></li>", escape(rec)).ok();
        }

        let page = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>stampede report {session}</title>
<style>
body {{ font-family: monospace; margin: 2em; background: #fafafa; color: #222; }}
h1 {{ border-bottom: 2px solid #222; padding-bottom: 0.3em; }}
table {{ border-collapse: collapse; margin: 1em 0; }}
td, th {{ border: 1px solid #999; padding: 0.3em 0.8em; text-align: left; }}
.status-good {{ color: #1a7f37; }} .status-warning {{ color: #9a6700; }} .status-critical {{ color: #cf222e; }}
</style>
</head>
<body>
<h1>stampede benchmark report</h1>
<p>protocol <strong>{protocol}</strong> &middot; test case <strong>{test_case}</strong>
&middot; session {session} &middot; generated {generated}</p>
<h2>Dashboard</h2>
<p class="status-{status}">status: {status} &middot; performance score {score:.1}/100</p>
<ul>
{insights}</ul>
<h2>Operations</h2>
<table>
<tr><th>total</th><th>success</th><th>failed</th><th>success rate</th><th>ops/s</th><th>read ops/s</th><th>write ops/s</th></tr>
<tr><td>{total}</td><td>{success}</td><td>{failed}</td><td>{rate:.2}%</td><td>{rps:.1}</td><td>{read_rps:.1}</td><td>{write_rps:.1}</td></tr>
</table>
<h2>Latency (ms)</h2>
<table>
<tr><th>min</th><th>avg</th><th>max</th><th>p50</th><th>p90</th><th>p95</th><th>p99</th><th>p99.9</th></tr>
<tr><td>{min}</td><td>{avg}</td><td>{max}</td><td>{p50}</td><td>{p90}</td><td>{p95}</td><td>{p99}</td><td>{p999}</td></tr>
</table>
<h3>Distribution</h3>
<table>
<tr><th>bucket</th><th>count</th></tr>
{distribution}</table>
<h2>System</h2>
<p>heap allocated {alloc} bytes &middot; resident {resident} bytes &middot; peak resident {peak} bytes
&middot; peak tasks {tasks} &middot; runtime health {health}</p>
</body>
</html>
"#,
            session = meta.session_id,
            protocol = escape(&meta.protocol),
            test_case = escape(&meta.workload.test_case),
            generated = meta.generated_at,
            status = report.dashboard.status.as_tag(),
            score = report.dashboard.performance_score,
            insights = insight_items,
            total = ops.total,
            success = ops.success,
            failed = ops.failed,
            rate = ops.success_rate,
            rps = throughput.rps,
            read_rps = throughput.read_rps,
            write_rps = throughput.write_rps,
            min = ms(latency.min),
            avg = ms(latency.avg),
            max = ms(latency.max),
            p50 = ms(latency.p50),
            p90 = ms(latency.p90),
            p95 = ms(latency.p95),
            p99 = ms(latency.p99),
            p999 = ms(latency.p999),
            distribution = distribution_rows,
            alloc = report.system_health.memory.allocated_bytes,
            resident = report.system_health.memory.resident_bytes,
            peak = report.system_health.memory.peak_resident_bytes,
            tasks = report.system_health.peak_task_count,
            health = report.system_health.runtime.overall.as_tag(),
        );
        Ok(page.into_bytes())
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests_support::sample_report;

    #[test]
    fn page_contains_core_figures() {
        let bytes = HtmlRenderer.render(&sample_report()).unwrap();
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Operations</h2>"));
        assert!(html.contains("<td>1000</td>"));
        assert!(html.contains("tcp"));
        assert!(html.contains("echo_test"));
    }

    #[test]
    fn markup_in_strings_is_escaped() {
        assert_eq!(escape("<script>"), "&lt;script&gt;");
        assert_eq!(escape("a&b"), "a&amp;b");
    }
}
