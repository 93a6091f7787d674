use stampede_core::BenchError;

use crate::builder::StructuredReport;
use crate::render::{Renderer, ReportFormat};

const HEADER: &str = "session_id,protocol,test_case,run_duration_ms,total,success,failed,\
success_rate,rps,read_rps,write_rps,avg_ms,p50_ms,p90_ms,p95_ms,p99_ms,max_ms,\
performance_score,status";

/// One header row plus one data row per report. Flat by design: CSV output
/// exists to be concatenated across runs and loaded into a spreadsheet.
pub struct CsvRenderer;

impl Renderer for CsvRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Csv
    }

    fn render(&self, report: &StructuredReport) -> Result<Vec<u8>, BenchError> {
        let meta = &report.context_metadata;
        let ops = &report.metrics_breakdown.operations;
        let latency = &report.metrics_breakdown.latency;
        let throughput = &report.metrics_breakdown.throughput;

        let ms = |d: std::time::Duration| format!("{:.3}", d.as_secs_f64() * 1000.0);
        let row = [
            meta.session_id.to_string(),
            csv_escape(&meta.protocol),
            csv_escape(&meta.workload.test_case),
            meta.run_duration_ms.to_string(),
            ops.total.to_string(),
            ops.success.to_string(),
            ops.failed.to_string(),
            format!("{:.2}", ops.success_rate),
            format!("{:.2}", throughput.rps),
            format!("{:.2}", throughput.read_rps),
            format!("{:.2}", throughput.write_rps),
            ms(latency.avg),
            ms(latency.p50),
            ms(latency.p90),
            ms(latency.p95),
            ms(latency.p99),
            ms(latency.max),
            format!("{:.1}", report.dashboard.performance_score),
            report.dashboard.status.as_tag().to_string(),
        ]
        .join(",");

        Ok(format!("{HEADER}\n{row}\n").into_bytes())
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests_support::sample_report;

    #[test]
    fn one_header_one_row() {
        let bytes = CsvRenderer.render(&sample_report()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.trim_end().lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].split(',').count(),
            lines[1].split(',').count(),
            "header and row column counts differ"
        );
        assert!(lines[1].contains("tcp"));
        assert!(lines[1].contains("1000"));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
