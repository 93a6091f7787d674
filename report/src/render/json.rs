use stampede_core::BenchError;

use crate::builder::StructuredReport;
use crate::render::{Renderer, ReportFormat};

/// Pretty-printed JSON of the whole report.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn render(&self, report: &StructuredReport) -> Result<Vec<u8>, BenchError> {
        serde_json::to_vec_pretty(report)
            .map_err(|e| BenchError::Internal(format!("report serialization failed: {e}")))
    }
}
