use stampede_core::BenchError;

use crate::builder::StructuredReport;

pub mod console;
pub mod csv;
pub mod html;
pub mod json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    Console,
    Json,
    Csv,
    Html,
}

impl ReportFormat {
    /// All formats, in emission order.
    pub const ALL: [ReportFormat; 4] = [
        ReportFormat::Console,
        ReportFormat::Json,
        ReportFormat::Csv,
        ReportFormat::Html,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Console => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ReportFormat::Console => "console",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "console" => Ok(ReportFormat::Console),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            "html" => Ok(ReportFormat::Html),
            _ => Err(format!("Unknown report format: {s}")),
        }
    }
}

/// One renderer per output format. Renderers never mutate the report; they
/// turn it into bytes and leave destinations to the emitter.
pub trait Renderer: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn render(&self, report: &StructuredReport) -> Result<Vec<u8>, BenchError>;
}

pub fn renderer_for(format: ReportFormat) -> Box<dyn Renderer> {
    match format {
        ReportFormat::Console => Box::new(console::ConsoleRenderer),
        ReportFormat::Json => Box::new(json::JsonRenderer),
        ReportFormat::Csv => Box::new(csv::CsvRenderer),
        ReportFormat::Html => Box::new(html::HtmlRenderer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_str() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!(
            "Console".parse::<ReportFormat>().unwrap(),
            ReportFormat::Console
        );
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn every_format_has_a_renderer() {
        for format in ReportFormat::ALL {
            assert_eq!(renderer_for(format).format(), format);
        }
    }
}
