use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use stampede_core::BenchError;
use tracing::info;

use crate::builder::StructuredReport;
use crate::render::{renderer_for, ReportFormat};

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub formats: HashSet<ReportFormat>,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub include_timestamp: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let mut formats = HashSet::new();
        formats.insert(ReportFormat::Console);
        Self {
            formats,
            output_dir: PathBuf::from("."),
            file_prefix: "benchmark_report".to_string(),
            include_timestamp: true,
        }
    }
}

impl ReportConfig {
    /// `<prefix>[_<YYYYMMDD_HHMMSS>].<ext>` inside the output directory.
    pub fn file_path(&self, format: ReportFormat, now: DateTime<Utc>) -> PathBuf {
        let suffix = if self.include_timestamp {
            format!("_{}", now.format("%Y%m%d_%H%M%S"))
        } else {
            String::new()
        };
        self.output_dir
            .join(format!("{}{}.{}", self.file_prefix, suffix, format.extension()))
    }
}

/// Render and deliver the report in every configured format. Console goes
/// to stdout; the rest become files. Returns the paths written.
pub fn emit_reports(
    report: &StructuredReport,
    config: &ReportConfig,
) -> Result<Vec<PathBuf>, BenchError> {
    let now = Utc::now();
    let mut written = Vec::new();

    // Fixed iteration order so multi-format runs emit deterministically.
    for format in ReportFormat::ALL {
        if !config.formats.contains(&format) {
            continue;
        }
        let bytes = renderer_for(format).render(report)?;
        if format == ReportFormat::Console {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| BenchError::Internal(format!("stdout write failed: {e}")))?;
            continue;
        }

        let path = config.file_path(format, now);
        write_file(&path, &bytes)?;
        info!(path = %path.display(), format = format.as_tag(), "report written");
        written.push(path);
    }
    Ok(written)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), BenchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| BenchError::Internal(format!("creating {}: {e}", parent.display())))?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| BenchError::Internal(format!("writing {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests_support::sample_report;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stampede-report-test-{tag}-{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_names_follow_the_scheme() {
        let config = ReportConfig {
            file_prefix: "bench".to_string(),
            include_timestamp: false,
            ..ReportConfig::default()
        };
        let now = Utc::now();
        assert_eq!(
            config.file_path(ReportFormat::Json, now),
            PathBuf::from("./bench.json")
        );

        let stamped = ReportConfig {
            file_prefix: "bench".to_string(),
            include_timestamp: true,
            ..ReportConfig::default()
        };
        let name = stamped
            .file_path(ReportFormat::Csv, now)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("bench_"));
        assert!(name.ends_with(".csv"));
        // bench_YYYYMMDD_HHMMSS.csv
        assert_eq!(name.len(), "bench_".len() + 15 + ".csv".len());
    }

    #[test]
    fn only_selected_formats_are_emitted() {
        let dir = temp_dir("select");
        let mut formats = HashSet::new();
        formats.insert(ReportFormat::Json);
        formats.insert(ReportFormat::Csv);
        let config = ReportConfig {
            formats,
            output_dir: dir.clone(),
            file_prefix: "out".to_string(),
            include_timestamp: false,
        };

        let written = emit_reports(&sample_report(), &config).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.join("out.json").exists());
        assert!(dir.join("out.csv").exists());
        assert!(!dir.join("out.html").exists());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn written_json_is_valid() {
        let dir = temp_dir("json");
        let mut formats = HashSet::new();
        formats.insert(ReportFormat::Json);
        let config = ReportConfig {
            formats,
            output_dir: dir.clone(),
            file_prefix: "report".to_string(),
            include_timestamp: false,
        };

        emit_reports(&sample_report(), &config).unwrap();
        let raw = std::fs::read(dir.join("report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(value["dashboard"].is_object());

        std::fs::remove_dir_all(dir).ok();
    }
}
