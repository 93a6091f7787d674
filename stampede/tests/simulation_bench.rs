//! Duration-bounded runs against the simulation adapter, plus the full
//! snapshot-to-report-files pipeline.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use health::HealthThresholds;
use stampede::adapters::simulation::SimulationAdapter;
use stampede::factory::DefaultOperationFactory;
use stampede_core::{Protocol, ProtocolAdapter, WorkloadConfig};
use stampede_engine::BenchmarkEngine;
use stampede_metrics::{CollectorConfig, MetricsCollector};
use stampede_report::{build_report, emit_reports, ReportConfig, ReportContext, ReportFormat};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn collector() -> Arc<MetricsCollector> {
    Arc::new(MetricsCollector::new(CollectorConfig {
        compute_interval: Duration::ZERO,
        ..CollectorConfig::default()
    }))
}

#[tokio::test]
async fn duration_bounded_simulation_run() {
    // 90% success, 50-200ms latency, 4 workers for 2 seconds. Expected
    // completions sit between 4 * 2s / 200ms = 40 and 4 * 2s / 50ms = 160,
    // with ~64 at the average 125ms per op.
    let adapter = Arc::new(SimulationAdapter::new(
        0.9,
        Duration::from_millis(50),
        Duration::from_millis(200),
    ));
    let collector = collector();
    let workload = WorkloadConfig {
        total: 0,
        duration: Duration::from_secs(2),
        parallels: 4,
        test_case: "set_get_random".to_string(),
        ..WorkloadConfig::default()
    };
    let engine = BenchmarkEngine::new(
        adapter,
        Arc::new(DefaultOperationFactory::new(Protocol::Simulation)),
        collector.clone(),
        workload,
    );

    let summary = engine.run(&CancellationToken::new()).await;

    assert!(
        (24..=180).contains(&summary.completed_jobs),
        "completed: {}",
        summary.completed_jobs
    );
    let success_rate =
        summary.success_jobs as f64 / summary.completed_jobs.max(1) as f64 * 100.0;
    assert!(
        (80.0..=98.0).contains(&success_rate),
        "success rate: {success_rate:.1}%"
    );

    let snapshot = collector.snapshot();
    assert!(snapshot.latency.min >= Duration::from_millis(50));
    assert!(snapshot.latency.max <= Duration::from_millis(250));
    collector.stop();
}

#[tokio::test]
async fn snapshot_to_report_files() {
    let adapter = Arc::new(SimulationAdapter::instant());
    let collector = collector();
    let workload = WorkloadConfig {
        total: 500,
        parallels: 4,
        test_case: "set_get_random".to_string(),
        ..WorkloadConfig::default()
    };
    let engine = BenchmarkEngine::new(
        adapter.clone(),
        Arc::new(DefaultOperationFactory::new(Protocol::Simulation)),
        collector.clone(),
        workload.clone(),
    );
    let summary = engine.run(&CancellationToken::new()).await;
    assert_eq!(summary.completed_jobs, 500);

    collector.update_protocol_metrics(adapter.protocol_metrics());
    let snapshot = collector.snapshot();
    collector.stop();

    let context = ReportContext {
        session_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        protocol: "simulation".to_string(),
        test_case: workload.test_case.clone(),
        workload,
        thresholds: HealthThresholds::default(),
    };
    let report = build_report(&snapshot, &context);
    assert_eq!(report.metrics_breakdown.operations.total, 500);
    assert_eq!(report.metrics_breakdown.protocol["executed"], 500);

    let dir = std::env::temp_dir().join(format!("stampede-e2e-{}", Uuid::new_v4()));
    let mut formats = HashSet::new();
    formats.insert(ReportFormat::Json);
    formats.insert(ReportFormat::Csv);
    formats.insert(ReportFormat::Html);
    let written = emit_reports(
        &report,
        &ReportConfig {
            formats,
            output_dir: dir.clone(),
            file_prefix: "run".to_string(),
            include_timestamp: false,
        },
    )
    .unwrap();

    let paths: HashSet<PathBuf> = written.into_iter().collect();
    assert_eq!(paths.len(), 3);
    for ext in ["json", "csv", "html"] {
        assert!(dir.join(format!("run.{ext}")).exists(), "missing .{ext}");
    }

    std::fs::remove_dir_all(dir).ok();
}
