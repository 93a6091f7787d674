use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use envconfig::Envconfig;
use health::HealthThresholds;
use stampede::adapters::build_adapter;
use stampede::config::Config;
use stampede::factory::DefaultOperationFactory;
use stampede_engine::BenchmarkEngine;
use stampede_metrics::{CollectorConfig, MetricsCollector};
use stampede_report::{build_report, emit_reports, ReportContext};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

common_alloc::used!();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::init_from_env().context("invalid configuration")?;
    let bench = config.bench_config();
    bench.validate().context("invalid configuration")?;
    let report_config = config
        .report_config()
        .map_err(|e| anyhow::anyhow!("invalid report configuration: {e}"))?;

    let adapter = build_adapter(&config, &bench).context("building adapter")?;
    adapter
        .connect(&bench)
        .await
        .with_context(|| format!("connecting to {} target", adapter.protocol_name()))?;

    let collector = Arc::new(MetricsCollector::new(CollectorConfig::default()));
    let factory = Arc::new(DefaultOperationFactory::new(bench.protocol));
    let engine = BenchmarkEngine::new(
        adapter.clone(),
        factory,
        collector.clone(),
        bench.workload.clone(),
    );

    // Ctrl-C cancels the run; the engine still drains and reports.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, winding the run down");
            interrupt.cancel();
        }
    });

    let summary = engine.run(&cancel).await;

    collector.update_protocol_metrics(adapter.protocol_metrics());
    let snapshot = collector.snapshot();
    collector.stop();
    if let Err(e) = adapter.close().await {
        warn!("adapter close failed: {e}");
    }

    let context = ReportContext {
        session_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        protocol: bench.protocol.as_tag().to_string(),
        test_case: bench.workload.test_case.clone(),
        workload: bench.workload.clone(),
        thresholds: HealthThresholds::default(),
    };
    let report = build_report(&snapshot, &context);
    let written = emit_reports(&report, &report_config).context("emitting reports")?;
    for path in &written {
        info!(path = %path.display(), "report file written");
    }

    info!(
        dispatched = summary.total_jobs,
        completed = summary.completed_jobs,
        success = summary.success_jobs,
        failed = summary.failed_jobs,
        "done"
    );
    // Per-operation failures are data, not an error exit; only
    // configuration and connection problems fail the process.
    Ok(())
}
