//! Workload execution engine.
//!
//! One dispatcher task feeds a bounded MPMC job channel from the operation
//! factory; `parallels` worker tasks race to pull jobs, drive them through
//! the adapter, and push results into a bounded mpsc channel; a single sink
//! task drains results into the metrics collector and the run summary.
//!
//! Shutdown ordering is load-bearing and always the same, whether the run
//! ends naturally, by duration timeout, or by cancellation:
//! the dispatcher finishes and drops its sender (closing the job channel),
//! workers drain what remains and exit, the coordinator joins all workers
//! (closing the result channel by dropping the last sender), the sink
//! drains and exits, and only then does `run` return. No task outlives the
//! call and no channel is touched after close.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use stampede_core::{BenchError, Operation, OperationFactory, OperationResult, ProtocolAdapter, WorkloadConfig};
use stampede_metrics::MetricsCollector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one benchmark run did, in aggregate.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExecutionSummary {
    /// Jobs handed to the job channel by the dispatcher.
    pub total_jobs: u64,
    /// Jobs whose result reached the sink.
    pub completed_jobs: u64,
    pub success_jobs: u64,
    pub failed_jobs: u64,
    /// Completions per operation kind.
    pub per_kind: HashMap<String, u64>,
    pub total_duration: Duration,
}

struct JobOutcome {
    kind: String,
    result: OperationResult,
}

/// Drives a workload through one adapter with bounded concurrency.
///
/// Adapter and factory are resolved once at construction; workers pay one
/// dynamic call per operation and never consult any registry.
pub struct BenchmarkEngine {
    adapter: Arc<dyn ProtocolAdapter>,
    factory: Arc<dyn OperationFactory>,
    collector: Arc<MetricsCollector>,
    workload: WorkloadConfig,
}

impl BenchmarkEngine {
    pub fn new(
        adapter: Arc<dyn ProtocolAdapter>,
        factory: Arc<dyn OperationFactory>,
        collector: Arc<MetricsCollector>,
        workload: WorkloadConfig,
    ) -> Self {
        Self {
            adapter,
            factory,
            collector,
            workload,
        }
    }

    /// Run the workload to completion (count reached, duration elapsed, or
    /// `cancel` fired) and return the summary.
    pub async fn run(&self, cancel: &CancellationToken) -> ExecutionSummary {
        let start = Instant::now();
        let workload = self.workload.clone();
        info!(
            total = workload.total,
            parallels = workload.parallels,
            duration_ms = workload.duration.as_millis() as u64,
            "starting benchmark run"
        );

        // Everything in this run hangs off a child token so a duration
        // timeout never cancels the caller's context.
        let run_cancel = cancel.child_token();
        let timer = if workload.duration.is_zero() {
            None
        } else {
            let token = run_cancel.clone();
            let duration = workload.duration;
            Some(tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(duration) => {
                        debug!("duration bound reached, cancelling run");
                        token.cancel();
                    }
                }
            }))
        };

        let (job_tx, job_rx) = flume::bounded::<Operation>(workload.job_buffer_size.max(1));
        let (result_tx, result_rx) =
            tokio::sync::mpsc::channel::<JobOutcome>(workload.result_buffer_size.max(1));

        let gauge = self.collector.task_gauge();
        let dispatched = Arc::new(AtomicU64::new(0));

        let dispatcher = {
            let factory = self.factory.clone();
            let cancel = run_cancel.clone();
            let dispatched = dispatched.clone();
            let workload = workload.clone();
            let guard = gauge.register();
            tokio::spawn(async move {
                let _guard = guard;
                dispatch_jobs(factory, &workload, job_tx, cancel, dispatched).await;
            })
        };

        let mut workers = Vec::with_capacity(workload.parallels);
        for index in 0..workload.parallels {
            let adapter = self.adapter.clone();
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = run_cancel.clone();
            let guard = gauge.register();
            let ramp_delay = ramp_delay(&workload, index);
            workers.push(tokio::spawn(async move {
                let _guard = guard;
                worker_loop(index, adapter, job_rx, result_tx, cancel, ramp_delay).await;
            }));
        }
        // The engine's own receiver/sender clones must go away so channel
        // closure tracks the tasks alone.
        drop(job_rx);
        drop(result_tx);

        let sink = {
            let collector = self.collector.clone();
            let guard = gauge.register();
            tokio::spawn(async move {
                let _guard = guard;
                sink_results(result_rx, collector).await
            })
        };

        // Shutdown ordering: dispatcher, then workers, then sink.
        if dispatcher.await.is_err() {
            warn!("dispatcher task panicked");
        }
        for joined in join_all(workers).await {
            if joined.is_err() {
                warn!("worker task panicked");
            }
        }
        let totals = match sink.await {
            Ok(totals) => totals,
            Err(_) => {
                warn!("result sink task panicked");
                SinkTotals::default()
            }
        };

        run_cancel.cancel();
        if let Some(timer) = timer {
            timer.await.ok();
        }

        let summary = ExecutionSummary {
            total_jobs: dispatched.load(Ordering::Relaxed),
            completed_jobs: totals.completed,
            success_jobs: totals.success,
            failed_jobs: totals.failed,
            per_kind: totals.per_kind,
            total_duration: start.elapsed(),
        };
        info!(
            completed = summary.completed_jobs,
            failed = summary.failed_jobs,
            elapsed_ms = summary.total_duration.as_millis() as u64,
            "benchmark run finished"
        );
        summary
    }
}

fn ramp_delay(workload: &WorkloadConfig, worker_index: usize) -> Duration {
    if workload.ramp_up.is_zero() || workload.parallels == 0 {
        return Duration::ZERO;
    }
    workload
        .ramp_up
        .mul_f64(worker_index as f64 / workload.parallels as f64)
}

async fn dispatch_jobs(
    factory: Arc<dyn OperationFactory>,
    workload: &WorkloadConfig,
    job_tx: flume::Sender<Operation>,
    cancel: CancellationToken,
    dispatched: Arc<AtomicU64>,
) {
    let mut index: u64 = 0;
    loop {
        if workload.total > 0 && index >= workload.total {
            break;
        }
        if cancel.is_cancelled() {
            break;
        }
        let op = factory.create(index, workload);
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = job_tx.send_async(op) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        dispatched.fetch_add(1, Ordering::Relaxed);
        index += 1;
    }
    metrics::counter!("bench_jobs_dispatched").increment(index);
    debug!(dispatched = index, "dispatcher finished");
    // job_tx drops here; once the worker clones of the receiver drain, the
    // channel reads as closed.
}

async fn worker_loop(
    index: usize,
    adapter: Arc<dyn ProtocolAdapter>,
    job_rx: flume::Receiver<Operation>,
    result_tx: tokio::sync::mpsc::Sender<JobOutcome>,
    cancel: CancellationToken,
    ramp_delay: Duration,
) {
    if !ramp_delay.is_zero() {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(ramp_delay) => {}
        }
    }

    loop {
        let op = tokio::select! {
            _ = cancel.cancelled() => break,
            received = job_rx.recv_async() => match received {
                Ok(op) => op,
                // Closed and drained.
                Err(_) => break,
            },
        };

        let started = Instant::now();
        // A panicking adapter must not take the worker down with it; the
        // failure becomes an ordinary result and the loop continues.
        let mut result = match std::panic::AssertUnwindSafe(adapter.execute(&cancel, &op))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(worker = index, kind = %op.kind, "operation panicked");
                OperationResult::failure(BenchError::Internal("operation panicked".to_string()))
            }
        };
        let elapsed = started.elapsed();

        // Normalization: uniform timing, success consistent with error,
        // provenance tags present.
        if result.duration.is_zero() {
            result.duration = elapsed;
        }
        result.success = result.error.is_none();
        result
            .metadata
            .entry("operation".to_string())
            .or_insert_with(|| serde_json::Value::String(op.kind.clone()));
        result
            .metadata
            .entry("protocol".to_string())
            .or_insert_with(|| serde_json::Value::String(adapter.protocol_name().to_string()));

        let outcome = JobOutcome {
            kind: op.kind,
            result,
        };
        if result_tx.send(outcome).await.is_err() {
            // Sink is gone; nothing useful left to do.
            break;
        }
    }
}

#[derive(Default)]
struct SinkTotals {
    completed: u64,
    success: u64,
    failed: u64,
    per_kind: HashMap<String, u64>,
}

async fn sink_results(
    mut result_rx: tokio::sync::mpsc::Receiver<JobOutcome>,
    collector: Arc<MetricsCollector>,
) -> SinkTotals {
    let mut totals = SinkTotals::default();
    while let Some(outcome) = result_rx.recv().await {
        collector.record(&outcome.result);
        totals.completed += 1;
        if outcome.result.success {
            totals.success += 1;
        } else {
            totals.failed += 1;
        }
        *totals.per_kind.entry(outcome.kind).or_insert(0) += 1;
    }
    totals
}
