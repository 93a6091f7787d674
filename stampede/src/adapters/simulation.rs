use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use stampede_core::{
    BenchConfig, BenchError, Operation, OperationResult, ProtocolAdapter,
};
use tokio_util::sync::CancellationToken;

/// No-I/O adapter producing synthetic results.
///
/// Used directly for dry runs and duration-bounded testing, and as the
/// fallback surface other adapters can delegate to when their target is
/// unreachable. Latency is uniform in `[min_latency, max_latency]`;
/// success is a biased coin per operation.
pub struct SimulationAdapter {
    success_ratio: f64,
    min_latency: Duration,
    max_latency: Duration,
    executed: AtomicU64,
    simulated_failures: AtomicU64,
}

impl SimulationAdapter {
    pub fn new(success_ratio: f64, min_latency: Duration, max_latency: Duration) -> Self {
        Self {
            success_ratio: success_ratio.clamp(0.0, 1.0),
            min_latency,
            max_latency: max_latency.max(min_latency),
            executed: AtomicU64::new(0),
            simulated_failures: AtomicU64::new(0),
        }
    }

    /// Instant, always-successful variant for tests.
    pub fn instant() -> Self {
        Self::new(1.0, Duration::ZERO, Duration::ZERO)
    }

    fn roll_latency(&self) -> Duration {
        if self.max_latency == self.min_latency {
            return self.min_latency;
        }
        let spread = (self.max_latency - self.min_latency).as_nanos() as u64;
        self.min_latency + Duration::from_nanos(rand::thread_rng().gen_range(0..=spread))
    }
}

#[async_trait]
impl ProtocolAdapter for SimulationAdapter {
    async fn connect(&self, _config: &BenchConfig) -> Result<(), BenchError> {
        Ok(())
    }

    async fn execute(&self, cancel: &CancellationToken, op: &Operation) -> OperationResult {
        let latency = self.roll_latency();
        if !latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return OperationResult::failure(BenchError::Cancelled);
                }
                _ = tokio::time::sleep(latency) => {}
            }
        }
        self.executed.fetch_add(1, Ordering::Relaxed);

        let is_read = matches!(op.kind.as_str(), "get" | "read" | "ping");
        if rand::thread_rng().gen_bool(self.success_ratio) {
            OperationResult::ok().read(is_read).with_duration(latency)
        } else {
            self.simulated_failures.fetch_add(1, Ordering::Relaxed);
            OperationResult::failure(BenchError::OperationNetwork(
                "simulated failure".to_string(),
            ))
            .read(is_read)
            .with_duration(latency)
        }
    }

    async fn health_check(&self) -> Result<(), BenchError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BenchError> {
        Ok(())
    }

    fn protocol_name(&self) -> &'static str {
        "simulation"
    }

    fn protocol_metrics(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut m = serde_json::Map::new();
        m.insert(
            "executed".to_string(),
            self.executed.load(Ordering::Relaxed).into(),
        );
        m.insert(
            "simulated_failures".to_string(),
            self.simulated_failures.load(Ordering::Relaxed).into(),
        );
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_ratio_is_respected_roughly() {
        let adapter = SimulationAdapter::new(0.9, Duration::ZERO, Duration::ZERO);
        let cancel = CancellationToken::new();
        let op = Operation::new("set", "k");

        let mut failures = 0;
        for _ in 0..2000 {
            if !adapter.execute(&cancel, &op).await.success {
                failures += 1;
            }
        }
        // ~200 expected; generous bounds keep this stable.
        assert!((100..=320).contains(&failures), "failures: {failures}");
    }

    #[tokio::test]
    async fn latency_stays_in_range() {
        let adapter =
            SimulationAdapter::new(1.0, Duration::from_millis(5), Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let op = Operation::new("get", "k");

        for _ in 0..20 {
            let result = adapter.execute(&cancel, &op).await;
            assert!(result.duration >= Duration::from_millis(5));
            assert!(result.duration <= Duration::from_millis(10));
            assert!(result.is_read);
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_sleep() {
        let adapter = SimulationAdapter::new(1.0, Duration::from_secs(30), Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = adapter
            .execute(&cancel, &Operation::new("get", "k"))
            .await;
        assert_eq!(result.error, Some(BenchError::Cancelled));
    }

    #[tokio::test]
    async fn metrics_count_executions() {
        let adapter = SimulationAdapter::instant();
        let cancel = CancellationToken::new();
        for _ in 0..5 {
            adapter.execute(&cancel, &Operation::new("set", "k")).await;
        }
        assert_eq!(adapter.protocol_metrics()["executed"], 5);
    }
}
