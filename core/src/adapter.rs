use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::operation::{Operation, OperationResult};

/// The capability contract every protocol implementation satisfies.
///
/// The engine resolves one adapter at run start and drives the whole
/// workload through it; per-operation overhead is a single dynamic call.
///
/// Contract:
/// - `connect` must be safe to retry after a failure. After it succeeds,
///   `execute` may be called from many workers concurrently.
/// - `execute` must return within the configured operation deadline or when
///   `cancel` fires; a cancelled operation reports `BenchError::Cancelled`.
///   It populates `is_read` based on the operation kind (read/write/echo
///   classification is protocol-local). It never panics the worker: errors
///   are carried in the returned result.
/// - `close` releases all resources, including an owned connection pool,
///   and is idempotent.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    async fn connect(&self, config: &BenchConfig) -> Result<(), BenchError>;

    async fn execute(&self, cancel: &CancellationToken, op: &Operation) -> OperationResult;

    async fn health_check(&self) -> Result<(), BenchError>;

    async fn close(&self) -> Result<(), BenchError>;

    fn protocol_name(&self) -> &'static str;

    /// Opaque protocol-specific counters for the report; the core never
    /// interprets the contents.
    fn protocol_metrics(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }
}
