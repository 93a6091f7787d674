//! Shared contracts for the stampede benchmarking harness.
//!
//! Everything the execution engine, the metrics layer, and the protocol
//! adapters agree on lives here: the operation/result types that flow
//! through the job pipeline, the validated configuration tree, the error
//! taxonomy, the retry policy adapters may consult, and the two capability
//! contracts (`ProtocolAdapter`, `OperationFactory`) that keep the engine
//! protocol-agnostic.

pub mod adapter;
pub mod config;
pub mod error;
pub mod factory;
pub mod operation;
pub mod retry;
pub mod sample;

pub use adapter::ProtocolAdapter;
pub use config::{BenchConfig, ConnectionConfig, PoolSettings, Protocol, WorkloadConfig};
pub use error::BenchError;
pub use factory::OperationFactory;
pub use operation::{Operation, OperationResult};
pub use retry::RetryPolicy;
pub use sample::SystemSample;
