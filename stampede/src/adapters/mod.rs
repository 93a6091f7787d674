use std::sync::Arc;

use stampede_core::{BenchConfig, BenchError, Protocol, ProtocolAdapter};

use crate::config::Config;

pub mod http;
pub mod redis;
pub mod simulation;
pub mod tcp;

/// Resolve the adapter for the configured protocol. Construction is cheap;
/// I/O happens in `connect`.
pub fn build_adapter(
    config: &Config,
    bench: &BenchConfig,
) -> Result<Arc<dyn ProtocolAdapter>, BenchError> {
    match bench.protocol {
        Protocol::Simulation => Ok(Arc::new(simulation::SimulationAdapter::new(
            config.simulate_success_ratio,
            std::time::Duration::from_millis(config.simulate_min_latency_ms),
            std::time::Duration::from_millis(config.simulate_max_latency_ms),
        ))),
        Protocol::Tcp => Ok(Arc::new(tcp::TcpAdapter::new())),
        Protocol::Http => Ok(Arc::new(http::HttpAdapter::new())),
        Protocol::Redis => Ok(Arc::new(redis::RedisAdapter::new())),
        other => Err(BenchError::ConfigInvalid(format!(
            "no adapter built in for protocol {}",
            other.as_tag()
        ))),
    }
}
