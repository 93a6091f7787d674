use std::time::Duration;

use crate::error::BenchError;

/// Protocols the harness can drive. Adapters for some of these live out of
/// tree; the engine only ever sees the `ProtocolAdapter` contract.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Protocol {
    Redis,
    Http,
    Tcp,
    Udp,
    Kafka,
    WebSocket,
    Grpc,
    Simulation,
}

impl Protocol {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Protocol::Redis => "redis",
            Protocol::Http => "http",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Kafka => "kafka",
            Protocol::WebSocket => "websocket",
            Protocol::Grpc => "grpc",
            Protocol::Simulation => "simulation",
        }
    }

    /// Whether the protocol needs a reachable target address at all.
    pub fn requires_addresses(&self) -> bool {
        !matches!(self, Protocol::Simulation)
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_ref() {
            "redis" => Ok(Protocol::Redis),
            "http" => Ok(Protocol::Http),
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "kafka" => Ok(Protocol::Kafka),
            "websocket" | "ws" => Ok(Protocol::WebSocket),
            "grpc" => Ok(Protocol::Grpc),
            "simulation" | "sim" => Ok(Protocol::Simulation),
            _ => Err(format!("Unknown protocol: {s}")),
        }
    }
}

/// Sizing and lifecycle knobs for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum live connections.
    pub pool_size: usize,
    /// Connections pre-warmed at pool construction.
    pub min_idle: usize,
    /// Idle-channel capacity; returns beyond it are discarded.
    pub max_idle: usize,
    pub idle_timeout: Duration,
    /// How long `acquire` may wait for an idle return when the pool is at
    /// capacity before failing with `PoolExhausted`.
    pub connection_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 10,
            min_idle: 2,
            max_idle: 10,
            idle_timeout: Duration::from_secs(300),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub addresses: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool: PoolSettings,
    /// Per-operation deadline applied by adapters.
    pub timeout: Duration,
    pub tls: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            username: None,
            password: None,
            pool: PoolSettings::default(),
            timeout: Duration::from_secs(5),
            tls: false,
        }
    }
}

/// The workload shape, fixed for the lifetime of one benchmark run.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Total operations to dispatch; 0 means duration-bounded.
    pub total: u64,
    /// Worker count.
    pub parallels: usize,
    /// Payload size in bytes for write-style operations.
    pub data_size: usize,
    /// Wall-clock bound; zero means count-bounded.
    pub duration: Duration,
    /// Worker starts are staggered linearly across this window.
    pub ramp_up: Duration,
    /// Protocol-specific test case name, e.g. "echo_test", "set_get_random".
    pub test_case: String,
    /// Percentage of operations classified as reads, 0..=100.
    pub read_percent: u8,
    pub job_buffer_size: usize,
    pub result_buffer_size: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            total: 1000,
            parallels: 8,
            data_size: 64,
            duration: Duration::ZERO,
            ramp_up: Duration::ZERO,
            test_case: "echo_test".to_string(),
            read_percent: 50,
            job_buffer_size: 256,
            result_buffer_size: 256,
        }
    }
}

/// The whole configuration tree handed to the engine.
///
/// Validated once at startup; the engine receives an owned clone so nothing
/// downstream can mutate the operator's intent mid-run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub protocol: Protocol,
    pub connection: ConnectionConfig,
    pub workload: WorkloadConfig,
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.workload.parallels < 1 {
            return Err(BenchError::ConfigInvalid(
                "parallels must be at least 1".to_string(),
            ));
        }
        if self.workload.total == 0 && self.workload.duration.is_zero() {
            return Err(BenchError::ConfigInvalid(
                "either total >= 1 or duration > 0 is required".to_string(),
            ));
        }
        if self.workload.read_percent > 100 {
            return Err(BenchError::ConfigInvalid(format!(
                "read_percent must be within 0..=100, got {}",
                self.workload.read_percent
            )));
        }
        if self.protocol.requires_addresses() && self.connection.addresses.is_empty() {
            return Err(BenchError::ConfigInvalid(format!(
                "protocol {} requires at least one target address",
                self.protocol.as_tag()
            )));
        }
        if self.connection.pool.pool_size == 0 {
            return Err(BenchError::ConfigInvalid(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.connection.pool.min_idle > self.connection.pool.pool_size {
            return Err(BenchError::ConfigInvalid(
                "min_idle cannot exceed pool_size".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Simulation,
            connection: ConnectionConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}
