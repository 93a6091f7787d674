use thiserror::Error;

/// The operational error taxonomy.
///
/// Per-operation failures are carried inside `OperationResult` and recorded;
/// they never halt a run. Only `ConfigInvalid` and `ConnectFailed` are fatal
/// at startup (the latter unless the adapter downgrades itself to
/// simulation mode).
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("failed to connect to target: {0}")]
    ConnectFailed(String),
    #[error("connection pool exhausted")]
    PoolExhausted,
    #[error("connection pool is closed")]
    PoolClosed,
    #[error("operation timed out")]
    OperationTimeout,
    #[error("network error: {0}")]
    OperationNetwork(String),
    #[error("protocol error: {0}")]
    OperationProtocol(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl BenchError {
    /// Stable tag for metric labels and report breakdowns.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            BenchError::ConfigInvalid(_) => "config_invalid",
            BenchError::ConnectFailed(_) => "connect_failed",
            BenchError::PoolExhausted => "pool_exhausted",
            BenchError::PoolClosed => "pool_closed",
            BenchError::OperationTimeout => "timeout",
            BenchError::OperationNetwork(_) => "network",
            BenchError::OperationProtocol(_) => "protocol",
            BenchError::Cancelled => "cancelled",
            BenchError::Internal(_) => "internal",
        }
    }

    /// Whether an adapter-side retry could plausibly succeed.
    ///
    /// Timeouts and network-layer failures (refused, reset, broken pipe)
    /// are transient; protocol-level failures and cancellation are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BenchError::OperationTimeout | BenchError::OperationNetwork(_)
        )
    }

    /// Errors that abort startup rather than being recorded per-op.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BenchError::ConfigInvalid(_) | BenchError::ConnectFailed(_)
        )
    }
}

impl From<std::io::Error> for BenchError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => BenchError::OperationTimeout,
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected => BenchError::OperationNetwork(e.to_string()),
            _ => BenchError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn retryable_classification() {
        assert!(BenchError::OperationTimeout.is_retryable());
        assert!(BenchError::OperationNetwork("connection reset".into()).is_retryable());
        assert!(!BenchError::OperationProtocol("WRONGTYPE".into()).is_retryable());
        assert!(!BenchError::Cancelled.is_retryable());
        assert!(!BenchError::PoolExhausted.is_retryable());
    }

    #[test]
    fn io_error_mapping() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            BenchError::from(refused),
            BenchError::OperationNetwork(_)
        ));

        let timeout = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        assert_eq!(BenchError::from(timeout), BenchError::OperationTimeout);

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(BenchError::from(other), BenchError::Internal(_)));
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(BenchError::PoolExhausted.kind_tag(), "pool_exhausted");
        assert_eq!(BenchError::Cancelled.kind_tag(), "cancelled");
    }
}
