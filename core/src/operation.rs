use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;

use crate::error::BenchError;

/// A protocol-agnostic description of one unit of work.
///
/// Produced by an `OperationFactory`, consumed by exactly one adapter call.
/// Immutable once constructed; adapters read it, they never modify it.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Operation kind, e.g. "get", "set", "echo". Classification into
    /// read/write is protocol-local and happens in the adapter.
    pub kind: String,
    pub key: String,
    pub value: Option<Bytes>,
    /// Free-form per-operation parameters for protocol extras.
    pub params: HashMap<String, Value>,
    pub ttl: Option<Duration>,
    pub metadata: HashMap<String, String>,
}

impl Operation {
    pub fn new(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            value: None,
            params: HashMap::new(),
            ttl: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_value(mut self, value: Bytes) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// The outcome of one dispatched operation. Exactly one per job.
///
/// `duration` is authoritative only after the worker stamped it: timing is
/// measured by the caller so it stays uniform across adapters.
#[derive(Debug, Clone, Default)]
pub struct OperationResult {
    pub success: bool,
    pub duration: Duration,
    pub is_read: bool,
    pub error: Option<BenchError>,
    pub value: Option<Bytes>,
    pub metadata: HashMap<String, Value>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(error: BenchError) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    pub fn with_value(mut self, value: Bytes) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_error_and_flips_success() {
        let result = OperationResult::failure(BenchError::OperationTimeout);
        assert!(!result.success);
        assert_eq!(result.error, Some(BenchError::OperationTimeout));
    }

    #[test]
    fn builder_style_construction() {
        let op = Operation::new("set", "bench:42")
            .with_value(Bytes::from_static(b"payload"))
            .with_ttl(Duration::from_secs(60));
        assert_eq!(op.kind, "set");
        assert_eq!(op.ttl, Some(Duration::from_secs(60)));
        assert!(op.value.is_some());
    }
}
