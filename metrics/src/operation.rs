use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use stampede_core::OperationResult;

/// Monotonic operation counters. Lock-free; every field is an independent
/// atomic, so a snapshot is consistent-enough rather than linearizable,
/// which is all the reporting layer needs.
#[derive(Default)]
pub struct OperationTracker {
    total: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    read: AtomicU64,
    write: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct OperationMetrics {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub read: u64,
    pub write: u64,
    pub success_rate: f64,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: &OperationResult) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if result.success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if result.is_read {
            self.read.fetch_add(1, Ordering::Relaxed);
        } else {
            self.write.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> OperationMetrics {
        let total = self.total.load(Ordering::Relaxed);
        let success = self.success.load(Ordering::Relaxed);
        OperationMetrics {
            total,
            success,
            failed: self.failed.load(Ordering::Relaxed),
            read: self.read.load(Ordering::Relaxed),
            write: self.write.load(Ordering::Relaxed),
            success_rate: success as f64 / total.max(1) as f64 * 100.0,
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.success.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.read.store(0, Ordering::Relaxed);
        self.write.store(0, Ordering::Relaxed);
    }
}
