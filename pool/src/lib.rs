//! Bounded async connection pool for connection-oriented adapters.
//!
//! Idle connections sit in a bounded MPMC channel acting as the object
//! pool; the live count is capped by an atomic claim. Validation and
//! construction are injected by the pool owner through
//! [`ConnectionFactory`], so the pool itself is protocol-agnostic.
//!
//! Contract highlights: `acquire` prefers idle connections, creates lazily
//! while under capacity, and otherwise waits up to `connection_timeout` for
//! a return before failing with `PoolExhausted`. Every successful `acquire`
//! must be paired with exactly one `release`; releasing into a full idle
//! channel or a closed pool discards the connection instead of leaking it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use stampede_core::{BenchError, PoolSettings};
use tracing::debug;

/// Creates, validates, and tears down protocol connections on behalf of
/// the pool. Validation should be cheap (a lightweight ping or write with
/// a short deadline); the pool only needs the boolean.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Conn: Send + 'static;

    async fn create(&self) -> Result<Self::Conn, BenchError>;

    async fn validate(&self, conn: &mut Self::Conn) -> bool;

    async fn close(&self, conn: Self::Conn);
}

/// Read-only view of the pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub live: usize,
    pub idle: usize,
    pub total_created: u64,
    pub validation_failures: u64,
    pub acquire_timeouts: u64,
}

pub struct ConnectionPool<F: ConnectionFactory> {
    factory: F,
    settings: PoolSettings,
    idle_tx: flume::Sender<F::Conn>,
    idle_rx: flume::Receiver<F::Conn>,
    live: AtomicUsize,
    closed: AtomicBool,
    total_created: AtomicU64,
    validation_failures: AtomicU64,
    acquire_timeouts: AtomicU64,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    pub fn new(factory: F, settings: PoolSettings) -> Self {
        let (idle_tx, idle_rx) = flume::bounded(settings.max_idle.max(1));
        Self {
            factory,
            settings,
            idle_tx,
            idle_rx,
            live: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            total_created: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            acquire_timeouts: AtomicU64::new(0),
        }
    }

    /// Pre-create `min_idle` connections. Failures here are fatal: if the
    /// target cannot sustain the warm set it will not sustain the run.
    pub async fn warm(&self) -> Result<(), BenchError> {
        for _ in 0..self.settings.min_idle.min(self.settings.pool_size) {
            if !self.try_claim_slot() {
                break;
            }
            let conn = self.create_connection().await?;
            if self.idle_tx.try_send(conn).is_err() {
                // Idle channel full already; stop warming.
                self.live.fetch_sub(1, Ordering::Relaxed);
                break;
            }
        }
        Ok(())
    }

    /// Borrow a connection. Pair every success with exactly one
    /// [`release`](Self::release).
    pub async fn acquire(&self) -> Result<F::Conn, BenchError> {
        let deadline = Instant::now() + self.settings.connection_timeout;
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(BenchError::PoolClosed);
            }

            // Fast path: an idle connection is waiting.
            match self.idle_rx.try_recv() {
                Ok(conn) => match self.revalidate(conn).await {
                    Some(conn) => return Ok(conn),
                    None => continue,
                },
                Err(flume::TryRecvError::Disconnected) => return Err(BenchError::PoolClosed),
                Err(flume::TryRecvError::Empty) => {}
            }

            // Under capacity: create a fresh one.
            if self.try_claim_slot() {
                return self.create_connection().await;
            }

            // At capacity: wait for a return, bounded by the remaining
            // timeout budget.
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.acquire_timeouts.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("bench_pool_acquire_timeouts").increment(1);
                return Err(BenchError::PoolExhausted);
            }
            match tokio::time::timeout(remaining, self.idle_rx.recv_async()).await {
                Ok(Ok(conn)) => match self.revalidate(conn).await {
                    Some(conn) => return Ok(conn),
                    None => continue,
                },
                Ok(Err(_)) => return Err(BenchError::PoolClosed),
                Err(_) => {
                    self.acquire_timeouts.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("bench_pool_acquire_timeouts").increment(1);
                    return Err(BenchError::PoolExhausted);
                }
            }
        }
    }

    /// Return a borrowed connection. Invalid connections and returns into a
    /// closed pool or full idle channel are closed and discarded.
    pub async fn release(&self, mut conn: F::Conn) {
        if self.closed.load(Ordering::Acquire) || !self.factory.validate(&mut conn).await {
            self.discard(conn).await;
            return;
        }
        if let Err(send_err) = self.idle_tx.try_send(conn) {
            self.discard(send_err.into_inner()).await;
        }
    }

    /// Close the pool: drain and close all idle connections, fail further
    /// acquires with `PoolClosed`. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        while let Ok(conn) = self.idle_rx.try_recv() {
            self.discard(conn).await;
        }
        debug!(live = self.live.load(Ordering::Relaxed), "pool closed");
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.live.load(Ordering::Relaxed),
            idle: self.idle_rx.len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            acquire_timeouts: self.acquire_timeouts.load(Ordering::Relaxed),
        }
    }

    /// Claim a live slot if the pool is under capacity.
    fn try_claim_slot(&self) -> bool {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.settings.pool_size).then_some(live + 1)
            })
            .is_ok()
    }

    /// Create with the live slot already claimed; the slot is returned on
    /// failure.
    async fn create_connection(&self) -> Result<F::Conn, BenchError> {
        match self.factory.create().await {
            Ok(conn) => {
                self.total_created.fetch_add(1, Ordering::Relaxed);
                Ok(conn)
            }
            Err(e) => {
                self.live.fetch_sub(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn revalidate(&self, mut conn: F::Conn) -> Option<F::Conn> {
        if self.factory.validate(&mut conn).await {
            Some(conn)
        } else {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
            self.discard(conn).await;
            None
        }
    }

    async fn discard(&self, conn: F::Conn) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        self.factory.close(conn).await;
    }
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
