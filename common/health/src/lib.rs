//! Health evaluation for a running benchmark.
//!
//! The harness samples its own runtime state while it hammers a target, and
//! that state can degrade: unbounded task growth, memory ballooning, CPU
//! saturation. `evaluate` turns one `SystemSample` into a set of
//! `HealthIssue`s graded by how far past its threshold each reading is.
//!
//! A `CircuitBreaker` wraps evaluation for callers that check repeatedly:
//! enough consecutive bad checks open the circuit, checks are then rejected
//! cheaply until a reset timeout elapses, and a half-open probe decides
//! whether to close again. This keeps a degraded run from burning cycles on
//! health bookkeeping while it is already known to be unhealthy.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use stampede_core::SystemSample;
use tracing::warn;

/// Issue severity, ordered so `max()` gives the overall level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthLevel {
    Good,
    Warning,
    Error,
    Critical,
}

impl HealthLevel {
    pub fn as_tag(&self) -> &'static str {
        match self {
            HealthLevel::Good => "good",
            HealthLevel::Warning => "warning",
            HealthLevel::Error => "error",
            HealthLevel::Critical => "critical",
        }
    }

    /// Severity from how far past the threshold a reading is.
    fn from_ratio(ratio: f64) -> HealthLevel {
        if ratio >= 2.0 {
            HealthLevel::Critical
        } else if ratio >= 1.5 {
            HealthLevel::Error
        } else {
            HealthLevel::Warning
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Memory,
    TaskCount,
    GcPressure,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthIssue {
    pub kind: IssueKind,
    pub severity: HealthLevel,
    pub current: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub overall: HealthLevel,
    pub issues: Vec<HealthIssue>,
    /// True when the circuit breaker rejected the check without evaluating.
    pub rejected: bool,
}

impl HealthReport {
    fn rejected() -> Self {
        Self {
            overall: HealthLevel::Critical,
            issues: Vec::new(),
            rejected: true,
        }
    }

    pub fn is_good(&self) -> bool {
        self.overall == HealthLevel::Good
    }
}

/// Limits above which a reading becomes an issue. A zero threshold disables
/// that check.
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    pub memory_bytes: u64,
    pub task_count: u64,
    pub gc_count: u64,
    pub cpu_percent: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            memory_bytes: 1024 * 1024 * 1024,
            task_count: 10_000,
            gc_count: 0,
            cpu_percent: 90.0,
        }
    }
}

fn check_threshold(
    kind: IssueKind,
    current: f64,
    threshold: f64,
    issues: &mut Vec<HealthIssue>,
) {
    if threshold <= 0.0 || current < threshold {
        return;
    }
    issues.push(HealthIssue {
        kind,
        severity: HealthLevel::from_ratio(current / threshold),
        current,
        threshold,
    });
}

/// Grade one sample against the thresholds. Overall is the worst issue
/// severity; `Good` when nothing exceeded.
pub fn evaluate(sample: &SystemSample, thresholds: &HealthThresholds) -> HealthReport {
    let mut issues = Vec::new();
    check_threshold(
        IssueKind::Memory,
        sample.resident_bytes as f64,
        thresholds.memory_bytes as f64,
        &mut issues,
    );
    check_threshold(
        IssueKind::TaskCount,
        sample.task_count as f64,
        thresholds.task_count as f64,
        &mut issues,
    );
    check_threshold(
        IssueKind::GcPressure,
        sample.gc_count as f64,
        thresholds.gc_count as f64,
        &mut issues,
    );
    check_threshold(
        IssueKind::Cpu,
        sample.cpu_estimate,
        thresholds.cpu_percent,
        &mut issues,
    );

    let overall = issues
        .iter()
        .map(|i| i.severity)
        .max()
        .unwrap_or(HealthLevel::Good);
    HealthReport {
        overall,
        issues,
        rejected: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Callback invoked on every non-Good check result.
pub type AlertHandler = Box<dyn Fn(&HealthReport) + Send + Sync>;

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Gates health evaluation behind a Closed → Open → HalfOpen state machine.
///
/// Transitions are exactly: Closed→Open after `failure_threshold`
/// consecutive checks at Error or worse; Open→HalfOpen once `reset_timeout`
/// has elapsed since the last failure; HalfOpen→Closed on a passing probe,
/// HalfOpen→Open on a failing one.
pub struct CircuitBreaker {
    thresholds: HealthThresholds,
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
    handlers: Vec<AlertHandler>,
}

impl CircuitBreaker {
    pub fn new(
        thresholds: HealthThresholds,
        failure_threshold: u32,
        reset_timeout: Duration,
    ) -> Self {
        Self {
            thresholds,
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
            }),
            handlers: Vec::new(),
        }
    }

    /// Register an alert handler. Handlers fire on any non-Good check and
    /// must not block; a panicking handler is contained and logged.
    pub fn on_alert<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HealthReport) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("poisoned circuit breaker").state
    }

    /// Run one health check through the circuit.
    pub fn check(&self, sample: &SystemSample) -> HealthReport {
        let mut inner = self.inner.lock().expect("poisoned circuit breaker");

        if inner.state == CircuitState::Open {
            let waited_out = inner
                .last_failure
                .map(|at| at.elapsed() >= self.reset_timeout)
                .unwrap_or(true);
            if !waited_out {
                return HealthReport::rejected();
            }
            inner.state = CircuitState::HalfOpen;
        }

        let report = evaluate(sample, &self.thresholds);
        let failed = report.overall >= HealthLevel::Error;

        match (inner.state, failed) {
            (CircuitState::Closed, true) => {
                inner.consecutive_failures += 1;
                inner.last_failure = Some(Instant::now());
                if inner.consecutive_failures >= self.failure_threshold {
                    warn!(
                        failures = inner.consecutive_failures,
                        "health circuit opened"
                    );
                    inner.state = CircuitState::Open;
                }
            }
            (CircuitState::Closed, false) => {
                inner.consecutive_failures = 0;
            }
            (CircuitState::HalfOpen, true) => {
                inner.last_failure = Some(Instant::now());
                inner.state = CircuitState::Open;
            }
            (CircuitState::HalfOpen, false) => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
            }
            // Open was handled above.
            (CircuitState::Open, _) => {}
        }
        drop(inner);

        if !report.is_good() {
            self.fire_alerts(&report);
        }
        report
    }

    fn fire_alerts(&self, report: &HealthReport) {
        for handler in &self.handlers {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(report);
            }));
            if outcome.is_err() {
                warn!("health alert handler panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_sample() -> SystemSample {
        SystemSample {
            resident_bytes: 64 * 1024 * 1024,
            task_count: 12,
            cpu_estimate: 5.0,
            ..Default::default()
        }
    }

    fn unhealthy_sample() -> SystemSample {
        SystemSample {
            // 2x the default memory threshold: Critical.
            resident_bytes: 2 * 1024 * 1024 * 1024,
            task_count: 12,
            cpu_estimate: 5.0,
            ..Default::default()
        }
    }

    #[test]
    fn clean_sample_is_good() {
        let report = evaluate(&healthy_sample(), &HealthThresholds::default());
        assert!(report.is_good());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn severity_scales_with_ratio() {
        let thresholds = HealthThresholds {
            task_count: 100,
            ..Default::default()
        };
        let mut sample = healthy_sample();

        sample.task_count = 120;
        assert_eq!(
            evaluate(&sample, &thresholds).overall,
            HealthLevel::Warning
        );

        sample.task_count = 160;
        assert_eq!(evaluate(&sample, &thresholds).overall, HealthLevel::Error);

        sample.task_count = 250;
        assert_eq!(
            evaluate(&sample, &thresholds).overall,
            HealthLevel::Critical
        );
    }

    #[test]
    fn zero_threshold_disables_check() {
        let thresholds = HealthThresholds {
            gc_count: 0,
            ..Default::default()
        };
        let mut sample = healthy_sample();
        sample.gc_count = 10_000;
        assert!(evaluate(&sample, &thresholds).is_good());
    }

    #[test]
    fn breaker_opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(
            HealthThresholds::default(),
            3,
            Duration::from_secs(60),
        );

        breaker.check(&unhealthy_sample());
        breaker.check(&unhealthy_sample());
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.check(&unhealthy_sample());
        assert_eq!(breaker.state(), CircuitState::Open);

        // While open, checks are rejected without evaluation.
        let rejected = breaker.check(&healthy_sample());
        assert!(rejected.rejected);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn good_check_resets_failure_streak() {
        let breaker = CircuitBreaker::new(
            HealthThresholds::default(),
            2,
            Duration::from_secs(60),
        );
        breaker.check(&unhealthy_sample());
        breaker.check(&healthy_sample());
        breaker.check(&unhealthy_sample());
        // Streak was broken: still closed.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_closes_or_reopens() {
        let breaker =
            CircuitBreaker::new(HealthThresholds::default(), 1, Duration::ZERO);

        breaker.check(&unhealthy_sample());
        assert_eq!(breaker.state(), CircuitState::Open);

        // Zero reset timeout: next check goes straight to a half-open
        // probe. A failing probe reopens.
        breaker.check(&unhealthy_sample());
        assert_eq!(breaker.state(), CircuitState::Open);

        // A passing probe closes.
        breaker.check(&healthy_sample());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn alert_handlers_fire_on_degraded_checks() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        let breaker =
            CircuitBreaker::new(HealthThresholds::default(), 5, Duration::from_secs(60))
                .on_alert(move |report| {
                    assert!(!report.is_good());
                    seen.fetch_add(1, Ordering::SeqCst);
                });

        breaker.check(&healthy_sample());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        breaker.check(&unhealthy_sample());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_is_contained() {
        let breaker =
            CircuitBreaker::new(HealthThresholds::default(), 5, Duration::from_secs(60))
                .on_alert(|_| panic!("handler bug"));
        let report = breaker.check(&unhealthy_sample());
        assert!(!report.is_good());
        // Breaker still functional afterwards.
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
