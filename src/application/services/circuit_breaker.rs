use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Failures older than this no longer count towards opening the breaker.
pub const FAILURE_WINDOW: Duration = Duration::from_secs(5 * 60);

const MIN_FAILURE_LOG: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub state: BreakerState,
    pub recent_failures: usize,
    pub failure_threshold: usize,
    pub recovery_timeout_secs: u64,
}

#[derive(Debug)]
struct BreakerInner {
    failures: VecDeque<Instant>,
    state: BreakerState,
    last_failure: Option<Instant>,
}

/// Process-wide admission gate in front of the document backend.
///
/// Closed admits everything. Enough failures inside [`FAILURE_WINDOW`] open
/// it; once `recovery_timeout` has passed since the last failure the next
/// admission check moves it to half-open and lets a probe through. The
/// probe's outcome either closes it again or reopens it.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: usize,
    recovery_timeout: Duration,
    log_capacity: usize,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, recovery_timeout: Duration) -> Self {
        let failure_threshold = failure_threshold.max(1);
        let log_capacity = failure_threshold.max(MIN_FAILURE_LOG);
        Self {
            failure_threshold,
            recovery_timeout,
            log_capacity,
            inner: Mutex::new(BreakerInner {
                failures: VecDeque::with_capacity(log_capacity),
                state: BreakerState::Closed,
                last_failure: None,
            }),
        }
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();

        if inner.failures.len() == self.log_capacity {
            inner.failures.pop_front();
        }
        inner.failures.push_back(now);
        inner.last_failure = Some(now);

        let recent = count_recent(&inner.failures, now);
        let reopen_probe = inner.state == BreakerState::HalfOpen;
        if (recent >= self.failure_threshold || reopen_probe) && inner.state != BreakerState::Open
        {
            inner.state = BreakerState::Open;
            tracing::warn!(
                recent_failures = recent,
                threshold = self.failure_threshold,
                "Circuit breaker opened"
            );
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != BreakerState::Closed {
            tracing::info!(previous = %inner.state, "Circuit breaker closed");
        }
        inner.state = BreakerState::Closed;
    }

    pub fn can_proceed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let recovered = inner
                    .last_failure
                    .is_some_and(|at| at.elapsed() >= self.recovery_timeout);
                if recovered {
                    inner.state = BreakerState::HalfOpen;
                    tracing::info!("Circuit breaker half-open, admitting probe");
                }
                recovered
            }
        }
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.failures.clear();
        inner.last_failure = None;
        inner.state = BreakerState::Closed;
        tracing::info!("Circuit breaker manually reset");
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        BreakerStatus {
            state: inner.state,
            recent_failures: count_recent(&inner.failures, Instant::now()),
            failure_threshold: self.failure_threshold,
            recovery_timeout_secs: self.recovery_timeout.as_secs(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn count_recent(failures: &VecDeque<Instant>, now: Instant) -> usize {
    failures
        .iter()
        .filter(|at| now.saturating_duration_since(**at) < FAILURE_WINDOW)
        .count()
}
