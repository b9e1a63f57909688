use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Once the table holds more clients than this, the next call sweeps out
/// every bucket whose entries have all aged out. A sweep that leaves the
/// table large raises the bar to twice the surviving size.
pub const DEFAULT_PURGE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }

    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateDecision::Allowed => 0,
            RateDecision::Limited { retry_after_secs } => *retry_after_secs,
        }
    }
}

#[derive(Debug, Default)]
struct Buckets {
    clients: HashMap<String, VecDeque<Instant>>,
    next_sweep_above: usize,
}

/// Sliding-window limiter keyed by client identifier (normally the peer IP).
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    purge_threshold: usize,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    /// `max_requests == 0` or a zero window disables limiting.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_purge_threshold(max_requests, window, DEFAULT_PURGE_THRESHOLD)
    }

    pub fn with_purge_threshold(
        max_requests: usize,
        window: Duration,
        purge_threshold: usize,
    ) -> Self {
        let purge_threshold = purge_threshold.max(1);
        Self {
            max_requests,
            window,
            purge_threshold,
            buckets: Mutex::new(Buckets {
                clients: HashMap::new(),
                next_sweep_above: purge_threshold,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0 && !self.window.is_zero()
    }

    pub fn allow(&self, client_id: &str) -> RateDecision {
        if !self.is_enabled() {
            return RateDecision::Allowed;
        }

        let now = Instant::now();
        let mut buckets = self.lock();

        if buckets.clients.len() > buckets.next_sweep_above {
            let before = buckets.clients.len();
            buckets.clients.retain(|_, bucket| {
                evict_stale(bucket, now, self.window);
                !bucket.is_empty()
            });
            let after = buckets.clients.len();
            buckets.next_sweep_above = self.purge_threshold.max(after.saturating_mul(2));
            tracing::debug!(
                before,
                after,
                next_sweep_above = buckets.next_sweep_above,
                "Purged idle rate limit buckets"
            );
        }

        let bucket = buckets.clients.entry(client_id.to_string()).or_default();
        evict_stale(bucket, now, self.window);

        if bucket.len() >= self.max_requests {
            let retry_after_secs = bucket
                .front()
                .map(|oldest| {
                    let remaining = self
                        .window
                        .saturating_sub(now.saturating_duration_since(*oldest));
                    remaining.as_secs_f64().ceil() as u64
                })
                .unwrap_or(0)
                .max(1);
            return RateDecision::Limited { retry_after_secs };
        }

        bucket.push_back(now);
        RateDecision::Allowed
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().clients.len()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evict_stale(bucket: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = bucket.front() {
        if now.saturating_duration_since(*oldest) >= window {
            bucket.pop_front();
        } else {
            break;
        }
    }
}
