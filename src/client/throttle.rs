//! Fixed-interval throttle between outbound steps.
//!
//! Epistemic foundation:
//! - K_i: The service defends itself against bursts of list/batch requests
//! - B_i: A fixed pause per page and per batch keeps us under its radar
//! - I^B: The exact tolerated rate is unknowable → configurable interval

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Pause inserted between consecutive pages or batches.
///
/// Applied once per step, never per individual call within a step.
#[allow(async_fn_in_trait)]
pub trait Throttle {
    /// Block the calling step for the configured interval.
    async fn wait(&self);
}

/// Throttle sleeping a fixed interval.
#[derive(Debug)]
pub struct FixedDelay {
    interval: Duration,
    total_waits: AtomicU64,
    total_wait_ms: AtomicU64,
}

impl FixedDelay {
    /// Create a throttle with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            total_waits: AtomicU64::new(0),
            total_wait_ms: AtomicU64::new(0),
        }
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Get statistics.
    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            total_waits: self.total_waits.load(Ordering::Relaxed),
            total_wait_secs: self.total_wait_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

impl Throttle for FixedDelay {
    async fn wait(&self) {
        self.total_waits.fetch_add(1, Ordering::Relaxed);
        if self.interval.is_zero() {
            return;
        }
        debug!(wait_ms = self.interval.as_millis() as u64, "Throttling");
        self.total_wait_ms
            .fetch_add(self.interval.as_millis() as u64, Ordering::Relaxed);
        tokio::time::sleep(self.interval).await;
    }
}

/// Throttle that never sleeps; counts how often it was asked to.
#[derive(Debug, Default)]
pub struct NoDelay {
    waits: AtomicU64,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `wait` calls so far.
    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}

impl Throttle for NoDelay {
    async fn wait(&self) {
        self.waits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Throttle statistics.
#[derive(Debug, Clone)]
pub struct ThrottleStats {
    pub total_waits: u64,
    pub total_wait_secs: f64,
}
