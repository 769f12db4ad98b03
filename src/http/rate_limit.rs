// src/http/rate_limit.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{AegisError, AegisResult};

/// Single-slot token bucket pacing all outbound requests.
///
/// One atomic "next free instant" is advanced on every acquire; callers
/// sleep until their reserved slot. No background thread, no burst credit.
pub struct RateLimiter {
    permits_per_second: f64,
    interval_nanos: u64,
    anchor: Instant,
    next_free_nanos: AtomicU64,
}

impl RateLimiter {
    pub fn new(permits_per_second: f64) -> AegisResult<Self> {
        if !permits_per_second.is_finite() || permits_per_second <= 0.0 {
            return Err(AegisError::InvalidInput(
                "rate limit must be positive".to_string(),
            ));
        }

        Ok(Self {
            permits_per_second,
            interval_nanos: (1_000_000_000_f64 / permits_per_second) as u64,
            anchor: Instant::now(),
            next_free_nanos: AtomicU64::new(0),
        })
    }

    /// Acquire a permit, suspending the calling task if necessary.
    ///
    /// Excess demand queues by arrival order of the atomic update; ties are
    /// broken by whichever compare-and-swap wins.
    pub async fn acquire(&self) {
        let now = self.anchor.elapsed().as_nanos() as u64;

        let wait_nanos = loop {
            let current = self.next_free_nanos.load(Ordering::Acquire);
            let next = current.max(now) + self.interval_nanos;

            if self
                .next_free_nanos
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break current.saturating_sub(now);
            }
        };

        if wait_nanos > 0 {
            tokio::time::sleep(Duration::from_nanos(wait_nanos)).await;
        }
    }

    /// Get the configured rate.
    pub fn rate(&self) -> f64 {
        self.permits_per_second
    }
}
