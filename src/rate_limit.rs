//! Pacing of provider calls during batch indexing.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Gate awaited before every provider call on the indexing path.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}

/// Lets one caller through per `interval`; early callers sleep until their slot.
///
/// The first call passes immediately.
pub struct IntervalGate {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl RateLimiter for IntervalGate {
    async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match *next_slot {
            Some(slot) if slot > now => {
                tokio::time::sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        *next_slot = Some(start + self.interval);
    }
}

/// No pacing.
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}

/// `Unlimited` for a zero interval, otherwise an [`IntervalGate`].
pub fn limiter_for(min_interval_ms: u64) -> Box<dyn RateLimiter> {
    if min_interval_ms == 0 {
        Box::new(Unlimited)
    } else {
        Box::new(IntervalGate::from_millis(min_interval_ms))
    }
}
