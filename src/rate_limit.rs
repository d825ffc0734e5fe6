use crate::constants::{INPUT_BUCKET_CAPACITY, INPUT_BUCKET_REFILL_PER_SECOND};

/// Token bucket gating `input` frames per session. Bursts up to the
/// capacity pass; sustained traffic is held to the refill rate.
#[derive(Clone, Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_second: f64,
    allowance: f64,
    last_refill_ms: u64,
}

impl TokenBucket {
    pub fn new(now_ms: u64) -> Self {
        Self::with_rates(now_ms, INPUT_BUCKET_CAPACITY, INPUT_BUCKET_REFILL_PER_SECOND)
    }

    pub fn with_rates(now_ms: u64, capacity: f64, refill_per_second: f64) -> Self {
        Self {
            capacity,
            refill_per_second,
            allowance: capacity,
            last_refill_ms: now_ms,
        }
    }

    /// Takes one token if available. Refill is computed lazily from the
    /// elapsed time since the previous call.
    pub fn try_take(&mut self, now_ms: u64) -> bool {
        let elapsed_ms = now_ms.saturating_sub(self.last_refill_ms);
        self.last_refill_ms = now_ms;
        self.allowance = (self.allowance + elapsed_ms as f64 / 1_000.0 * self.refill_per_second)
            .min(self.capacity);
        if self.allowance >= 1.0 {
            self.allowance -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn allowance(&self) -> f64 {
        self.allowance
    }
}
