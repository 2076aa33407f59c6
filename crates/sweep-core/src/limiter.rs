//! Shared token-bucket rate limiter for provider calls.
//!
//! A single limiter is shared across scanning and execution so the
//! combined call rate stays under provider API quotas. It is the only
//! cross-component shared mutable resource and is never held across a
//! provider call or while touching tree state.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket: `rate_per_sec` tokens accrue per second up to `burst`.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiter {
    /// A limiter allowing `rate_per_sec` calls per second with a burst
    /// capacity of one second's worth of tokens.
    pub fn new(rate_per_sec: f64) -> Self {
        let rate = rate_per_sec.max(0.001);
        Self {
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
            rate_per_sec: rate,
            burst: rate,
        }
    }

    /// Take one token, sleeping until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().unwrap();
                let elapsed = bucket.last_refill.elapsed().as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst);
                bucket.last_refill = Instant::now();

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
