//! In-memory token bucket, one bucket per `(tenant_id OR client_ip)`.
//! Acceptable for single-instance deployments; a distributed limiter is
//! an extension point the protocol boundary (429 on excess) does not
//! change.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::RateLimitError;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    per_minute: u32,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute: per_minute.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Consume one token for `key`. Returns `Err` if none remain.
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        let capacity = self.per_minute as f64;
        let refill_per_sec = capacity / 60.0;
        let now = Instant::now();

        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * refill_per_sec).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens < 1.0 {
            return Err(RateLimitError { key: key.to_string() });
        }
        bucket.tokens -= 1.0;
        Ok(())
    }

    /// Drop buckets untouched for longer than `idle_for`, so a
    /// long-running process does not accumulate one entry per client
    /// forever.
    pub fn sweep_idle(&self, idle_for: Duration) {
        let now = Instant::now();
        self.buckets
            .lock()
            .expect("rate limiter lock poisoned")
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < idle_for);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_then_refuses() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.check("tenant-a").is_ok());
        assert!(limiter.check("tenant-a").is_ok());
        assert!(limiter.check("tenant-a").is_err());
    }

    #[test]
    fn buckets_are_independent_per_key() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("tenant-a").is_ok());
        assert!(limiter.check("tenant-b").is_ok());
    }
}
