use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Minimum-interval limiter for one external source
///
/// Callers acquire before every upstream call. The lock is held across
/// the wait, so concurrent jobs hitting the same source line up and
/// their call starts stay at least `min_interval` apart.
#[derive(Debug)]
pub struct SourceRateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl SourceRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        SourceRateLimiter {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Waits out the remainder of the interval, then claims the next slot
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = SourceRateLimiter::new(Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_consecutive_acquires_are_spaced() {
        let limiter = SourceRateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = SourceRateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_serialize() {
        let limiter = Arc::new(SourceRateLimiter::new(Duration::from_millis(40)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Three call starts need at least two full intervals between them
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
