//! Rolling-window rate limiter.
//!
//! Allows at most `max_requests` acquisitions within any `window`. Callers
//! over the limit are delayed until the oldest acquisition leaves the
//! window; they are never rejected.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests within one window.
    pub max_requests: usize,
    /// Length of the rolling window.
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 80,
            window: Duration::from_secs(60),
        }
    }
}

/// Thread-safe rolling-window limiter.
///
/// Share one instance (behind an `Arc`) between every component that calls
/// the same vault so they are paced together.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            issued: Mutex::new(VecDeque::with_capacity(config.max_requests)),
            config,
        }
    }

    /// Try to take a slot without waiting.
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut issued = self.lock();
        self.prune(&mut issued, now);
        if issued.len() < self.config.max_requests {
            issued.push_back(now);
            true
        } else {
            false
        }
    }

    /// Time until a slot frees up (zero if one is free now).
    pub fn wait_time(&self) -> Duration {
        let now = Instant::now();
        let mut issued = self.lock();
        self.prune(&mut issued, now);
        if issued.len() < self.config.max_requests {
            return Duration::ZERO;
        }
        match issued.front() {
            Some(oldest) => (*oldest + self.config.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Take a slot, sleeping as long as the window is full.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            let wait = self.wait_time();
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limited, delaying request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Slots currently in use within the window.
    pub fn in_flight(&self) -> usize {
        let mut issued = self.lock();
        self.prune(&mut issued, Instant::now());
        issued.len()
    }

    fn prune(&self, issued: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = issued.front() {
            if now.duration_since(*oldest) >= self.config.window {
                issued.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        self.issued.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn acquire_within_capacity() {
        let rl = RateLimiter::new(RateLimiterConfig {
            max_requests: 10,
            window: Duration::from_secs(60),
        });
        for _ in 0..10 {
            assert!(rl.try_acquire(), "should succeed within capacity");
        }
        assert!(!rl.try_acquire(), "11th should not fit the window");
        assert_eq!(rl.in_flight(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn eighty_first_request_is_delayed_not_dropped() {
        let rl = RateLimiter::default();
        let start = Instant::now();
        for _ in 0..80 {
            rl.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        rl.acquire().await;
        assert!(
            start.elapsed() >= Duration::from_secs(60),
            "81st request ran after {:?}",
            start.elapsed()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn window_rolls() {
        let rl = RateLimiter::new(RateLimiterConfig {
            max_requests: 2,
            window: Duration::from_secs(10),
        });
        rl.acquire().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        rl.acquire().await;
        assert_eq!(rl.wait_time(), Duration::from_secs(6));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(rl.try_acquire(), "first slot should have left the window");
        assert!(!rl.try_acquire());
    }
}
