use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};

/// Enforces a minimum start-to-start gap between outbound calls.
///
/// The last-call instant lives behind an async mutex that stays locked for the
/// whole wait, so concurrent callers queue up and are released one cooldown
/// apart. Share one limiter (via `Arc`) between everything that talks to the
/// same upstream.
pub struct CooldownLimiter {
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl CooldownLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, Arc::new(SystemClock))
    }

    pub fn with_clock(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            cooldown,
            last_call: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Wait until the cooldown since the previous call has passed, then claim the slot.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.cooldown {
                let wait = self.cooldown - elapsed;
                tracing::debug!("Rate limiter: waiting {:.2}s before next request", wait.as_secs_f64());
                self.clock.sleep(wait).await;
            }
        }

        *last_call = Some(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let clock = Arc::new(ManualClock::new());
        let limiter = CooldownLimiter::with_clock(Duration::from_secs(2), clock.clone());

        limiter.acquire().await;
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_waits_only_for_remaining_cooldown() {
        let clock = Arc::new(ManualClock::new());
        let limiter = CooldownLimiter::with_clock(Duration::from_secs(2), clock.clone());

        limiter.acquire().await;
        clock.advance(Duration::from_millis(500));
        limiter.acquire().await;

        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1500)]);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_no_wait_after_cooldown_elapsed() {
        let clock = Arc::new(ManualClock::new());
        let limiter = CooldownLimiter::with_clock(Duration::from_secs(2), clock.clone());

        limiter.acquire().await;
        clock.advance(Duration::from_secs(5));
        limiter.acquire().await;

        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_spaced() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(CooldownLimiter::with_clock(Duration::from_secs(1), clock.clone()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            let clock = Arc::clone(&clock);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                clock.elapsed()
            }));
        }

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }
}
