use core::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Slowest permitted pace.
pub const MIN_REQUESTS_PER_SECOND: u32 = 1;

/// Paces outbound requests to at most `R` per second.
///
/// The first caller after construction or [`RateLimiter::reconfigure`] goes
/// through immediately; later callers wait for the next tick of a `1s / R`
/// interval. Waiting is not cancellable, but it is bounded by the interval.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<TickState>,
}

#[derive(Debug)]
struct TickState {
    period: Duration,
    primed: bool,

    // Created on first use so construction does not need a running runtime.
    interval: Option<Interval>,
}

impl TickState {
    fn new(requests_per_second: u32) -> Self {
        let rps = requests_per_second.max(MIN_REQUESTS_PER_SECOND);
        let period = Duration::from_secs(1) / rps;
        Self {
            period: if period.is_zero() { Duration::from_secs(1) } else { period },
            primed: false,
            interval: None,
        }
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            state: Mutex::new(TickState::new(requests_per_second)),
        }
    }

    /// Wait for the next rate slot.
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if !state.primed {
            state.primed = true;
            let mut interval = tokio::time::interval_at(Instant::now() + state.period, state.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            state.interval = Some(interval);
            return;
        }

        if let Some(interval) = state.interval.as_mut() {
            let _ = interval.tick().await;
        }
    }

    /// Change the pace, dropping any pending tick and re-priming.
    pub async fn reconfigure(&self, requests_per_second: u32) {
        *self.state.lock().await = TickState::new(requests_per_second);
    }

    /// Interval between slots.
    pub async fn period(&self) -> Duration {
        self.state.lock().await.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_is_immediate() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn later_calls_are_paced() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }

        // one primed slot plus four ticks of 100ms
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn window_never_exceeds_budget() {
        let rps = 20;
        let limiter = RateLimiter::new(rps);
        let start = Instant::now();
        let mut stamps = Vec::new();
        for _ in 0..60 {
            limiter.wait().await;
            stamps.push(start.elapsed());
        }

        let window = Duration::from_secs(1);
        for (i, begin) in stamps.iter().enumerate() {
            let in_window = stamps[i..].iter().take_while(|t| **t - *begin < window).count();
            assert!(in_window <= rps as usize + 1, "{in_window} requests within one second");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_reprimes() {
        let limiter = RateLimiter::new(1);
        limiter.wait().await;
        limiter.reconfigure(2).await;

        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(limiter.period().await, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rate_is_clamped() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.period().await, Duration::from_secs(1));
    }
}
