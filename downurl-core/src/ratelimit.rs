//! Rate limiter — a token bucket shared across the worker pool (spec.md §4.8).

use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Parsed `(rate, period)` — e.g. `"10/second"` becomes `(10, 1s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSpec {
    pub rate: u32,
    pub period: Duration,
}

impl FromStr for RateSpec {
    type Err = String;

    /// Accepts `"N/second"`, `"N/minute"`, `"N/hour"`, or `"N/<seconds>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, unit) = s.split_once('/').ok_or_else(|| format!("invalid rate spec: {s}"))?;
        let rate: u32 = count.trim().parse().map_err(|_| format!("invalid rate count: {count}"))?;

        let period = match unit.trim().to_lowercase().as_str() {
            "second" | "sec" | "s" => Duration::from_secs(1),
            "minute" | "min" | "m" => Duration::from_secs(60),
            "hour" | "h" => Duration::from_secs(3600),
            other => {
                let secs: u64 = other.parse().map_err(|_| format!("invalid rate period: {other}"))?;
                Duration::from_secs(secs)
            }
        };

        Ok(RateSpec { rate, period })
    }
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// A shared token bucket. `Clone` is cheap — all clones refer to the same
/// underlying state, mirroring how the pool hands one limiter to every
/// worker.
#[derive(Clone)]
pub struct RateLimiter {
    spec: Option<RateSpec>,
    state: std::sync::Arc<Mutex<BucketState>>,
}

impl RateLimiter {
    /// A limiter with no configured spec never throttles.
    pub fn unlimited() -> Self {
        RateLimiter {
            spec: None,
            state: std::sync::Arc::new(Mutex::new(BucketState { tokens: 0, last_refill: Instant::now() })),
        }
    }

    pub fn new(spec: RateSpec) -> Self {
        RateLimiter {
            spec: Some(spec),
            state: std::sync::Arc::new(Mutex::new(BucketState { tokens: spec.rate, last_refill: Instant::now() })),
        }
    }

    /// Block until a token is available, or return early if `cancelled`
    /// fires first. A full bucket refill happens once per elapsed period;
    /// this is a simple periodic refill rather than a continuous leak.
    pub async fn wait(&self, cancelled: &tokio_util::sync::CancellationToken) {
        let Some(spec) = self.spec else { return };
        if spec.rate == 0 {
            return;
        }

        loop {
            let wait_for = {
                let mut state = self.state.lock().await;
                let elapsed = state.last_refill.elapsed();
                if elapsed >= spec.period {
                    state.tokens = spec.rate;
                    state.last_refill = Instant::now();
                }

                if state.tokens > 0 {
                    state.tokens -= 1;
                    None
                } else {
                    Some(spec.period.saturating_sub(state.last_refill.elapsed()))
                }
            };

            match wait_for {
                None => return,
                Some(d) => {
                    tokio::select! {
                        _ = tokio::time::sleep(d) => {}
                        _ = cancelled.cancelled() => return,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_units() {
        assert_eq!("10/second".parse::<RateSpec>().unwrap(), RateSpec { rate: 10, period: Duration::from_secs(1) });
        assert_eq!("5/minute".parse::<RateSpec>().unwrap(), RateSpec { rate: 5, period: Duration::from_secs(60) });
        assert_eq!("1/hour".parse::<RateSpec>().unwrap(), RateSpec { rate: 1, period: Duration::from_secs(3600) });
        assert_eq!("3/30".parse::<RateSpec>().unwrap(), RateSpec { rate: 3, period: Duration::from_secs(30) });
    }

    #[test]
    fn rejects_malformed_spec() {
        assert!("not-a-rate".parse::<RateSpec>().is_err());
        assert!("10/fortnight".parse::<RateSpec>().is_err());
    }

    #[tokio::test]
    async fn unlimited_never_blocks() {
        let limiter = RateLimiter::unlimited();
        let token = tokio_util::sync::CancellationToken::new();
        for _ in 0..1000 {
            limiter.wait(&token).await;
        }
    }

    #[tokio::test]
    async fn bucket_admits_burst_up_to_rate() {
        let limiter = RateLimiter::new(RateSpec { rate: 3, period: Duration::from_secs(60) });
        let token = tokio_util::sync::CancellationToken::new();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait(&token).await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn cancellation_interrupts_wait() {
        let limiter = RateLimiter::new(RateSpec { rate: 1, period: Duration::from_secs(60) });
        let token = tokio_util::sync::CancellationToken::new();
        limiter.wait(&token).await;

        token.cancel();
        let start = Instant::now();
        limiter.wait(&token).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
