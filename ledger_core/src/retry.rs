//! Exponential-backoff helper and a cancellable sleep primitive shared by the
//! confirmation engine, the contract-query retry loop, and the log-stream
//! reconnect path.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for an exponential backoff sequence.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Produces successive backoff delays, capped at `max`, never panicking on
/// pathological multipliers.
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current: config.initial,
            config,
        }
    }

    /// Returns the delay to use for the next attempt and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let scaled = self.current.as_secs_f64() * self.config.multiplier;
        self.current = Duration::from_secs_f64(scaled).min(self.config.max);
        delay
    }
}

/// The outcome of a cancellable sleep.
#[derive(Debug, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    Cancelled,
}

/// Sleep for `duration`, waking early (and reporting [`SleepOutcome::Cancelled`])
/// if `token` fires first. Every suspension point in the confirmation engine,
/// transaction queue, and contract-query retry loop funnels through this.
pub async fn cancellable_sleep(duration: Duration, token: &CancellationToken) -> SleepOutcome {
    tokio::select! {
        _ = tokio::time::sleep(duration) => SleepOutcome::Elapsed,
        _ = token.cancelled() => SleepOutcome::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_capped() {
        let mut backoff = Backoff::new(BackoffConfig {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(350),
            multiplier: 2.0,
        });
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn cancellable_sleep_wakes_on_cancel() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            child.cancel();
        });
        let outcome = cancellable_sleep(Duration::from_secs(10), &token).await;
        assert_eq!(outcome, SleepOutcome::Cancelled);
    }
}
