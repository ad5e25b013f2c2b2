//! Reconnection delays.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with up to 10% jitter.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    /// Creates a backoff starting at `initial` and capped at `max`.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next attempt; doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.max);

        let jitter_ceiling = u64::try_from(base.as_millis() / 10).unwrap_or(u64::MAX);
        let jitter = if jitter_ceiling == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ceiling)
        };
        base + Duration::from_millis(jitter)
    }

    /// Starts over after a successful connection.
    pub const fn reset(&mut self) {
        self.current = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_up_to_max() {
        let mut backoff = ReconnectBackoff::new(Duration::from_millis(100), Duration::from_millis(350));

        let delays: Vec<u128> = (0..4).map(|_| backoff.next_delay().as_millis()).collect();

        assert!((100..=110).contains(&delays[0]));
        assert!((200..=220).contains(&delays[1]));
        assert!((350..=385).contains(&delays[2]));
        assert!((350..=385).contains(&delays[3]));
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut backoff = ReconnectBackoff::new(Duration::from_millis(100), Duration::from_secs(30));
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();

        assert!(backoff.next_delay() <= Duration::from_millis(110));
    }
}
