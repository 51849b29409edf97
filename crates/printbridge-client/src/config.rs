//! Connection tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on one WebSocket handshake.
    pub handshake_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Delay between reconnect attempts.
///
/// There is no attempt cap: the client keeps trying for as long as it
/// lives. The delay grows by `multiplier` after each failed attempt, up to
/// `max_delay`, and resets once a handshake succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Retry right away every time.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub(crate) fn backoff(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            current: self.initial_delay,
        }
    }
}

/// Running delay state for one reconnect loop.
#[derive(Debug)]
pub(crate) struct Backoff {
    policy: ReconnectPolicy,
    current: Duration,
}

impl Backoff {
    /// Delay to wait now; advances the schedule.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.policy.max_delay);
        let grown = (self.current.as_nanos() as f64 * self.policy.multiplier.max(1.0)).round();
        self.current = if grown >= self.policy.max_delay.as_nanos() as f64 {
            self.policy.max_delay
        } else {
            Duration::from_nanos(grown as u64)
        };
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.policy.initial_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_to_cap() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        };
        let mut backoff = policy.backoff();
        let delays: Vec<Duration> = (0..5).map(|_| backoff.next_delay()).collect();
        let expected: Vec<Duration> = [100, 200, 400, 500, 500]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(delays, expected);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn immediate_never_waits() {
        let mut backoff = ReconnectPolicy::immediate().backoff();
        for _ in 0..3 {
            assert_eq!(backoff.next_delay(), Duration::ZERO);
        }
    }
}
