//! Reconnect delay policies for the push channel

use std::time::Duration;

use crate::config::{ReconnectConfig, StrategyKind};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Decides how long to wait before the next connection attempt
pub trait ReconnectStrategy: Send + Sync {
    /// Delay before the next attempt. Called exactly once per lost or failed
    /// connection.
    fn next_delay(&mut self) -> Duration;

    /// Called after a successful handshake
    fn reset(&mut self) {}
}

/// Same delay forever
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectStrategy for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.delay
    }
}

/// Doubles on every consecutive failure up to `max`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }
}

impl ReconnectStrategy for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current.saturating_mul(2), self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Build the strategy selected in config
pub fn from_config(config: &ReconnectConfig) -> Box<dyn ReconnectStrategy> {
    let delay = Duration::from_secs(config.delay_secs);
    match config.strategy {
        StrategyKind::Fixed => Box::new(FixedDelay::new(delay)),
        StrategyKind::Backoff => Box::new(ExponentialBackoff::new(
            delay,
            Duration::from_secs(config.max_delay_secs).max(delay),
        )),
    }
}
