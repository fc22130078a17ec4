//! Keeps the transport's receive loop alive across transient failures.
//!
//! Consecutive failures back off exponentially up to a cap; reaching the retry
//! ceiling stops the loop for good. A successful connect resets the counter.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{Error, Result};

/// A transport whose receive loop can be (re)started by the supervisor.
#[async_trait]
pub trait Transport: Send {
    /// Establish the connection. Success moves the supervisor to `Running`.
    async fn connect(&mut self) -> Result<()>;

    /// Block while receiving. `Ok` means an orderly shutdown was requested.
    async fn run(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Connecting,
    Running,
    Backoff,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            max_retries: 10,
        }
    }
}

impl BackoffPolicy {
    /// Delay before reconnecting after the `retry`-th consecutive failure (1-based):
    /// `min(base * 2^(retry - 1), max)`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

pub struct Supervisor {
    policy: BackoffPolicy,
    state: SupervisorState,
    retries: u32,
}

impl Supervisor {
    #[must_use]
    pub const fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: SupervisorState::Connecting,
            retries: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SupervisorState {
        self.state
    }

    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Drive `transport` until it shuts down cleanly or the retry ceiling is hit.
    pub async fn run<T: Transport>(&mut self, transport: &mut T) -> Result<()> {
        self.state = SupervisorState::Connecting;
        self.retries = 0;

        loop {
            info!("Attempting to connect transport...");
            let outcome = match transport.connect().await {
                Ok(()) => {
                    self.state = SupervisorState::Running;
                    self.retries = 0;
                    info!("Transport connected, receiving updates");
                    transport.run().await
                }
                Err(e) => Err(e),
            };

            let err = match outcome {
                Ok(()) => {
                    self.state = SupervisorState::Stopped;
                    info!("Transport stopped");
                    return Ok(());
                }
                Err(e) => e,
            };

            self.state = SupervisorState::Backoff;
            self.retries += 1;
            error!("Transport failed (attempt {}): {err}", self.retries);

            if self.retries >= self.policy.max_retries {
                self.state = SupervisorState::Stopped;
                error!(
                    "Max retries ({}) exceeded, shutting down",
                    self.policy.max_retries
                );
                return Err(Error::RetriesExhausted {
                    attempts: self.retries,
                    last_error: err.to_string(),
                });
            }

            let delay = self.policy.delay_for(self.retries);
            warn!("Reconnecting in {}s...", delay.as_secs());
            sleep(delay).await;
            self.state = SupervisorState::Connecting;
        }
    }
}
