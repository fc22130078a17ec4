//! Humanizing delay charged once per inbound message before dispatch.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a duration drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub struct HumanPacer {
    min: Duration,
    max: Duration,
}

impl HumanPacer {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

impl Default for HumanPacer {
    fn default() -> Self {
        Self::new(Duration::from_secs(4), Duration::from_secs(6))
    }
}

#[async_trait]
impl Pacer for HumanPacer {
    async fn pause(&self) {
        let delay = self.sample();
        debug!("Pausing {}ms before dispatch", delay.as_millis());
        sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_bounds() {
        let pacer = HumanPacer::default();
        for _ in 0..200 {
            let delay = pacer.sample();
            assert!(delay >= Duration::from_secs(4));
            assert!(delay <= Duration::from_secs(6));
        }
    }

    #[test]
    fn swapped_bounds_are_normalized() {
        let pacer = HumanPacer::new(Duration::from_millis(50), Duration::from_millis(10));
        let delay = pacer.sample();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps_for_sampled_delay() {
        let pacer = HumanPacer::new(Duration::from_secs(4), Duration::from_secs(6));
        let started = tokio::time::Instant::now();
        pacer.pause().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed <= Duration::from_secs(6) + Duration::from_millis(5));
    }
}
