use engine_core::{error::StateStoreError, queue::OutputQueue};
use std::time::Duration;
use tracing::debug;

/// Keeps the output queue from running away from its consumer.
///
/// In blocking mode the engine waits while the queue holds `limit` items or
/// more, polling every `sleep`, with no upper bound on the number of polls.
#[derive(Debug, Clone)]
pub struct BackpressureGate {
    limit: u64,
    blocking: bool,
    sleep: Duration,
}

impl BackpressureGate {
    pub fn new(page_size: usize, scale: usize, blocking: bool, sleep: Duration) -> Self {
        Self {
            limit: (page_size as u64).saturating_mul(scale as u64),
            blocking,
            sleep,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns once the queue has room for another page, reporting how many
    /// times it had to sleep.
    pub async fn wait_for_room(
        &self,
        queue: &dyn OutputQueue,
        key: &str,
    ) -> Result<u64, StateStoreError> {
        if !self.blocking {
            return Ok(0);
        }

        let mut waits = 0u64;
        loop {
            let len = queue.len(key).await?;
            if len < self.limit {
                return Ok(waits);
            }
            debug!(
                queue = key,
                len,
                limit = self.limit,
                sleep_ms = self.sleep.as_millis() as u64,
                "queue is full, waiting"
            );
            waits += 1;
            tokio::time::sleep(self.sleep).await;
        }
    }
}
