//! Delulu Page Queues
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! delulu-internals/page-queues
//! Paces calls to the outside world: rendered page loads and message
//! deliveries. Limits how many run at once, waits a settle delay after each
//! successful call, and retries failures with exponential backoff and jitter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time;

#[derive(Debug, Error)]
pub enum PageQueueError {
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("queue is closed")]
    QueueClosed,
}

#[derive(Clone, Debug)]
pub struct PageQueue {
    permits: Arc<Semaphore>,
    initial_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
    max_retries: u32,
    settle_delay: Duration,
}

impl Default for PageQueue {
    fn default() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.5,
            max_retries: 3,
            settle_delay: Duration::ZERO,
        }
    }
}

impl PageQueue {
    /// Queue running at most `max_concurrent` calls at a time.
    pub fn with_concurrency_limit(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            ..Default::default()
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self.max_delay = self.max_delay.max(delay);
        self
    }

    /// Pause held after every successful call, before the permit is released.
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Runs `f` under a permit, retrying failures up to `max_retries` times.
    pub async fn with_retry<T, F, Fut>(&self, mut f: F) -> Result<T, PageQueueError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, anyhow::Error>> + Send,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PageQueueError::QueueClosed)?;

        let mut attempts = 0;
        let mut delay = self.initial_delay;
        loop {
            attempts += 1;
            match f().await {
                Ok(value) => {
                    if !self.settle_delay.is_zero() {
                        time::sleep(self.settle_delay).await;
                    }
                    return Ok(value);
                }
                Err(e) if attempts > self.max_retries => {
                    return Err(PageQueueError::MaxRetriesExceeded {
                        attempts,
                        source: e,
                    });
                }
                Err(e) => {
                    let wait = self.apply_jitter(delay);
                    tracing::debug!(
                        "Attempt {} failed ({:#}), retrying in {:?}",
                        attempts,
                        e,
                        wait
                    );
                    time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, self.max_delay);
                }
            }
        }
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }
        let jitter_ms = (delay.as_millis() as f64 * self.jitter_factor) as u64;
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        delay + Duration::from_millis(extra)
    }
}
