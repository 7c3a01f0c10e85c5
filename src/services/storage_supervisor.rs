use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{dao::storage::StorageResult, state::store::QuizStore};

const INITIAL_DELAY: Duration = Duration::from_millis(250);
const MAX_DELAY: Duration = Duration::from_secs(4);
const MAX_ATTEMPTS: u32 = 3;

/// Backoff used when writing the quiz store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts, including the first one.
    pub max_attempts: u32,
    /// Pause after the first failure; doubled after each further failure.
    pub initial_delay: Duration,
    /// Upper bound for the pause.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_delay: INITIAL_DELAY,
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Write the store, retrying failed writes with exponential backoff.
///
/// Returns the last error once every attempt failed; the store stays dirty in that case.
pub async fn persist_with_retry(store: &mut QuizStore, policy: RetryPolicy) -> StorageResult<()> {
    let mut delay = policy.initial_delay;
    let mut attempt = 1;

    loop {
        match store.persist().await {
            Ok(()) => {
                if attempt > 1 {
                    info!(attempt, "quiz store written after retry");
                }
                return Ok(());
            }
            Err(err) if attempt < policy.max_attempts => {
                warn!(attempt, error = %err, "quiz store write failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
            Err(err) => {
                warn!(attempt, error = %err, "exhausted quiz store write attempts");
                return Err(err);
            }
        }
    }
}
