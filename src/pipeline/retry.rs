//! Bounded retry around collaborator calls

use crate::config::PipelineConfig;
use crate::error::CollaboratorError;
use crate::metrics::METRICS;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Upper bound on a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff())
    }

    /// Exponential backoff after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff.saturating_mul(multiplier).min(MAX_BACKOFF)
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
///
/// Only transient errors are retried.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    collaborator: &str,
    mut op: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "{} attempt {} failed: {}, retrying in {:?}",
                    collaborator, attempt, e, backoff
                );
                METRICS.record_retry(collaborator);
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                error!("{} failed after {} attempts: {}", collaborator, attempt, e);
                return Err(e);
            }
        }
    }
}
