//! Retry strategy - exponential backoff with jitter for store calls

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Retry budget and backoff shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// First backoff delay (milliseconds)
    pub initial_delay_ms: u64,
    /// Backoff cap (milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier per attempt
    pub backoff_multiplier: f64,
    /// Jitter as a fraction of the delay
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1, // 10% jitter
        }
    }
}

/// Executes operations under the configured retry budget
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    /// Build from config
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Build with the default budget
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Calculate delay for nth retry with exponential backoff + jitter
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);

        // Cap at max_delay
        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        // Jitter spreads out competing retries
        let jitter_range = capped_delay * self.config.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * jitter_range * 2.0;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }

    /// Execute `operation`, retrying transient failures
    ///
    /// Business and input errors are returned on the first attempt;
    /// retrying a failed precondition cannot succeed.
    pub async fn execute_with_retry<F, Fut, T>(&self, operation: F, operation_name: &str) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.calculate_delay(attempt - 1);
                warn!(
                    "retry attempt {}/{} for {} after {:?}",
                    attempt, self.config.max_retries, operation_name, delay
                );
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            "operation {} succeeded on retry attempt {}/{}",
                            operation_name, attempt, self.config.max_retries
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !Self::is_retryable(&e) {
                        return Err(e);
                    }

                    warn!(
                        "attempt {}/{} failed for {}: {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        operation_name,
                        e
                    );

                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Unavailable("retry budget exhausted".to_string())))
    }

    /// Only transient store failures are worth another attempt
    fn is_retryable(error: &Error) -> bool {
        matches!(error, Error::Storage(_))
    }
}
