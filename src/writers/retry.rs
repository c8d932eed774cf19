//! Retry and error recovery utilities for claim submission
//!
//! Provides exponential backoff, gas bumping, and error classification
//! so transient transport failures are retried while protocol-level
//! rejections surface immediately.

use eyre::{eyre, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Transaction retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth
    pub backoff_multiplier: f64,
    /// Gas price bump percentage per retry
    pub gas_bump_percent: u32,
    /// Maximum gas price multiplier (e.g., 3 = 3x original)
    pub max_gas_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            gas_bump_percent: 20,
            max_gas_multiplier: 3.0,
        }
    }
}

impl RetryConfig {
    /// Build from the relayer configuration.
    pub fn from_relayer_config(config: &crate::config::RelayerConfig) -> Self {
        Self {
            max_retries: config.retry_attempts,
            initial_backoff: Duration::from_millis(config.retry_delay_ms),
            ..Self::default()
        }
    }

    /// Calculate backoff duration for a given attempt (0-indexed)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Calculate gas price for a given attempt
    pub fn gas_price_for_attempt(&self, base_gas_price: u128, attempt: u32) -> u128 {
        if attempt == 0 {
            return base_gas_price;
        }

        let multiplier = 1.0 + (self.gas_bump_percent as f64 / 100.0) * (attempt as f64);
        let capped_multiplier = multiplier.min(self.max_gas_multiplier);

        (base_gas_price as f64 * capped_multiplier) as u128
    }
}

/// Classifies errors for retry decisions
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorClass {
    /// Temporary failure - should retry (RPC timeout, network issues,
    /// stale account sequence)
    Transient,
    /// Transaction underpriced - retry with higher gas
    Underpriced,
    /// Nonce too low - skip (already processed)
    NonceTooLow,
    /// Nonce too high - wait for pending transactions
    NonceTooHigh,
    /// Permanent failure - do not retry (invalid params, contract error)
    Permanent,
    /// Unknown error - may retry with backoff
    Unknown,
}

/// Classify an error for retry decisions
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    // Transient errors. Cosmos sequence mismatches are transient: the
    // sequence is refetched on every submission attempt.
    if error_lower.contains("timeout")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
        || error_lower.contains("account sequence mismatch")
    {
        return ErrorClass::Transient;
    }

    // Gas price errors
    if error_lower.contains("underpriced")
        || error_lower.contains("replacement transaction")
        || error_lower.contains("gas price too low")
        || error_lower.contains("max fee per gas less than")
        || error_lower.contains("insufficient fee")
    {
        return ErrorClass::Underpriced;
    }

    // Nonce errors
    if error_lower.contains("nonce too low")
        || error_lower.contains("already known")
        || error_lower.contains("tx already exists")
    {
        return ErrorClass::NonceTooLow;
    }

    if error_lower.contains("nonce too high") {
        return ErrorClass::NonceTooHigh;
    }

    // Permanent errors
    if error_lower.contains("reverted")
        || error_lower.contains("execution reverted")
        || error_lower.contains("invalid signature")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("out of gas")
        || error_lower.contains("invalid parameters")
        || error_lower.contains("unauthorized")
    {
        return ErrorClass::Permanent;
    }

    ErrorClass::Unknown
}

/// Action to take after a failed attempt
#[derive(Debug, Clone)]
enum RetryAction {
    RetryAfter(Duration),
    RetryWithGas { backoff: Duration, gas_price: u128 },
    Skip,
    DeadLetter,
}

fn next_action(
    config: &RetryConfig,
    attempt: u32,
    error: &str,
    last_gas_price: Option<u128>,
) -> RetryAction {
    match classify_error(error) {
        ErrorClass::Permanent => RetryAction::DeadLetter,
        ErrorClass::NonceTooLow => RetryAction::Skip,
        ErrorClass::NonceTooHigh => RetryAction::RetryAfter(config.max_backoff),
        ErrorClass::Underpriced => {
            if !config.should_retry(attempt) {
                return RetryAction::DeadLetter;
            }
            let new_gas = config.gas_price_for_attempt(
                last_gas_price.unwrap_or(1_000_000_000), // 1 gwei default
                attempt,
            );
            RetryAction::RetryWithGas {
                backoff: Duration::from_secs(1),
                gas_price: new_gas,
            }
        }
        ErrorClass::Transient | ErrorClass::Unknown => {
            if !config.should_retry(attempt) {
                return RetryAction::DeadLetter;
            }
            RetryAction::RetryAfter(config.backoff_for_attempt(attempt))
        }
    }
}

/// Execute a submission with retry logic. The operation receives the
/// attempt number and an optional bumped gas price.
pub async fn with_retry<F, T, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut(u32, Option<u128>) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    let mut gas_price: Option<u128> = None;

    loop {
        match operation(attempt, gas_price).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let error_str = e.to_string();
                attempt += 1;

                match next_action(config, attempt, &error_str, gas_price) {
                    RetryAction::RetryAfter(backoff) => {
                        warn!(
                            attempt,
                            max = config.max_retries,
                            ?backoff,
                            error = %error_str,
                            "Retrying after backoff"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    RetryAction::RetryWithGas {
                        backoff,
                        gas_price: new_gas,
                    } => {
                        warn!(
                            attempt,
                            old_gas = ?gas_price,
                            new_gas,
                            "Retrying with bumped gas"
                        );
                        gas_price = Some(new_gas);
                        tokio::time::sleep(backoff).await;
                    }
                    RetryAction::Skip => {
                        debug!("Skipping submission, already processed");
                        return Err(eyre!("Skipped: {}", error_str));
                    }
                    RetryAction::DeadLetter => {
                        warn!(error = %error_str, "Giving up on submission");
                        return Err(eyre!("Dead letter: {}", error_str));
                    }
                }
            }
        }
    }
}
