//! Retry policies.
//!
//! # Responsibilities
//! - Bound transport-level retries inside a backend client
//! - Bound donor re-selection inside the router
//!
//! # Design Decisions
//! - Transport retries replay the buffered request verbatim after a fixed delay
//! - Donor retries pick the next donor from the pool and re-run the whole cycle
//! - Attempt numbers are 1-based; the first attempt is not a retry

use std::time::Duration;

use crate::config::schema::{RetryConfig, TransportConfig};
use crate::resilience::backoff::calculate_backoff;

/// Retry policy for transport failures (connect errors, timeouts) of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRetry {
    /// Retries allowed after the first attempt.
    pub retries: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl TransportRetry {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total attempts, first one included.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Whether another attempt may follow attempt number `attempt`.
    pub fn allows_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}

impl From<&TransportConfig> for TransportRetry {
    fn from(config: &TransportConfig) -> Self {
        Self::new(config.retry_attempts, Duration::from_millis(config.retry_delay_ms))
    }
}

impl Default for TransportRetry {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(500))
    }
}

/// Retry policy for the router's donor fallback cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonorRetry {
    /// Total attempts, first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl DonorRetry {
    /// Whether another cycle may follow attempt number `attempt`.
    pub fn allows_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Pause before the attempt following `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl From<&RetryConfig> for DonorRetry {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl Default for DonorRetry {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
