//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend addresses and schemes
//! - Validate value ranges (timeouts > 0, attempts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{BackendConfig, ProxyConfig, StrategyKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no donors configured")]
    NoDonors,

    #[error("{role}: address {address:?} is not host:port")]
    InvalidAddress { role: String, address: String },

    #[error("{role}: unsupported scheme {scheme:?}")]
    UnsupportedScheme { role: String, scheme: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("index_pattern must not be empty in secondary_index mode")]
    EmptyIndexPattern,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_backend("target", &config.target, &mut errors);
    if config.donors.is_empty() {
        errors.push(ValidationError::NoDonors);
    }
    for (i, donor) in config.donors.iter().enumerate() {
        check_backend(&format!("donor[{i}]"), donor, &mut errors);
    }

    if config.transport.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero("transport.request_timeout_ms"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero("retries.max_attempts"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }
    if config.migration.strategy == StrategyKind::SecondaryIndex
        && config.migration.index_pattern.trim().is_empty()
    {
        errors.push(ValidationError::EmptyIndexPattern);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend(role: &str, backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    if backend.host_port().is_none() {
        errors.push(ValidationError::InvalidAddress {
            role: role.to_string(),
            address: backend.address.clone(),
        });
    }
    if backend.scheme != "http" && backend.scheme != "https" {
        errors.push(ValidationError::UnsupportedScheme {
            role: role.to_string(),
            scheme: backend.scheme.clone(),
        });
    }
}
