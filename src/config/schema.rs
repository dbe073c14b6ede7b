//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::Deserialize;

/// Root configuration for the migration proxy.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// The writable cluster that becomes the source of truth.
    pub target: BackendConfig,

    /// Legacy read-only clusters consulted on a miss.
    pub donors: Vec<BackendConfig>,

    /// Per-call timeout and transport retries.
    pub transport: TransportConfig,

    /// Router-level donor retry configuration.
    pub retries: RetryConfig,

    /// Strategy and virtual space settings.
    pub migration: MigrationConfig,

    /// Stop and skip lists.
    pub filters: FilterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound request body that is buffered, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// A single upstream cluster endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address as `host:port`.
    pub address: String,

    /// `http` or `https`.
    pub scheme: String,

    /// Pre-encoded basic auth credential, sent as `Authorization: Basic <auth>`.
    pub auth: Option<String>,

    /// Optional client certificate.
    pub tls: Option<ClientTlsConfig>,
}

impl BackendConfig {
    /// Plain HTTP backend at `address`.
    pub fn http(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Split `address` into host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let (host, port) = self.address.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        port.parse().ok().map(|port| (host, port))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8098".to_string(),
            scheme: "http".to_string(),
            auth: None,
            tls: None,
        }
    }
}

/// Client certificate used when talking to a backend over TLS.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientTlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,

    /// Skip server certificate verification.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

fn default_accept_invalid_certs() -> bool {
    true
}

/// Per-call transport settings shared by every backend client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Timeout of a single backend call in milliseconds.
    pub request_timeout_ms: u64,

    /// Retries after the first attempt on transport errors.
    pub retry_attempts: u32,

    /// Fixed delay between transport retries in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 4000,
            retry_attempts: 10,
            retry_delay_ms: 500,
        }
    }
}

/// Router-level retry configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of donor fallback cycles per request.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds (0 = retry at once).
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 1000,
        }
    }
}

/// Which pass-through / write-back policy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Plain HTTP semantics.
    #[default]
    Default,
    /// Secondary-index aware policy for Riak-style stores.
    #[serde(alias = "riak")]
    SecondaryIndex,
}

/// Migration behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub strategy: StrategyKind,

    /// Virtual space token applied to target paths. Empty disables it.
    pub space: String,

    /// Expression identifying secondary-index query paths.
    pub index_pattern: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Default,
            space: String::new(),
            index_pattern: "^/buckets/.*/index/".to_string(),
        }
    }
}

/// Stop and skip lists.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// File with one expression per line; matching URLs are rejected.
    pub stop_list: Option<PathBuf>,

    /// File with one expression per line; matching URLs never fall back to a donor.
    pub skip_list: Option<PathBuf>,

    /// Inline stop expressions, merged with `stop_list`.
    pub stop_patterns: Vec<String>,

    /// Inline skip expressions, merged with `skip_list`.
    pub skip_patterns: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
