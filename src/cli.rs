//! Command line interface.
//!
//! Flags override the configuration file; without `--config` they override
//! the built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{BackendConfig, ClientTlsConfig, ProxyConfig, StrategyKind};

#[derive(Debug, Parser)]
#[command(name = "tricky-proxy")]
#[command(version, about = "Migration proxy: serve from the target, lazily copy misses from donors", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080.
    #[arg(long)]
    pub listen: Option<String>,

    /// Target cluster as host:port.
    #[arg(long)]
    pub target: Option<String>,

    /// Target scheme (http or https).
    #[arg(long)]
    pub target_scheme: Option<String>,

    /// Pre-encoded basic auth credential for the target.
    #[arg(long)]
    pub auth: Option<String>,

    /// Donor clusters, comma separated host:port list.
    #[arg(long, value_delimiter = ',')]
    pub donors: Vec<String>,

    /// Donor scheme (http or https).
    #[arg(long)]
    pub donor_scheme: Option<String>,

    /// Client certificate (PEM) presented to donors.
    #[arg(long, requires = "key")]
    pub cert: Option<PathBuf>,

    /// Private key (PEM) matching --cert.
    #[arg(long, requires = "cert")]
    pub key: Option<PathBuf>,

    /// Virtual space token for target paths.
    #[arg(long)]
    pub space: Option<String>,

    /// Enable the secondary-index aware strategy.
    #[arg(long)]
    pub riak: bool,

    /// File of expressions never falling back to donors.
    #[arg(long)]
    pub skip_list: Option<PathBuf>,

    /// File of expressions rejected outright.
    #[arg(long)]
    pub stop_list: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Apply every flag that was given on top of `config`.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(listen) = &self.listen {
            config.listener.bind_address = listen.clone();
        }
        if let Some(target) = &self.target {
            config.target.address = target.clone();
        }
        if let Some(scheme) = &self.target_scheme {
            config.target.scheme = scheme.clone();
        }
        if let Some(auth) = &self.auth {
            config.target.auth = Some(auth.clone());
        }

        if !self.donors.is_empty() {
            config.donors = self
                .donors
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .map(BackendConfig::http)
                .collect();
        }
        for donor in &mut config.donors {
            if let Some(scheme) = &self.donor_scheme {
                donor.scheme = scheme.clone();
            }
            if let (Some(cert), Some(key)) = (&self.cert, &self.key) {
                donor.tls = Some(ClientTlsConfig {
                    cert_path: cert.clone(),
                    key_path: key.clone(),
                    accept_invalid_certs: true,
                });
            }
        }

        if let Some(space) = &self.space {
            config.migration.space = space.clone();
        }
        if self.riak {
            config.migration.strategy = StrategyKind::SecondaryIndex;
        }
        if let Some(path) = &self.skip_list {
            config.filters.skip_list = Some(path.clone());
        }
        if let Some(path) = &self.stop_list {
            config.filters.stop_list = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}
