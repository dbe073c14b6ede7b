//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the target client (namespace codec, credentials) and read-only donors
//! - Compile strategy and path lists
//! - Assemble the [`MigrationRouter`]

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::{BackendClient, BackendError};
use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::load_balancer::ClientPool;
use crate::namespace::VirtualSpace;
use crate::resilience::DonorRetry;
use crate::routing::{FilterError, MigrationRouter, PathFilter};
use crate::strategy::{build_strategy, StrategyError};

/// Any failure that must stop the process before traffic is accepted.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("backend setup failed: {0}")]
    Backend(#[from] BackendError),

    #[error("path list: {0}")]
    Filter(#[from] FilterError),

    #[error("strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error("virtual space: {0}")]
    Namespace(#[from] regex::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build the router described by `config`.
pub fn build_router(config: &ProxyConfig) -> Result<MigrationRouter, StartupError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let mut target = BackendClient::from_config("target", &config.target, &config.transport)?;
    if let Some(space) = VirtualSpace::new(&config.migration.space)? {
        tracing::info!(space = %space.space(), "Target paths isolated in virtual space");
        target = target.codec(Arc::new(space));
    }
    let target = Arc::new(target.build()?);

    let donors = config
        .donors
        .iter()
        .enumerate()
        .map(|(i, donor)| -> Result<Arc<BackendClient>, StartupError> {
            let client = BackendClient::from_config(format!("donor-{i}"), donor, &config.transport)?
                .read_only()
                .build()?;
            Ok(Arc::new(client))
        })
        .collect::<Result<ClientPool, StartupError>>()?;

    let strategy = build_strategy(&config.migration)?;

    let filters = &config.filters;
    let stop_list = build_filter(filters.stop_list.as_deref(), &filters.stop_patterns)?;
    let skip_list = build_filter(filters.skip_list.as_deref(), &filters.skip_patterns)?;

    tracing::info!(
        target = %target.base_url(),
        donors = donors.len(),
        strategy = strategy.name(),
        stop_patterns = stop_list.len(),
        skip_patterns = skip_list.len(),
        max_attempts = config.retries.max_attempts,
        "Migration router ready"
    );

    Ok(MigrationRouter::new(target, donors, strategy)
        .with_stop_list(stop_list)
        .with_skip_list(skip_list)
        .with_retry(DonorRetry::from(&config.retries)))
}

fn build_filter(file: Option<&Path>, patterns: &[String]) -> Result<PathFilter, FilterError> {
    let filter = PathFilter::from_patterns(patterns)?;
    match file {
        Some(path) => Ok(filter.merge(PathFilter::from_file(path)?)),
        None => Ok(filter),
    }
}
