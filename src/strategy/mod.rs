//! Migration strategy subsystem.
//!
//! # Data Flow
//! ```text
//! Target answered
//!     → needs_proxy_pass(target response, request)
//!         false → answer from target
//!         true  → router fetches from a donor
//!     → post_process(donor, target, donor response, request)
//!         → Ok(true)  router stores the donor body into target
//!         → Ok(false) nothing more to store (or migrate.rs already did)
//!         → Err       request fails with POST_PROCESS
//! ```
//!
//! # Design Decisions
//! - Exactly one strategy per process, chosen at startup and shared via Arc
//! - default.rs: plain HTTP semantics (404 on GET/HEAD means "ask a donor")
//! - secondary_index.rs: adds Riak 2i handling on top of the default
//! - migrate.rs: per-key copy used by both; failures there are logged, not fatal

pub mod default;
pub mod index;
pub mod migrate;
pub mod secondary_index;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::{BackendClient, BackendRequest, BackendResponse};
use crate::config::schema::{MigrationConfig, StrategyKind};

pub use default::DefaultStrategy;
pub use index::{parse_index_keys, IndexQuery};
pub use migrate::{retrieve_key, store_response, KeyMigration, MigrationError};
pub use secondary_index::SecondaryIndexStrategy;

/// Errors raised while deciding or post-processing.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The secondary-index body is not the expected JSON document.
    #[error("INDEX_PARSE_ERROR: {0}")]
    IndexParse(#[from] serde_json::Error),

    /// The index path does not name a bucket.
    #[error("BUCKET_NOT_FOUND in {0:?}")]
    BucketNotFound(String),

    /// The index pattern does not compile.
    #[error("invalid index pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Pass-through and write-back policy.
#[async_trait]
pub trait MigrationStrategy: Send + Sync + Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether the target's answer is insufficient and a donor must be asked.
    fn needs_proxy_pass(&self, response: &BackendResponse, request: &BackendRequest) -> bool;

    /// Handle a donor answer. Returns whether the router should store the
    /// donor body into the target under the request path.
    async fn post_process(
        &self,
        donor: &BackendClient,
        target: &BackendClient,
        response: &BackendResponse,
        request: &BackendRequest,
    ) -> Result<bool, StrategyError>;
}

/// Build the strategy selected in the configuration.
pub fn build_strategy(config: &MigrationConfig) -> Result<Arc<dyn MigrationStrategy>, StrategyError> {
    let strategy: Arc<dyn MigrationStrategy> = match config.strategy {
        StrategyKind::Default => Arc::new(DefaultStrategy),
        StrategyKind::SecondaryIndex => Arc::new(SecondaryIndexStrategy::new(&config.index_pattern)?),
    };
    tracing::info!(strategy = strategy.name(), "Migration strategy selected");
    Ok(strategy)
}
