//! Riak secondary-index (2i) aware migration policy.
//!
//! An index query answered by the target with an empty key list is treated
//! as a miss. When a donor answers the same query, every listed key is copied
//! into the target individually so later index queries find them there.

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use regex::Regex;

use crate::backend::{BackendClient, BackendRequest, BackendResponse};
use crate::strategy::default::DefaultStrategy;
use crate::strategy::index::{parse_index_keys, IndexQuery};
use crate::strategy::migrate::{retrieve_key, KeyMigration};
use crate::strategy::{MigrationStrategy, StrategyError};

#[derive(Debug, Clone)]
pub struct SecondaryIndexStrategy {
    pattern: Regex,
    fallback: DefaultStrategy,
}

impl SecondaryIndexStrategy {
    /// `pattern` identifies index query paths, e.g. `^/buckets/.*/index/`.
    pub fn new(pattern: &str) -> Result<Self, StrategyError> {
        let pattern = Regex::new(pattern).map_err(|source| StrategyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern,
            fallback: DefaultStrategy,
        })
    }

    fn is_index_query(&self, request: &BackendRequest) -> bool {
        self.pattern.is_match(&request.path)
    }

    async fn migrate_keys(
        &self,
        donor: &BackendClient,
        target: &BackendClient,
        response: &BackendResponse,
        request: &BackendRequest,
    ) -> Result<(), StrategyError> {
        let keys = parse_index_keys(&response.body)?;
        let query = IndexQuery::parse(&request.path, &self.pattern)?;
        tracing::info!(
            bucket = %query.bucket,
            index = query.index.as_deref().unwrap_or_default(),
            keys = keys.len(),
            "Migrating keys listed by donor index"
        );

        let mut stored = 0usize;
        for key in &keys {
            let key_path = query.key_path(key);
            match retrieve_key(donor, target, &key_path).await {
                Ok(KeyMigration::Stored) => stored += 1,
                Ok(KeyMigration::Missing) => {}
                Err(e) => tracing::warn!(path = %key_path, error = %e, "Key migration failed"),
            }
        }
        tracing::debug!(bucket = %query.bucket, stored, total = keys.len(), "Index migration finished");
        Ok(())
    }
}

#[async_trait]
impl MigrationStrategy for SecondaryIndexStrategy {
    fn name(&self) -> &'static str {
        "secondary_index"
    }

    fn needs_proxy_pass(&self, response: &BackendResponse, request: &BackendRequest) -> bool {
        if request.method == Method::GET
            && response.status == StatusCode::OK
            && self.is_index_query(request)
        {
            return match parse_index_keys(&response.body) {
                Ok(keys) => keys.is_empty(),
                Err(e) => {
                    tracing::warn!(path = %request.path, error = %e, "Unreadable index answer from target");
                    false
                }
            };
        }
        self.fallback.needs_proxy_pass(response, request)
    }

    async fn post_process(
        &self,
        donor: &BackendClient,
        target: &BackendClient,
        response: &BackendResponse,
        request: &BackendRequest,
    ) -> Result<bool, StrategyError> {
        // Only a GET carries a key list; a HEAD on an index path behaves like any other HEAD.
        if request.method != Method::GET || !self.is_index_query(request) {
            return self.fallback.post_process(donor, target, response, request).await;
        }
        // The index itself is rebuilt by the target from the stored objects.
        if response.status == StatusCode::OK {
            self.migrate_keys(donor, target, response, request).await?;
        }
        Ok(false)
    }
}
