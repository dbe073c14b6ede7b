//! Plain HTTP migration policy.

use async_trait::async_trait;
use axum::http::{Method, StatusCode};

use crate::backend::{BackendClient, BackendRequest, BackendResponse};
use crate::strategy::migrate::retrieve_key;
use crate::strategy::{MigrationStrategy, StrategyError};

/// Falls back on a 404 for reads and copies whatever the donor found.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

#[async_trait]
impl MigrationStrategy for DefaultStrategy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn needs_proxy_pass(&self, response: &BackendResponse, request: &BackendRequest) -> bool {
        response.status == StatusCode::NOT_FOUND
            && (request.method == Method::GET || request.method == Method::HEAD)
    }

    async fn post_process(
        &self,
        donor: &BackendClient,
        target: &BackendClient,
        response: &BackendResponse,
        request: &BackendRequest,
    ) -> Result<bool, StrategyError> {
        // A HEAD answer carries no body, so fetch the object separately.
        if request.method == Method::HEAD {
            if let Err(e) = retrieve_key(donor, target, &request.path).await {
                tracing::warn!(path = %request.path, error = %e, "Background copy after HEAD failed");
            }
            return Ok(false);
        }
        Ok(response.status == StatusCode::OK)
    }
}
