//! Request routing between the target and the donors.
//!
//! # Responsibilities
//! - Reject stop-listed URLs before any backend is contacted
//! - Ask the target first; let the strategy decide whether that answer stands
//! - Fall back to the next donor, post-process its answer and store it in the target
//! - Retry the whole cycle when a donor is unreachable, up to the configured bound
//!
//! # Design Decisions
//! - Each attempt re-reads the target, so a concurrent write-back is seen
//! - Target failures and post-processing failures are never retried
//! - A failure is a [`FailureReason`]; its display form is what the client reads

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::backend::{BackendClient, BackendRequest, BackendResponse};
use crate::load_balancer::ClientPool;
use crate::observability::metrics;
use crate::resilience::DonorRetry;
use crate::routing::matcher::{Matcher, PathFilter};
use crate::strategy::{store_response, MigrationStrategy};

/// Why a request could not be answered. Displayed as the plain-text token
/// sent to the client with status 500.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("URL_IN_STOP_LIST")]
    StopList,

    #[error("TARGET_DO_METHOD {0}")]
    TargetDo(Method),

    #[error("DONOR_DO {0}")]
    DonorDo(Method),

    #[error("NO_DONORS")]
    NoDonors,

    #[error("POST_PROCESS")]
    PostProcess,

    #[error("TARGET_STORE")]
    TargetStore,
}

/// Which backend produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Target,
    Donor,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Target => "target",
            AnswerSource::Donor => "donor",
        }
    }
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend answer to relay to the client.
#[derive(Debug, Clone)]
pub struct Answer {
    pub source: AnswerSource,
    pub response: BackendResponse,
}

impl Answer {
    fn target(response: BackendResponse) -> Self {
        Self { source: AnswerSource::Target, response }
    }

    fn donor(response: BackendResponse) -> Self {
        Self { source: AnswerSource::Donor, response }
    }
}

/// Outcome of one target/donor cycle.
enum ProxyDecision {
    Ok(Answer),
    Fail(FailureReason),
    Retry,
}

/// Routes every request through the migration cycle.
#[derive(Debug)]
pub struct MigrationRouter {
    target: Arc<BackendClient>,
    donors: ClientPool,
    strategy: Arc<dyn MigrationStrategy>,
    stop_list: Box<dyn Matcher>,
    skip_list: Box<dyn Matcher>,
    retry: DonorRetry,
}

impl MigrationRouter {
    /// Router with empty stop and skip lists and the default retry bound.
    pub fn new(target: Arc<BackendClient>, donors: ClientPool, strategy: Arc<dyn MigrationStrategy>) -> Self {
        Self {
            target,
            donors,
            strategy,
            stop_list: Box::new(PathFilter::empty()),
            skip_list: Box::new(PathFilter::empty()),
            retry: DonorRetry::default(),
        }
    }

    /// URLs that are rejected outright.
    pub fn with_stop_list(mut self, matcher: impl Matcher + 'static) -> Self {
        self.stop_list = Box::new(matcher);
        self
    }

    /// URLs that are always answered by the target.
    pub fn with_skip_list(mut self, matcher: impl Matcher + 'static) -> Self {
        self.skip_list = Box::new(matcher);
        self
    }

    pub fn with_retry(mut self, retry: DonorRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn target(&self) -> &BackendClient {
        &self.target
    }

    pub fn donors(&self) -> &ClientPool {
        &self.donors
    }

    pub fn strategy(&self) -> &dyn MigrationStrategy {
        self.strategy.as_ref()
    }

    /// Run `request` through the migration cycle.
    pub async fn serve(&self, request: &BackendRequest) -> Result<Answer, FailureReason> {
        let url = request.url();
        let result = self.run(request, &url).await;
        if let Err(reason) = &result {
            metrics::record_failure(&reason.to_string());
        }
        result
    }

    async fn run(&self, request: &BackendRequest, url: &str) -> Result<Answer, FailureReason> {
        if self.stop_list.matches(url) {
            tracing::warn!(method = %request.method, url = %url, "URL in stop list");
            return Err(FailureReason::StopList);
        }

        let mut attempt = 1;
        loop {
            match self.attempt(request, url, attempt).await {
                ProxyDecision::Ok(answer) => return Ok(answer),
                ProxyDecision::Fail(reason) => return Err(reason),
                ProxyDecision::Retry => {
                    let delay = self.retry.delay_after(attempt);
                    attempt += 1;
                    tracing::info!(url = %url, attempt, delay = ?delay, "Retrying with next donor");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn attempt(&self, request: &BackendRequest, url: &str, attempt: u32) -> ProxyDecision {
        let method = &request.method;

        let target_response = match self.target.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(method = %method, url = %url, error = %e, "Target request failed");
                return ProxyDecision::Fail(FailureReason::TargetDo(method.clone()));
            }
        };

        if !self.strategy.needs_proxy_pass(&target_response, request) {
            tracing::debug!(url = %url, status = %target_response.status, "Served by target");
            return ProxyDecision::Ok(Answer::target(target_response));
        }

        if self.skip_list.matches(url) {
            tracing::debug!(url = %url, status = %target_response.status, "URL in skip list, no fallback");
            return ProxyDecision::Ok(Answer::target(target_response));
        }

        let Some(donor) = self.donors.next() else {
            tracing::error!(url = %url, "No donors configured");
            return ProxyDecision::Fail(FailureReason::NoDonors);
        };

        tracing::debug!(
            url = %url,
            target_status = %target_response.status,
            donor = %donor.name(),
            attempt,
            "Falling back to donor"
        );

        let donor_response = match donor.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_transport() && self.retry.allows_after(attempt) => {
                tracing::warn!(donor = %donor.name(), url = %url, attempt, error = %e, "Donor unreachable");
                return ProxyDecision::Retry;
            }
            Err(e) => {
                tracing::error!(donor = %donor.name(), url = %url, attempt, error = %e, "Donor request failed");
                return ProxyDecision::Fail(FailureReason::DonorDo(method.clone()));
            }
        };

        let store = match self
            .strategy
            .post_process(&donor, &self.target, &donor_response, request)
            .await
        {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(
                    strategy = self.strategy.name(),
                    url = %url,
                    error = %e,
                    "Post-processing donor answer failed"
                );
                return ProxyDecision::Fail(FailureReason::PostProcess);
            }
        };

        if store {
            let stored = store_response(
                &self.target,
                &request.path,
                &donor_response.headers,
                donor_response.body.clone(),
            )
            .await;
            if stored.is_err() {
                return ProxyDecision::Fail(FailureReason::TargetStore);
            }
        }

        ProxyDecision::Ok(Answer::donor(donor_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::TransportRetry;
    use crate::strategy::DefaultStrategy;

    async fn closed_address() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    fn client(name: &str, address: &str) -> Arc<BackendClient> {
        Arc::new(
            BackendClient::builder(name, "http", address)
                .retry(TransportRetry::none())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_reason_tokens() {
        assert_eq!(FailureReason::StopList.to_string(), "URL_IN_STOP_LIST");
        assert_eq!(FailureReason::TargetDo(Method::GET).to_string(), "TARGET_DO_METHOD GET");
        assert_eq!(FailureReason::DonorDo(Method::POST).to_string(), "DONOR_DO POST");
        assert_eq!(FailureReason::NoDonors.to_string(), "NO_DONORS");
        assert_eq!(FailureReason::PostProcess.to_string(), "POST_PROCESS");
        assert_eq!(FailureReason::TargetStore.to_string(), "TARGET_STORE");
    }

    #[tokio::test]
    async fn test_stop_list_checked_first() {
        let router = MigrationRouter::new(client("target", "127.0.0.1:9"), ClientPool::new(), Arc::new(DefaultStrategy))
            .with_stop_list(PathFilter::from_patterns(["^/riak/blocked/"]).unwrap());

        let request = BackendRequest::new(Method::GET, "/riak/blocked/k");
        assert_eq!(router.serve(&request).await.unwrap_err(), FailureReason::StopList);
    }

    #[tokio::test]
    async fn test_unreachable_target_fails_with_method() {
        let address = closed_address().await;
        let router = MigrationRouter::new(client("target", &address), ClientPool::new(), Arc::new(DefaultStrategy));

        let request = BackendRequest::new(Method::DELETE, "/riak/b/k");
        assert_eq!(
            router.serve(&request).await.unwrap_err(),
            FailureReason::TargetDo(Method::DELETE)
        );
    }
}
