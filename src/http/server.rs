//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (request id, tracing, body limit)
//! - Buffer each request body once and hand it to the migration router
//! - Serve until a shutdown trigger or OS signal, then drain

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::backend::BackendRequest;
use crate::config::ProxyConfig;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::{failure, relay};
use crate::lifecycle::shutdown::triggered;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::startup::{build_router, StartupError};
use crate::observability::metrics;
use crate::routing::MigrationRouter;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: Arc<MigrationRouter>,
    pub max_body_bytes: usize,
}

/// HTTP server for the migration proxy.
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    /// Build every subsystem from `config`.
    pub fn new(config: &ProxyConfig) -> Result<Self, StartupError> {
        let router = build_router(config)?;
        Ok(Self::with_router(router, config.listener.max_body_bytes))
    }

    /// Serve an already assembled router.
    pub fn with_router(router: MigrationRouter, max_body_bytes: usize) -> Self {
        let state = AppState {
            router: Arc::new(router),
            max_body_bytes,
        };
        Self {
            app: Self::build_app(state),
        }
    }

    fn build_app(state: AppState) -> Router {
        let max_body_bytes = state.max_body_bytes;
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(max_body_bytes)),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
        let addr = listener.local_addr().map_err(StartupError::Serve)?;
        tracing::info!(address = %addr, "HTTP server starting");

        let stop = async move {
            tokio::select! {
                _ = triggered(shutdown) => tracing::info!("Shutdown requested"),
                _ = shutdown_signal() => {}
            }
        };

        axum::serve(listener, self.app)
            .with_graceful_shutdown(stop)
            .await
            .map_err(StartupError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: buffer, route, answer.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %method, uri = %parts.uri, error = %e, "Failed to read request body");
            metrics::record_failure("ERROR_READ_REQUEST");
            metrics::record_request(method.as_str(), 500, "proxy", start);
            return failure("ERROR_READ_REQUEST");
        }
    };

    let request = BackendRequest::from_parts(parts.method, &parts.uri, parts.headers, body);
    match state.router.serve(&request).await {
        Ok(answer) => {
            let status = answer.response.status;
            tracing::info!(status = %status, source = %answer.source, elapsed = ?start.elapsed(), "Answered");
            metrics::record_request(method.as_str(), status.as_u16(), answer.source.as_str(), start);
            relay(&method, answer.response)
        }
        Err(reason) => {
            tracing::warn!(reason = %reason, elapsed = ?start.elapsed(), "Request failed");
            metrics::record_request(method.as_str(), 500, "proxy", start);
            failure(reason)
        }
    }
}
