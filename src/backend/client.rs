//! Backend client.
//!
//! # Responsibilities
//! - Represent a single upstream cluster (the target or one donor)
//! - Refuse mutating calls on read-only backends before touching the network
//! - Rewrite outgoing paths and headers, and incoming headers, via a namespace codec
//! - Retry transport failures by replaying the buffered request

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use reqwest::{redirect, Identity};
use url::Url;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::message::{BackendRequest, BackendResponse};
use crate::backend::tls::load_identity;
use crate::config::schema::{BackendConfig, TransportConfig};
use crate::http::headers::sanitize_outgoing;
use crate::namespace::{NamespaceCodec, Passthrough};
use crate::observability::metrics;
use crate::resilience::retries::TransportRetry;

/// Returns true for methods a read-only backend must never receive.
pub fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// A configured upstream endpoint. Immutable and shared across requests.
#[derive(Debug)]
pub struct BackendClient {
    name: String,
    base_url: String,
    auth: Option<HeaderValue>,
    read_only: bool,
    codec: Arc<dyn NamespaceCodec>,
    retry: TransportRetry,
    http: reqwest::Client,
}

impl BackendClient {
    /// Start building a client for `scheme://address`.
    pub fn builder(name: impl Into<String>, scheme: &str, address: &str) -> BackendClientBuilder {
        BackendClientBuilder {
            name: name.into(),
            base_url: format!("{}://{}", scheme, address),
            auth: None,
            read_only: false,
            codec: Arc::new(Passthrough),
            retry: TransportRetry::default(),
            timeout: Duration::from_secs(4),
            identity: None,
            accept_invalid_certs: false,
        }
    }

    /// Build a client from its configuration section.
    pub fn from_config(
        name: impl Into<String>,
        config: &BackendConfig,
        transport: &TransportConfig,
    ) -> BackendResult<BackendClientBuilder> {
        let mut builder = Self::builder(name, &config.scheme, &config.address)
            .retry(TransportRetry::from(transport))
            .timeout(Duration::from_millis(transport.request_timeout_ms));
        if let Some(auth) = &config.auth {
            builder = builder.auth(auth)?;
        }
        if let Some(tls) = &config.tls {
            builder = builder
                .identity(load_identity(&tls.cert_path, &tls.key_path)?)
                .accept_invalid_certs(tls.accept_invalid_certs);
        }
        Ok(builder)
    }

    /// Name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `scheme://host:port` of the backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// GET `path` with no extra headers.
    pub async fn get(&self, path: &str) -> BackendResult<BackendResponse> {
        self.execute(&BackendRequest::new(Method::GET, path)).await
    }

    /// POST `body` to `path` with the given headers.
    pub async fn post(
        &self,
        path: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> BackendResult<BackendResponse> {
        let request = BackendRequest::new(Method::POST, path)
            .with_headers(headers.clone())
            .with_body(body);
        self.execute(&request).await
    }

    /// Send `request` to this backend.
    ///
    /// Transport failures are retried with the same bytes; any HTTP status
    /// counts as success.
    pub async fn execute(&self, request: &BackendRequest) -> BackendResult<BackendResponse> {
        if self.read_only && is_mutating(&request.method) {
            tracing::error!(
                backend = %self.name,
                method = %request.method,
                path = %request.path,
                "Refusing to write to read-only backend"
            );
            metrics::record_backend_attempt(&self.name, "read_only");
            return Err(BackendError::ReadOnlyViolation {
                backend: self.name.clone(),
                method: request.method.clone(),
            });
        }

        let url = self.upstream_url(request)?;
        let headers = self.outgoing_headers(&request.headers);

        let mut attempt = 1;
        loop {
            tracing::debug!(
                backend = %self.name,
                method = %request.method,
                url = %url,
                attempt,
                "Backend request"
            );

            match self.send(&request.method, url.clone(), headers.clone(), &request.body).await {
                Ok(response) => {
                    metrics::record_backend_attempt(&self.name, "ok");
                    tracing::debug!(
                        backend = %self.name,
                        status = %response.status,
                        bytes = response.body.len(),
                        "Backend response"
                    );
                    return Ok(response);
                }
                Err(e) if self.retry.allows_after(attempt) => {
                    metrics::record_backend_attempt(&self.name, "retry");
                    tracing::warn!(
                        backend = %self.name,
                        method = %request.method,
                        url = %url,
                        attempt,
                        retries_left = self.retry.max_attempts() - attempt,
                        error = %e,
                        "Backend unreachable, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    metrics::record_backend_attempt(&self.name, "transport_error");
                    tracing::error!(
                        backend = %self.name,
                        method = %request.method,
                        url = %url,
                        attempts = attempt,
                        error = %source,
                        "Backend call failed"
                    );
                    return Err(BackendError::Transport {
                        backend: self.name.clone(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    async fn send(
        &self,
        method: &Method,
        url: Url,
        headers: HeaderMap,
        body: &Bytes,
    ) -> Result<BackendResponse, reqwest::Error> {
        let mut builder = self.http.request(method.clone(), url).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;

        let status = response.status();
        let headers = self.codec.decode_headers(response.headers());
        let body = response.bytes().await?;

        Ok(BackendResponse { status, headers, body })
    }

    fn upstream_url(&self, request: &BackendRequest) -> BackendResult<Url> {
        let mut text = format!("{}{}", self.base_url, self.codec.encode_path(&request.path));
        if let Some(query) = &request.query {
            text.push('?');
            text.push_str(query);
        }
        Url::parse(&text).map_err(|source| BackendError::InvalidUrl { url: text, source })
    }

    fn outgoing_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut headers = self.codec.encode_headers(headers);
        sanitize_outgoing(&mut headers);
        if let Some(auth) = &self.auth {
            headers.append(AUTHORIZATION, auth.clone());
        }
        headers
    }
}

/// Builder for [`BackendClient`].
pub struct BackendClientBuilder {
    name: String,
    base_url: String,
    auth: Option<HeaderValue>,
    read_only: bool,
    codec: Arc<dyn NamespaceCodec>,
    retry: TransportRetry,
    timeout: Duration,
    identity: Option<Identity>,
    accept_invalid_certs: bool,
}

impl BackendClientBuilder {
    /// Reject every mutating method.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Attach `Authorization: Basic <credential>` to every call.
    pub fn auth(mut self, credential: &str) -> BackendResult<Self> {
        let value = HeaderValue::from_str(&format!("Basic {}", credential))
            .map_err(|e| BackendError::InvalidCredential(e.to_string()))?;
        self.auth = Some(value);
        Ok(self)
    }

    pub fn codec(mut self, codec: Arc<dyn NamespaceCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn retry(mut self, retry: TransportRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Timeout of a single call, body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> BackendResult<BackendClient> {
        let mut http = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(redirect::Policy::none())
            .no_proxy()
            .danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(identity) = self.identity {
            http = http.identity(identity);
        }
        let http = http.build().map_err(|source| BackendError::Build {
            backend: self.name.clone(),
            source,
        })?;

        tracing::info!(
            backend = %self.name,
            url = %self.base_url,
            read_only = self.read_only,
            "Backend client ready"
        );

        Ok(BackendClient {
            name: self.name,
            base_url: self.base_url,
            auth: self.auth,
            read_only: self.read_only,
            codec: self.codec,
            retry: self.retry,
            http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::VirtualSpace;
    use axum::http::header::{HOST, LINK};
    use axum::http::StatusCode;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn silent_listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_read_only_rejects_mutations_without_network() {
        let (listener, addr) = silent_listener().await;
        let donor = BackendClient::builder("donor", "http", &addr.to_string())
            .read_only()
            .retry(TransportRetry::none())
            .build()
            .unwrap();

        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let err = donor
                .execute(&BackendRequest::new(method, "/riak/b/k"))
                .await
                .unwrap_err();
            assert!(err.is_read_only_violation(), "unexpected error: {err}");
        }
        let err = donor.post("/riak/b/k", &HeaderMap::new(), Bytes::from("v")).await.unwrap_err();
        assert!(err.is_read_only_violation());

        // nothing ever connected
        let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err());
    }

    #[tokio::test]
    async fn test_transport_error_after_retries() {
        let (listener, addr) = silent_listener().await;
        drop(listener);

        let client = BackendClient::builder("target", "http", &addr.to_string())
            .retry(TransportRetry::new(2, Duration::ZERO))
            .build()
            .unwrap();

        match client.get("/riak/b/k").await {
            Err(BackendError::Transport { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    /// Read one request and return its body, sized by `Content-Length`.
    async fn read_body(socket: &mut TcpStream) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let start = end + 4;
                if data.len() >= start + length {
                    return data[start..start + length].to_vec();
                }
            }
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return data,
                Ok(n) => data.extend_from_slice(&buf[..n]),
            }
        }
    }

    #[tokio::test]
    async fn test_retry_replays_identical_body() {
        let (listener, addr) = silent_listener().await;
        let bodies = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
        let seen = bodies.clone();
        tokio::spawn(async move {
            let mut connection = 0;
            while let Ok((mut socket, _)) = listener.accept().await {
                connection += 1;
                let body = read_body(&mut socket).await;
                seen.lock().unwrap().push(body);
                if connection > 1 {
                    let _ = socket
                        .write_all(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n")
                        .await;
                }
                // the first connection is dropped unanswered
            }
        });

        let client = BackendClient::builder("target", "http", &addr.to_string())
            .retry(TransportRetry::new(3, Duration::ZERO))
            .build()
            .unwrap();
        let response = client
            .post("/riak/b/k", &HeaderMap::new(), Bytes::from_static(b"PAYLOAD-123"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::NO_CONTENT);
        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert!(bodies.iter().all(|body| body.as_slice() == b"PAYLOAD-123"));
    }

    #[tokio::test]
    async fn test_error_status_is_an_answer_not_retried() {
        let (listener, addr) = silent_listener().await;
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                read_body(&mut socket).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy")
                    .await;
            }
        });

        let client = BackendClient::builder("target", "http", &addr.to_string())
            .retry(TransportRetry::new(3, Duration::ZERO))
            .build()
            .unwrap();
        let response = client.get("/riak/b/k").await.unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, Bytes::from_static(b"busy"));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_url_and_headers_rewritten() {
        let codec = Arc::new(VirtualSpace::new("ns_").unwrap().unwrap());
        let client = BackendClient::builder("target", "http", "db:8098")
            .codec(codec)
            .auth("dXNlcjpwYXNz")
            .unwrap()
            .build()
            .unwrap();

        let request = BackendRequest::new(Method::GET, "/riak/users/42").with_query("r=2");
        let url = client.upstream_url(&request).unwrap();
        assert_eq!(url.as_str(), "http://db:8098/riak/ns_users/42?r=2");

        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("proxy"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Y2xpZW50"));
        headers.insert(LINK, HeaderValue::from_static("</riak/users/1>; riaktag=\"f\""));
        let out = client.outgoing_headers(&headers);

        assert!(out.get(HOST).is_none());
        assert_eq!(out.get(LINK).unwrap(), "</riak/ns_users/1>; riaktag=\"f\"");
        let auth: Vec<_> = out.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(auth, vec!["Basic Y2xpZW50", "Basic dXNlcjpwYXNz"]);
    }

    #[test]
    fn test_mutating_methods() {
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::HEAD));
        assert!(!is_mutating(&Method::OPTIONS));
    }
}
