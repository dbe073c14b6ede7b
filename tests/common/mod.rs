//! Shared utilities for integration testing.
//!
//! Every server binds `127.0.0.1:0`, so tests can run in parallel.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tricky_proxy::config::{BackendConfig, ProxyConfig};
use tricky_proxy::{HttpServer, Shutdown};

/// A stored object: body plus the headers that describe it.
#[derive(Debug, Clone)]
pub struct Object {
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
    pub links: Vec<HeaderValue>,
}

impl Object {
    pub fn new(body: &str) -> Self {
        Self {
            body: Bytes::copy_from_slice(body.as_bytes()),
            content_type: Some(HeaderValue::from_static("text/plain")),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, link: &'static str) -> Self {
        self.links.push(HeaderValue::from_static(link));
        self
    }
}

/// One request seen by a mock store.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Object>,
    forced: HashMap<String, (StatusCode, String)>,
    log: Vec<Seen>,
}

/// In-memory key/value HTTP store.
///
/// GET/HEAD answer the stored object or 404, POST/PUT store the body,
/// DELETE removes it. Reads of a forced path answer the forced status and body.
#[derive(Debug, Clone)]
pub struct MockStore {
    pub addr: SocketAddr,
    state: Arc<Mutex<StoreState>>,
}

impl MockStore {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(StoreState::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new()
            .route("/", any(handle))
            .route("/{*path}", any(handle))
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn put(&self, path: &str, object: Object) {
        self.state.lock().unwrap().objects.insert(path.to_string(), object);
    }

    pub fn get(&self, path: &str) -> Option<Object> {
        self.state.lock().unwrap().objects.get(path).cloned()
    }

    /// Make reads of `path` answer `status` with `body`.
    pub fn force(&self, path: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.state
            .lock()
            .unwrap()
            .forced
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn log(&self) -> Vec<Seen> {
        self.state.lock().unwrap().log.clone()
    }

    /// `(method, path)` pairs in arrival order.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.log().into_iter().map(|s| (s.method, s.path)).collect()
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig::http(self.addr.to_string())
    }
}

async fn handle(
    State(state): State<Arc<Mutex<StoreState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let mut state = state.lock().unwrap();
    state.log.push(Seen {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let read = method == Method::GET || method == Method::HEAD;
    if read {
        if let Some((status, body)) = state.forced.get(&path) {
            return (*status, [(header::CONTENT_TYPE, "application/json")], body.clone()).into_response();
        }
    }

    match method {
        Method::GET | Method::HEAD => match state.objects.get(&path) {
            Some(object) => object_response(object),
            None => (StatusCode::NOT_FOUND, "not found\n").into_response(),
        },
        Method::POST | Method::PUT => {
            let object = Object {
                body,
                content_type: headers.get(header::CONTENT_TYPE).cloned(),
                links: headers.get_all(header::LINK).iter().cloned().collect(),
            };
            state.objects.insert(path, object);
            StatusCode::NO_CONTENT.into_response()
        }
        Method::DELETE => {
            state.objects.remove(&path);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn object_response(object: &Object) -> Response {
    let mut response = object.body.clone().into_response();
    let headers = response.headers_mut();
    headers.remove(header::CONTENT_TYPE);
    if let Some(content_type) = &object.content_type {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    for link in &object.links {
        headers.append(header::LINK, link.clone());
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(object.body.len()));
    response
}

/// A backend that reads the request and closes the connection without answering.
/// Returns its address and the number of accepted connections.
pub async fn start_dropping_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
            });
        }
    });

    (addr, accepted)
}

/// A target that answers every read with an empty 404 and drops the
/// connection on any write. Returns its address and the methods it received.
pub async fn start_store_failing_target() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let methods = Arc::new(Mutex::new(Vec::new()));
    let seen = methods.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut head: Vec<u8> = Vec::new();
                let mut buf = [0u8; 4096];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let method = String::from_utf8_lossy(&head)
                    .split(' ')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                seen.lock().unwrap().push(method.clone());

                if method == "GET" || method == "HEAD" {
                    let _ = socket
                        .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                        .await;
                    let _ = socket.shutdown().await;
                }
            });
        }
    });

    (addr, methods)
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Proxy configuration with fast, single-shot transport settings.
pub fn proxy_config(target: BackendConfig, donors: Vec<BackendConfig>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.target = target;
    config.donors = donors;
    config.transport.request_timeout_ms = 2000;
    config.transport.retry_attempts = 0;
    config.transport.retry_delay_ms = 0;
    config
}

/// A running proxy, stopped when dropped.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub async fn start(config: ProxyConfig) -> Self {
        let server = HttpServer::new(&config).expect("proxy config is valid");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        Self { addr, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
