//! Client answers.
//!
//! # Design Decisions
//! - Backend status, headers and body are relayed as-is, minus hop-by-hop headers
//! - `content-length` is recomputed by the server, except on HEAD where no body
//!   is sent and the backend's value is the only correct one
//! - Failures answer 500 with the reason token and a newline

use axum::body::Body;
use axum::http::{header::CONTENT_LENGTH, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::backend::BackendResponse;
use crate::http::headers::strip_hop_by_hop;

/// Turn a buffered backend answer into a client response.
pub fn relay(method: &Method, response: BackendResponse) -> Response {
    let BackendResponse { status, mut headers, body } = response;
    strip_hop_by_hop(&mut headers);
    if *method != Method::HEAD {
        headers.remove(CONTENT_LENGTH);
    }

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}

/// 500 with a plain-text reason.
pub fn failure(reason: impl std::fmt::Display) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{reason}\n")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::CONNECTION, HeaderMap, HeaderValue};

    fn backend_answer() -> BackendResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("5"));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        headers.insert("x-riak-vclock", HeaderValue::from_static("a85hYGBgzGDKBVIc"));
        BackendResponse::new(StatusCode::OK).with_headers(headers).with_body("hello")
    }

    #[test]
    fn test_relay_copies_status_and_headers() {
        let response = relay(&Method::GET, backend_answer());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-riak-vclock").unwrap(), "a85hYGBgzGDKBVIc");
        assert!(response.headers().get(CONNECTION).is_none());
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_head_keeps_content_length() {
        let response = relay(&Method::HEAD, backend_answer());
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "5");
    }

    #[tokio::test]
    async fn test_failure_body() {
        let response = failure("TARGET_STORE");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"TARGET_STORE\n");
    }
}
