//! Path and header rewriting for virtual spaces.
//!
//! The space token is inserted directly after the first segment of a path,
//! so `/riak/users/42` with space `ns_` becomes `/riak/ns_users/42`. A token
//! ending in `/` (e.g. `ns/`) therefore yields a separate segment instead:
//! `/riak/ns/users/42`.

use std::fmt::Debug;

use axum::http::{header::LINK, HeaderMap, HeaderValue};
use regex::Regex;

/// Rewrites request paths and headers on the way to a backend and back.
pub trait NamespaceCodec: Send + Sync + Debug {
    /// Rewrite a path before it is sent upstream.
    fn encode_path(&self, path: &str) -> String;

    /// Undo [`NamespaceCodec::encode_path`].
    fn decode_path(&self, path: &str) -> String;

    /// Copy headers, encoding every `Link` value.
    fn encode_headers(&self, headers: &HeaderMap) -> HeaderMap {
        rewrite_links(headers, |value| self.encode_path(value))
    }

    /// Copy headers, decoding every `Link` value.
    fn decode_headers(&self, headers: &HeaderMap) -> HeaderMap {
        rewrite_links(headers, |value| self.decode_path(value))
    }
}

/// Codec that leaves everything untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl NamespaceCodec for Passthrough {
    fn encode_path(&self, path: &str) -> String {
        path.to_string()
    }

    fn decode_path(&self, path: &str) -> String {
        path.to_string()
    }

    fn encode_headers(&self, headers: &HeaderMap) -> HeaderMap {
        headers.clone()
    }

    fn decode_headers(&self, headers: &HeaderMap) -> HeaderMap {
        headers.clone()
    }
}

/// Codec for a non-empty space token, with both expressions compiled once.
#[derive(Debug, Clone)]
pub struct VirtualSpace {
    space: String,
    encoder: Regex,
    decoder: Regex,
}

impl VirtualSpace {
    /// Build a codec for `space`. Yields `None` for an empty space.
    pub fn new(space: &str) -> Result<Option<Self>, regex::Error> {
        if space.is_empty() {
            return Ok(None);
        }
        let decoder = format!(r"(<|^)/([^/]+)/{}", regex::escape(space));
        Ok(Some(Self {
            space: space.to_string(),
            encoder: Regex::new(r"(<|^)/([^/]+)/")?,
            decoder: Regex::new(&decoder)?,
        }))
    }

    /// The configured space token.
    pub fn space(&self) -> &str {
        &self.space
    }
}

impl NamespaceCodec for VirtualSpace {
    fn encode_path(&self, path: &str) -> String {
        replace(&self.encoder, path, &self.space)
    }

    fn decode_path(&self, path: &str) -> String {
        replace(&self.decoder, path, "")
    }
}

fn replace(re: &Regex, path: &str, suffix: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    re.replace_all(path, |caps: &regex::Captures<'_>| {
        format!("{}/{}/{}", &caps[1], &caps[2], suffix)
    })
    .into_owned()
}

fn rewrite_links<F>(headers: &HeaderMap, rewrite: F) -> HeaderMap
where
    F: Fn(&str) -> String,
{
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == LINK {
            if let Ok(text) = value.to_str() {
                if let Ok(rewritten) = HeaderValue::from_str(&rewrite(text)) {
                    out.append(name.clone(), rewritten);
                    continue;
                }
            }
        }
        out.append(name.clone(), value.clone());
    }
    out
}
