//! Secondary-index (2i) response format.
//!
//! Only enough of the format to find the keys an index query returned:
//! `{"keys": ["k1", "k2"]}`. Other fields such as `continuation` are ignored.

use regex::Regex;
use serde::Deserialize;

use crate::strategy::StrategyError;

#[derive(Debug, Deserialize)]
struct IndexResponse {
    #[serde(default)]
    keys: Vec<String>,
}

/// Keys listed in a secondary-index response. Missing `keys` means none.
pub fn parse_index_keys(body: &[u8]) -> Result<Vec<String>, StrategyError> {
    let response: IndexResponse = serde_json::from_slice(body)?;
    Ok(response.keys)
}

/// The parts of an index query path that matter for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Bucket the index belongs to.
    pub bucket: String,
    /// Index name, e.g. `email_bin`.
    pub index: Option<String>,
    /// Queried value (or range start).
    pub value: Option<String>,
}

impl IndexQuery {
    /// Split `path` using the index `pattern`.
    ///
    /// The bucket is the second `/`-separated component of the pattern match
    /// (`/buckets/<bucket>/index/`); index name and value follow the match.
    pub fn parse(path: &str, pattern: &Regex) -> Result<Self, StrategyError> {
        let found = pattern
            .find(path)
            .ok_or_else(|| StrategyError::BucketNotFound(path.to_string()))?;

        let bucket = found
            .as_str()
            .split('/')
            .nth(2)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| StrategyError::BucketNotFound(path.to_string()))?;

        let mut tail = path[found.end()..].split('/').filter(|s| !s.is_empty());
        Ok(Self {
            bucket: bucket.to_string(),
            index: tail.next().map(str::to_string),
            value: tail.next().map(str::to_string),
        })
    }

    /// Object path of `key` in this query's bucket.
    pub fn key_path(&self, key: &str) -> String {
        format!("/riak/{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new("^/buckets/.*/index/").unwrap()
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(parse_index_keys(br#"{"keys":["a","b"]}"#).unwrap(), vec!["a", "b"]);
        assert!(parse_index_keys(br#"{"keys":[]}"#).unwrap().is_empty());
        assert!(parse_index_keys(br#"{}"#).unwrap().is_empty());
        assert_eq!(
            parse_index_keys(br#"{"keys":["a"],"continuation":"g2o="}"#).unwrap(),
            vec!["a"]
        );
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse_index_keys(b"not json"), Err(StrategyError::IndexParse(_))));
        assert!(parse_index_keys(br#"{"keys":"a"}"#).is_err());
    }

    #[test]
    fn test_query_parts() {
        let query = IndexQuery::parse("/buckets/users/index/email_bin/a@b.c", &pattern()).unwrap();
        assert_eq!(query.bucket, "users");
        assert_eq!(query.index.as_deref(), Some("email_bin"));
        assert_eq!(query.value.as_deref(), Some("a@b.c"));
        assert_eq!(query.key_path("k1"), "/riak/users/k1");
    }

    #[test]
    fn test_query_without_bucket() {
        assert!(matches!(
            IndexQuery::parse("/riak/users/k1", &pattern()),
            Err(StrategyError::BucketNotFound(_))
        ));
    }
}
