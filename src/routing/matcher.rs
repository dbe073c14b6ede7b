//! URL classification for stop and skip lists.
//!
//! # Design Decisions
//! - A list is any number of regular expressions; one match is enough
//! - Matched against the request URL as received (path plus query)
//! - Empty list never matches

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

/// Predicate over request URLs.
pub trait Matcher: Send + Sync + Debug {
    /// Returns true if the URL matches this condition.
    fn matches(&self, url: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to read path list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid expression {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Set of regular expressions compiled once at startup.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Regex>,
}

impl PathFilter {
    /// A filter that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|source| FilterError::InvalidPattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// One expression per line. Lines are trimmed and blank lines ignored.
    pub fn from_lines(text: &str) -> Result<Self, FilterError> {
        Self::from_patterns(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    pub fn from_file(path: &Path) -> Result<Self, FilterError> {
        let text = std::fs::read_to_string(path).map_err(|source| FilterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filter = Self::from_lines(&text)?;
        tracing::info!(path = %path.display(), patterns = filter.len(), "Path list loaded");
        Ok(filter)
    }

    /// Union of both filters.
    pub fn merge(mut self, other: PathFilter) -> Self {
        self.patterns.extend(other.patterns);
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Matcher for PathFilter {
    fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }
}
