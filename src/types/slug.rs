// ABOUTME: Lowercase name component used for users, projects and compose services.
// ABOUTME: Safe to embed in container names, image repositories and network aliases.

use super::network_alias::NetworkAlias;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("name must start and end with a letter or digit")]
    BadEdge,

    #[error("name must be lowercase")]
    NotLowercase,

    #[error("invalid character in name: '{0}'")]
    InvalidChar(char),
}

/// A validated name component.
///
/// Allowed: lowercase ASCII letters, digits, `-` and `_`, starting and ending
/// with a letter or digit. Every slug is also a valid network alias and a
/// valid image repository component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: &str) -> Result<Self, SlugError> {
        if value.is_empty() {
            return Err(SlugError::Empty);
        }
        if value.len() > MAX_LEN {
            return Err(SlugError::TooLong);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(SlugError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(SlugError::InvalidChar(c));
            }
        }

        let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !edge_ok(value.chars().next()) || !edge_ok(value.chars().last()) {
            return Err(SlugError::BadEdge);
        }

        Ok(Self(value.to_string()))
    }

    /// Best-effort conversion of an arbitrary label (a directory name, say).
    ///
    /// Lowercases, turns every run of disallowed characters into a single `-`
    /// and trims the edges. Returns `None` when nothing usable is left.
    pub fn from_lossy(value: &str) -> Option<Self> {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                out.push(c);
            } else if !out.ends_with('-') {
                out.push('-');
            }
        }

        let mut trimmed: String = out
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .chars()
            .take(MAX_LEN)
            .collect();
        while trimmed.ends_with(|c: char| !c.is_ascii_alphanumeric()) {
            trimmed.pop();
        }

        Self::new(&trimmed).ok()
    }

    /// For built-in constants that are known to be valid.
    pub(crate) fn trusted(value: &str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid built-in slug {value}");
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Infallible: the slug alphabet is a subset of the alias alphabet.
    pub fn as_alias(&self) -> NetworkAlias {
        NetworkAlias::from_trusted(self.0.clone())
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Slug {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Slug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Slug::new(&s).map_err(serde::de::Error::custom)
    }
}
