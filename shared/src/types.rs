//! Common types for the shared crate

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical order identifier used as the join key between sources.
///
/// Always trimmed, uppercased and non-empty. Construct through
/// [`OrderKey::canonical`] so an empty key can never exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderKey(String);

impl OrderKey {
    /// Canonicalize a raw identifier. Returns `None` when nothing is left after trimming.
    pub fn canonical(raw: &str) -> Option<Self> {
        let key = raw.trim().to_uppercase();
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for OrderKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OrderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::canonical(&value).ok_or_else(|| "order key must not be empty".to_string())
    }
}

impl From<OrderKey> for String {
    fn from(key: OrderKey) -> Self {
        key.0
    }
}
