//! Record Normalizer
//!
//! Turns identifiers typed into a request list into the lookup keys used
//! against the order-detail source.

use shared::OrderKey;
use shared::models::order_detail::CANCEL_MARKER;
use std::collections::HashSet;

/// Artefact left when a numeric spreadsheet cell is exported as float
const FLOAT_CELL_SUFFIX: &str = ".0";
/// Length of a numeric id that carries a 2-digit variant suffix
const VARIANT_ID_LEN: usize = 11;
const VARIANT_SUFFIX_LEN: usize = 2;

/// Clean a requested identifier: trim, uppercase, drop a trailing `.0`.
pub fn clean_requested_id(raw: &str) -> Option<String> {
    let cleaned = raw.trim().to_uppercase();
    let cleaned = cleaned
        .strip_suffix(FLOAT_CELL_SUFFIX)
        .unwrap_or(cleaned.as_str())
        .trim()
        .to_string();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Derive the lookup key for a requested identifier.
///
/// Removes the cancellation marker; an 11-digit numeric id loses its last two
/// digits. Anything else passes through canonicalized. Blank input yields
/// `None`, which must never be looked up.
pub fn lookup_key(raw: &str) -> Option<OrderKey> {
    let id = raw.trim().to_uppercase().replace(CANCEL_MARKER, "");
    let id = id.trim();
    if id.len() == VARIANT_ID_LEN && id.bytes().all(|b| b.is_ascii_digit()) {
        return OrderKey::canonical(&id[..VARIANT_ID_LEN - VARIANT_SUFFIX_LEN]);
    }
    OrderKey::canonical(id)
}

/// One requested identifier and its derived lookup key
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RequestedId {
    /// Cleaned identifier as requested
    pub requested: String,
    pub lookup_key: OrderKey,
}

/// Deduplicated request list, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct RequestedIds {
    entries: Vec<RequestedId>,
    skipped: usize,
}

impl RequestedIds {
    /// Build from raw identifiers. Blank entries are skipped and counted;
    /// duplicates (after cleaning) keep their first occurrence.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        let mut skipped = 0;

        for item in raw {
            let Some(requested) = clean_requested_id(item.as_ref()) else {
                skipped += 1;
                continue;
            };
            if !seen.insert(requested.clone()) {
                continue;
            }
            match lookup_key(&requested) {
                Some(lookup_key) => entries.push(RequestedId {
                    requested,
                    lookup_key,
                }),
                None => {
                    tracing::warn!(id = %requested, "Identifier is empty after normalization, skipped");
                    skipped += 1;
                }
            }
        }

        Self { entries, skipped }
    }

    pub fn entries(&self) -> &[RequestedId] {
        &self.entries
    }

    /// Number of distinct requested identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dropped because they were blank
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Distinct lookup keys, first-seen order
    pub fn lookup_keys(&self) -> Vec<OrderKey> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.lookup_key.as_str()))
            .map(|e| e.lookup_key.clone())
            .collect()
    }
}
