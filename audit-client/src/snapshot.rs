//! Snapshot files
//!
//! A snapshot file holds a JSON array of wire records, exactly as one of the
//! endpoints returns them (concatenated over identifiers).

use crate::source::StaticSource;
use crate::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{CrmEventWire, OrderDetailWire};
use std::path::Path;

/// Load an array of records from a JSON file.
///
/// Unlike a live response, a file that is not an array is an error. Elements
/// that do not decode are skipped with a warning.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> ClientResult<Vec<T>> {
    let text = std::fs::read_to_string(path).map_err(|source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(items) = serde_json::from_str::<Value>(&text)? else {
        return Err(ClientError::InvalidResponse(format!(
            "{} does not contain a JSON array",
            path.display()
        )));
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), index, "Skipping undecodable record: {e}");
                None
            }
        })
        .collect();
    tracing::info!(path = %path.display(), records = records.len(), total, "Snapshot loaded");
    Ok(records)
}

/// Build a [`StaticSource`] from snapshot files; a missing CRM file means
/// no CRM records
pub fn load_source(order_details: &Path, crm_events: Option<&Path>) -> ClientResult<StaticSource> {
    let details: Vec<OrderDetailWire> = load_records(order_details)?;
    let events: Vec<CrmEventWire> = match crm_events {
        Some(path) => load_records(path)?,
        None => Vec::new(),
    };
    Ok(StaticSource::from_records(details, events))
}
