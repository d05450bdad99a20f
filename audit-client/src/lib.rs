//! Retrieval client for the order audit
//!
//! Fetches order-detail and CRM records per identifier, from the upstream
//! HTTP service or from snapshot files.
//!
//! # Example
//!
//! ```ignore
//! use audit_client::{ClientConfig, HttpRecordSource, fetch_snapshot};
//!
//! let config = ClientConfig::new("http://localhost:3000").with_token("secret");
//! let source = HttpRecordSource::new(&config)?;
//! let fetched = fetch_snapshot(&source, &keys, &config.limits()).await;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod snapshot;
pub mod source;

pub use config::{ClientConfig, FetchLimits};
pub use error::{ClientError, ClientResult};
pub use http::HttpRecordSource;
pub use snapshot::{load_records, load_source};
pub use source::{Endpoint, FetchFailure, FetchedRecords, RecordSource, StaticSource, fetch_snapshot};
