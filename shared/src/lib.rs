//! Shared types for the order audit workspace
//!
//! Common types used across crates: wire and typed record models,
//! the audit category taxonomy, the error system and parsing helpers.

pub mod error;
pub mod models;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    AuditCategory, CrmEventRecord, CrmEventWire, CrmStatus, OrderAttributes, OrderDetailRecord,
    OrderDetailWire, RecordKind,
};
pub use types::OrderKey;
