//! Data models
//!
//! Each upstream record has two shapes: a `*Wire` struct mirroring the JSON
//! emitted by the upstream services (every field optional, scalars accepted
//! leniently) and a typed record produced at the ingestion boundary.

pub mod category;
pub mod crm_event;
pub mod order_detail;

pub use category::AuditCategory;
pub use crm_event::{CrmEventRecord, CrmEventWire, CrmStatus};
pub use order_detail::{OrderAttributes, OrderDetailRecord, OrderDetailWire, RecordKind};
