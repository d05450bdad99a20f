//! Order audit classification core
//!
//! Pure, synchronous stages over one immutable snapshot:
//!
//! ```text
//! wire records ─▶ ingest ─▶ aggregate ─▶ rules ─▶ resolver ─▶ AuditMap ─▶ report
//! ```
//!
//! No I/O happens here except reading a policy file on request.

pub mod aggregate;
pub mod ingest;
pub mod normalizer;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod rules;

pub use aggregate::Aggregates;
pub use ingest::{Diagnostic, RecordOrigin, RecordSnapshot};
pub use normalizer::{RequestedId, RequestedIds, clean_requested_id, lookup_key};
pub use pipeline::{AuditOutcome, classify, run_audit};
pub use policy::{AuditPolicy, CompiledPolicy, Predicate, RuleDefinition};
pub use report::{AuditReport, AuditStats, DetailRow, ReportFilter, SummaryRow, order_history};
pub use resolver::{AuditMap, resolve};
pub use rules::{RuleHit, RuleHits, evaluate};
