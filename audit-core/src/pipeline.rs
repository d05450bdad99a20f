//! Classification run
//!
//! Ties the stages together: snapshot → aggregates → rule hits → audit map,
//! plus the list of requested identifiers that matched no record.

use crate::aggregate::Aggregates;
use crate::ingest::{Diagnostic, RecordSnapshot};
use crate::normalizer::{RequestedId, RequestedIds};
use crate::policy::CompiledPolicy;
use crate::resolver::{AuditMap, resolve};
use crate::rules::evaluate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{AuditCategory, OrderKey};
use std::collections::{BTreeMap, HashSet};

/// Result of one classification run
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub policy_version: String,
    pub audit_map: AuditMap,
    /// Summed net value per order, first-seen order
    pub net_values: Vec<(OrderKey, Decimal)>,
    /// Requested identifiers without any order-detail record, request order
    pub not_found: Vec<RequestedId>,
    /// Distinct requested identifiers
    pub requested_count: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl AuditOutcome {
    pub fn category_counts(&self) -> BTreeMap<AuditCategory, usize> {
        self.audit_map.counts()
    }

    pub fn net_value(&self, key: &str) -> Decimal {
        self.net_values
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| *v)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Classify every order in the snapshot.
///
/// Records whose order key was not requested are still classified; the
/// request list only drives the not-found report.
pub fn run_audit(
    requested: &RequestedIds,
    snapshot: &RecordSnapshot,
    policy: &CompiledPolicy,
) -> AuditOutcome {
    let agg = Aggregates::compute(&snapshot.order_details, &snapshot.crm_events);
    let hits = evaluate(policy, &agg);
    let audit_map = resolve(&agg, &hits);

    let known: HashSet<&str> = agg.order_keys.iter().copied().collect();
    let not_found: Vec<RequestedId> = requested
        .entries()
        .iter()
        .filter(|id| !known.contains(id.lookup_key.as_str()))
        .cloned()
        .collect();

    let net_values = agg
        .order_keys
        .iter()
        .filter_map(|key| OrderKey::canonical(key).map(|k| (k, agg.net_value(key))))
        .collect();

    tracing::info!(
        policy = policy.version(),
        orders = audit_map.len(),
        not_found = not_found.len(),
        requested = requested.len(),
        "Audit classified"
    );

    AuditOutcome {
        policy_version: policy.version().to_string(),
        audit_map,
        net_values,
        not_found,
        requested_count: requested.len(),
        diagnostics: snapshot.diagnostics.clone(),
    }
}

/// Classify records alone, without a request list
pub fn classify(snapshot: &RecordSnapshot, policy: &CompiledPolicy) -> AuditMap {
    let agg = Aggregates::compute(&snapshot.order_details, &snapshot.crm_events);
    resolve(&agg, &evaluate(policy, &agg))
}
