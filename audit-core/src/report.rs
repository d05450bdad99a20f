//! Report views
//!
//! Read-only projections of an [`AuditOutcome`] for export: one summary row
//! per order, one detail row per order-detail record, per-category stats and
//! the control indicator.

use crate::aggregate::latest_by;
use crate::ingest::RecordSnapshot;
use crate::normalizer::RequestedId;
use crate::pipeline::AuditOutcome;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::util::{DISPLAY_DATETIME_FORMAT, parse_timestamp};
use shared::{AuditCategory, CrmEventRecord, OrderAttributes, OrderDetailRecord, OrderKey};
use std::collections::{BTreeMap, HashMap};

/// Export filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub category: Option<AuditCategory>,
    /// Case-insensitive substring of the order key
    pub order_contains: Option<String>,
    pub channel: Option<String>,
    pub company_id: Option<String>,
    pub block_reason: Option<String>,
    pub carrier: Option<String>,
}

impl ReportFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &OrderDetailRecord, category: AuditCategory) -> bool {
        if self.category.is_some_and(|c| c != category) {
            return false;
        }
        if let Some(needle) = &self.order_contains {
            let needle = needle.trim().to_uppercase();
            if !record.order_key.as_str().contains(&needle) {
                return false;
            }
        }
        let attrs = &record.attributes;
        field_matches(&self.channel, &attrs.channel)
            && field_matches(&self.company_id, &attrs.company_id)
            && field_matches(&self.block_reason, &attrs.block_reason)
            && field_matches(&self.carrier, &attrs.carrier)
    }
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.as_deref().is_some_and(|a| a.trim() == w.trim()),
    }
}

/// One row per order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub order_key: OrderKey,
    pub channel: Option<String>,
    pub order_date: Option<String>,
    pub net_value: Decimal,
    pub category: AuditCategory,
    pub category_label: &'static str,
}

/// One row per order-detail record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub order_key: OrderKey,
    pub raw_id: Option<String>,
    pub record_kind: Option<String>,
    pub net_value: Decimal,
    pub document_status_code: Option<String>,
    pub blocked: bool,
    #[serde(flatten)]
    pub attributes: OrderAttributes,
    pub category: AuditCategory,
    pub category_label: &'static str,
    pub latest_note: Option<String>,
    pub latest_actor: Option<String>,
    pub latest_at: Option<String>,
}

/// Run-level counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditStats {
    pub policy_version: String,
    pub requested: usize,
    pub classified: usize,
    pub not_found: usize,
    pub dropped_records: usize,
    /// Orders per category, every category present
    pub counts: BTreeMap<AuditCategory, usize>,
    /// Share of requested orders that already have follow-up, `None` when
    /// nothing was requested
    pub control_indicator: Option<f64>,
}

impl AuditStats {
    pub fn from_outcome(outcome: &AuditOutcome) -> Self {
        let counts = outcome.category_counts();
        let no_follow_up = counts
            .get(&AuditCategory::NoFollowUpYet)
            .copied()
            .unwrap_or(0);
        Self {
            policy_version: outcome.policy_version.clone(),
            requested: outcome.requested_count,
            classified: outcome.audit_map.len(),
            not_found: outcome.not_found.len(),
            dropped_records: outcome.diagnostics.iter().filter(|d| d.is_dropped()).count(),
            control_indicator: control_indicator(outcome.requested_count, no_follow_up),
            counts,
        }
    }
}

/// `(requested - no_follow_up) / requested`
pub fn control_indicator(requested: usize, no_follow_up: usize) -> Option<f64> {
    if requested == 0 {
        return None;
    }
    Some(requested.saturating_sub(no_follow_up) as f64 / requested as f64)
}

/// Everything written for one run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub summary: Vec<SummaryRow>,
    pub details: Vec<DetailRow>,
    pub not_found: Vec<RequestedId>,
    pub stats: AuditStats,
}

impl AuditReport {
    pub fn build(outcome: &AuditOutcome, snapshot: &RecordSnapshot, filter: &ReportFilter) -> Self {
        let report = Self {
            summary: summary_rows(outcome, &snapshot.order_details, filter),
            details: detail_rows(outcome, snapshot, filter),
            not_found: outcome.not_found.clone(),
            stats: AuditStats::from_outcome(outcome),
        };
        tracing::debug!(
            summary = report.summary.len(),
            details = report.details.len(),
            filtered = !filter.is_empty(),
            "Report built"
        );
        report
    }
}

/// Records passing the filter, paired with their order's category
fn filtered<'a>(
    outcome: &'a AuditOutcome,
    records: &'a [OrderDetailRecord],
    filter: &'a ReportFilter,
) -> impl Iterator<Item = (&'a OrderDetailRecord, AuditCategory)> + 'a {
    records
        .iter()
        .map(move |r| (r, outcome.audit_map.category_or_ok(r.order_key.as_str())))
        .filter(move |(r, c)| filter.matches(r, *c))
}

/// Summary rows, first-seen order.
///
/// Net value sums the records passing the filter; channel and date take the
/// greatest non-empty value.
pub fn summary_rows(
    outcome: &AuditOutcome,
    records: &[OrderDetailRecord],
    filter: &ReportFilter,
) -> Vec<SummaryRow> {
    let mut rows: Vec<SummaryRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (record, category) in filtered(outcome, records, filter) {
        let key = record.order_key.as_str();
        let i = *index.entry(key).or_insert_with(|| {
            rows.push(SummaryRow {
                order_key: record.order_key.clone(),
                channel: None,
                order_date: None,
                net_value: Decimal::ZERO,
                category,
                category_label: category.label(),
            });
            rows.len() - 1
        });
        let row = &mut rows[i];
        row.net_value += record.net_value;
        keep_max(&mut row.channel, record.attributes.channel.as_deref(), |s| s.to_string());
        keep_max(&mut row.order_date, record.attributes.order_date.as_deref(), date_sort_key);
    }
    rows
}

fn keep_max<K: Ord>(current: &mut Option<String>, candidate: Option<&str>, key: impl Fn(&str) -> K) {
    let Some(candidate) = candidate.map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    let replace = match current.as_deref() {
        None => true,
        Some(existing) => key(candidate) > key(existing),
    };
    if replace {
        *current = Some(candidate.to_string());
    }
}

/// Parsed dates order chronologically; unparseable text sorts before them
fn date_sort_key(raw: &str) -> (Option<chrono::NaiveDateTime>, String) {
    (parse_timestamp(raw), raw.to_string())
}

/// Detail rows, input order, decorated with the latest CRM entry of the
/// record's document
pub fn detail_rows(outcome: &AuditOutcome, snapshot: &RecordSnapshot, filter: &ReportFilter) -> Vec<DetailRow> {
    let latest = latest_by(&snapshot.crm_events, CrmEventRecord::document_key);

    filtered(outcome, &snapshot.order_details, filter)
        .map(|(record, category)| {
            let document = record
                .raw_id
                .as_deref()
                .unwrap_or(record.order_key.as_str());
            let event = latest.get(document);
            DetailRow {
                order_key: record.order_key.clone(),
                raw_id: record.raw_id.clone(),
                record_kind: record.kind_label.clone(),
                net_value: record.net_value,
                document_status_code: record.document_status_code.clone(),
                blocked: record.blocked,
                attributes: record.attributes.clone(),
                category,
                category_label: category.label(),
                latest_note: event.and_then(|e| e.note.clone()),
                latest_actor: event.and_then(|e| e.actor.clone()),
                latest_at: event
                    .and_then(|e| e.timestamp)
                    .map(|t| t.format(DISPLAY_DATETIME_FORMAT).to_string()),
            }
        })
        .collect()
}

/// CRM history of one order, most recent first; ties keep input order
pub fn order_history<'a>(events: &'a [CrmEventRecord], order_key: &str) -> Vec<&'a CrmEventRecord> {
    let Some(key) = OrderKey::canonical(order_key) else {
        return Vec::new();
    };
    let mut history: Vec<_> = events.iter().filter(|e| e.order_key == key).collect();
    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::RequestedIds;
    use crate::pipeline::run_audit;
    use crate::policy::AuditPolicy;
    use serde_json::json;
    use shared::{CrmEventWire, OrderDetailWire};
    use std::str::FromStr;

    fn snapshot() -> RecordSnapshot {
        let details: Vec<OrderDetailWire> = serde_json::from_value(json!([
            {"pedido_normalizado": "100001", "pedido_raw": "10000101", "validacao_pedido": "NF",
             "valor_normalizado": "120.00", "canal_venda": "LOJA", "id_empresa": "1",
             "transportadora": "ACME", "data_pedido": "2024-01-02"},
            {"pedido_normalizado": "100001", "pedido_raw": "10000102", "validacao_pedido": "NF",
             "valor_normalizado": 30, "canal_venda": "SITE", "id_empresa": "1",
             "transportadora": "RAPIDO", "data_pedido": "2024-01-05"},
            {"pedido_normalizado": "100002", "pedido_raw": "10000201", "validacao_pedido": "NF",
             "valor_normalizado": "0.5", "canal_venda": "LOJA", "id_empresa": "2"}
        ]))
        .unwrap();
        let crm: Vec<CrmEventWire> = serde_json::from_value(json!([
            {"pedido_normalizado": "100001", "pedido_raw": "10000101", "andamento_descricao": "EM EXPEDIÇÃO",
             "andamento_obs": "saiu", "usuario_andamento": "ana", "datahora_andamento": "2024-01-03 10:00:00"},
            {"pedido_normalizado": "100001", "pedido_raw": "10000101", "andamento_descricao": "EM EXPEDIÇÃO",
             "andamento_obs": "transportadora", "usuario_andamento": "bruno", "datahora_andamento": "2024-01-04 11:30:00"}
        ]))
        .unwrap();
        RecordSnapshot::ingest(details, crm)
    }

    fn outcome(snapshot: &RecordSnapshot, requested: &[&str]) -> AuditOutcome {
        let policy = AuditPolicy::default().compile().unwrap();
        run_audit(&RequestedIds::from_raw(requested.iter().copied()), snapshot, &policy)
    }

    #[test]
    fn test_summary_takes_max_channel_and_date() {
        let snapshot = snapshot();
        let outcome = outcome(&snapshot, &["100001", "100002"]);
        let rows = summary_rows(&outcome, &snapshot.order_details, &ReportFilter::default());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order_key.as_str(), "100001");
        assert_eq!(rows[0].channel.as_deref(), Some("SITE"));
        assert_eq!(rows[0].order_date.as_deref(), Some("2024-01-05"));
        assert_eq!(rows[0].net_value, Decimal::from(150));
        assert_eq!(rows[0].category, AuditCategory::NoFollowUpYet);
        assert_eq!(rows[1].category, AuditCategory::Returned);
    }

    #[test]
    fn test_filter_restricts_rows_and_value() {
        let snapshot = snapshot();
        let outcome = outcome(&snapshot, &["100001"]);
        let filter = ReportFilter {
            carrier: Some("ACME".to_string()),
            ..Default::default()
        };
        let rows = summary_rows(&outcome, &snapshot.order_details, &filter);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].net_value, Decimal::from_str("120.00").unwrap());

        let by_category = ReportFilter {
            category: Some(AuditCategory::Returned),
            ..Default::default()
        };
        let rows = summary_rows(&outcome, &snapshot.order_details, &by_category);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].order_key.as_str(), "100002");

        let by_order = ReportFilter {
            order_contains: Some("0002".to_string()),
            company_id: Some("2".to_string()),
            ..Default::default()
        };
        assert_eq!(detail_rows(&outcome, &snapshot, &by_order).len(), 1);
        assert!(!by_order.is_empty());
        assert!(ReportFilter::default().is_empty());
    }

    #[test]
    fn test_detail_rows_carry_latest_crm_entry() {
        let snapshot = snapshot();
        let outcome = outcome(&snapshot, &["100001"]);
        let rows = detail_rows(&outcome, &snapshot, &ReportFilter::default());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].latest_note.as_deref(), Some("transportadora"));
        assert_eq!(rows[0].latest_actor.as_deref(), Some("bruno"));
        assert_eq!(rows[0].latest_at.as_deref(), Some("04/01/2024 11:30:00"));
        assert_eq!(rows[1].latest_note, None);
        assert_eq!(rows[0].record_kind.as_deref(), Some("NF"));
    }

    #[test]
    fn test_stats_and_control_indicator() {
        let snapshot = snapshot();
        let outcome = outcome(&snapshot, &["100001", "100002", "999999", "100001"]);
        let stats = AuditStats::from_outcome(&outcome);

        assert_eq!(stats.requested, 3);
        assert_eq!(stats.classified, 2);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.counts.len(), AuditCategory::ALL.len());
        assert_eq!(stats.counts[&AuditCategory::NoFollowUpYet], 1);
        assert_eq!(stats.counts[&AuditCategory::Finalized], 0);
        let indicator = stats.control_indicator.unwrap();
        assert!((indicator - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_control_indicator_without_requests() {
        assert_eq!(control_indicator(0, 0), None);
        assert_eq!(control_indicator(4, 1), Some(0.75));
        assert_eq!(control_indicator(2, 5), Some(0.0));
    }

    #[test]
    fn test_order_history_is_most_recent_first() {
        let snapshot = snapshot();
        let history = order_history(&snapshot.crm_events, " 100001 ");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].actor.as_deref(), Some("bruno"));
        assert!(order_history(&snapshot.crm_events, "   ").is_empty());
    }
}
