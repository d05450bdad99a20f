//! Aggregator
//!
//! Per-order projections over one run's records. Every aggregate borrows
//! from the [`RecordSnapshot`](crate::ingest::RecordSnapshot) it was built
//! from and is discarded with it.

use rust_decimal::Decimal;
use shared::{CrmEventRecord, OrderDetailRecord, RecordKind};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Aggregates consumed by the rule evaluator
#[derive(Debug, Default)]
pub struct Aggregates<'a> {
    /// Distinct order keys in first-seen order
    pub order_keys: Vec<&'a str>,
    pub net_value_by_order: HashMap<&'a str, Decimal>,
    pub record_kinds_by_order: HashMap<&'a str, BTreeSet<RecordKind>>,
    pub fiscal_only_records: Vec<&'a OrderDetailRecord>,
    /// Orders whose fiscal documents are all canceled (at least one required)
    pub fully_canceled_orders: HashSet<&'a str>,
    pub blocked_orders: HashSet<&'a str>,
    /// Full CRM history, input order
    pub crm_events: &'a [CrmEventRecord],
    pub latest_event_by_raw_id: HashMap<&'a str, &'a CrmEventRecord>,
    pub latest_event_by_order: HashMap<&'a str, &'a CrmEventRecord>,
    /// Orders with at least one CRM entry beyond the dispatch placeholder
    pub orders_with_real_activity: HashSet<&'a str>,
    /// Orders whose most recent CRM entry is a finalized status
    pub orders_finalized: HashSet<&'a str>,
}

impl<'a> Aggregates<'a> {
    pub fn compute(details: &'a [OrderDetailRecord], crm_events: &'a [CrmEventRecord]) -> Self {
        let mut order_keys = Vec::new();
        let mut net_value_by_order: HashMap<&str, Decimal> = HashMap::new();
        let mut record_kinds_by_order: HashMap<&str, BTreeSet<RecordKind>> = HashMap::new();
        let mut blocked_orders = HashSet::new();
        let mut fiscal_canceled: HashMap<&str, bool> = HashMap::new();
        let mut fiscal_only_records = Vec::new();

        for record in details {
            let key = record.order_key.as_str();
            if !net_value_by_order.contains_key(key) {
                order_keys.push(key);
            }
            *net_value_by_order.entry(key).or_default() += record.net_value;
            record_kinds_by_order
                .entry(key)
                .or_default()
                .insert(record.record_kind);
            if record.blocked {
                blocked_orders.insert(key);
            }
            if record.is_fiscal() {
                fiscal_only_records.push(record);
                *fiscal_canceled.entry(key).or_insert(true) &= record.is_canceled_document();
            }
        }

        let fully_canceled_orders = fiscal_canceled
            .into_iter()
            .filter_map(|(key, all_canceled)| all_canceled.then_some(key))
            .collect();

        let latest_event_by_raw_id = latest_by(crm_events, CrmEventRecord::document_key);
        let latest_event_by_order = latest_by(crm_events, |e| e.order_key.as_str());

        let orders_with_real_activity = crm_events
            .iter()
            .filter(|e| e.status.is_real_activity())
            .map(|e| e.order_key.as_str())
            .collect();
        let orders_finalized = latest_event_by_order
            .iter()
            .filter(|(_, e)| e.status.is_finalized())
            .map(|(key, _)| *key)
            .collect();

        Self {
            order_keys,
            net_value_by_order,
            record_kinds_by_order,
            fiscal_only_records,
            fully_canceled_orders,
            blocked_orders,
            crm_events,
            latest_event_by_raw_id,
            latest_event_by_order,
            orders_with_real_activity,
            orders_finalized,
        }
    }

    /// Summed net value, zero for unknown orders
    pub fn net_value(&self, key: &str) -> Decimal {
        self.net_value_by_order
            .get(key)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn has_fiscal_document(&self, key: &str) -> bool {
        self.record_kinds_by_order
            .get(key)
            .is_some_and(|kinds| kinds.contains(&RecordKind::FiscalDocument))
    }

    /// Order has records, and all of them are order-level entries
    pub fn has_only_order_entries(&self, key: &str) -> bool {
        self.record_kinds_by_order
            .get(key)
            .is_some_and(|kinds| kinds.iter().all(|k| *k == RecordKind::OrderLevel))
    }

    pub fn has_crm_records(&self) -> bool {
        !self.crm_events.is_empty()
    }

    /// Keys whose summed net value is strictly positive
    pub fn positive_orders(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order_keys
            .iter()
            .copied()
            .filter(|key| self.net_value(key) > Decimal::ZERO)
    }
}

/// Most recent event per grouping key.
///
/// Missing timestamps lose against any real timestamp; on ties the earlier
/// record in input order is kept.
pub fn latest_by<'a, F>(events: &'a [CrmEventRecord], key_of: F) -> HashMap<&'a str, &'a CrmEventRecord>
where
    F: Fn(&'a CrmEventRecord) -> &'a str,
{
    let mut latest: HashMap<&str, &CrmEventRecord> = HashMap::new();
    for event in events {
        latest
            .entry(key_of(event))
            .and_modify(|current| {
                if event.timestamp > current.timestamp {
                    *current = event;
                }
            })
            .or_insert(event);
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::{CrmStatus, OrderAttributes, OrderKey};
    use std::str::FromStr;

    fn detail(key: &str, kind: RecordKind, value: &str, status: Option<&str>) -> OrderDetailRecord {
        OrderDetailRecord {
            order_key: OrderKey::canonical(key).unwrap(),
            raw_id: Some(format!("{key}01")),
            record_kind: kind,
            kind_label: None,
            net_value: Decimal::from_str(value).unwrap(),
            document_status_code: status.map(str::to_string),
            blocked: false,
            attributes: OrderAttributes::default(),
        }
    }

    fn event(key: &str, raw: &str, desc: &str, day: Option<u32>) -> CrmEventRecord {
        CrmEventRecord {
            order_key: OrderKey::canonical(key).unwrap(),
            raw_id: Some(raw.to_string()),
            status: CrmStatus::from_description(Some(desc)),
            description: Some(desc.to_string()),
            note: None,
            actor: None,
            timestamp: day.map(|d| {
                NaiveDate::from_ymd_opt(2024, 1, d)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap()
            }),
        }
    }

    #[test]
    fn test_net_value_is_summed_per_order() {
        let details = vec![
            detail("1", RecordKind::OrderLevel, "100.10", None),
            detail("1", RecordKind::FiscalDocument, "-40.05", None),
            detail("2", RecordKind::FiscalDocument, "0", None),
        ];
        let agg = Aggregates::compute(&details, &[]);

        assert_eq!(agg.net_value("1"), Decimal::from_str("60.05").unwrap());
        assert_eq!(agg.net_value("2"), Decimal::ZERO);
        assert_eq!(agg.net_value("missing"), Decimal::ZERO);
        assert_eq!(agg.order_keys, vec!["1", "2"]);
    }

    #[test]
    fn test_fully_canceled_requires_every_fiscal_document() {
        let details = vec![
            detail("1", RecordKind::FiscalDocument, "10", Some("101")),
            detail("1", RecordKind::FiscalDocument, "10", Some("100")),
            detail("2", RecordKind::FiscalDocument, "10", Some("101")),
            detail("2", RecordKind::OrderLevel, "10", None),
            detail("3", RecordKind::OrderLevel, "10", None),
        ];
        let agg = Aggregates::compute(&details, &[]);

        assert!(!agg.fully_canceled_orders.contains("1"));
        assert!(agg.fully_canceled_orders.contains("2"));
        // no fiscal documents: never fully canceled
        assert!(!agg.fully_canceled_orders.contains("3"));
        assert_eq!(agg.fiscal_only_records.len(), 3);
    }

    #[test]
    fn test_record_kind_helpers() {
        let details = vec![
            detail("1", RecordKind::OrderLevel, "1", None),
            detail("2", RecordKind::OrderLevel, "1", None),
            detail("2", RecordKind::FiscalDocument, "1", None),
        ];
        let agg = Aggregates::compute(&details, &[]);

        assert!(agg.has_only_order_entries("1"));
        assert!(!agg.has_fiscal_document("1"));
        assert!(!agg.has_only_order_entries("2"));
        assert!(agg.has_fiscal_document("2"));
        assert!(!agg.has_only_order_entries("unknown"));
    }

    #[test]
    fn test_latest_event_picks_greatest_timestamp() {
        let events = vec![
            event("1", "101", "EM EXPEDIÇÃO", Some(1)),
            event("1", "101", "FINALIZADO", Some(3)),
            event("1", "101", "COBRANÇA", Some(2)),
        ];
        let latest = latest_by(&events, CrmEventRecord::document_key);
        assert_eq!(latest["101"].description.as_deref(), Some("FINALIZADO"));
    }

    #[test]
    fn test_unparseable_timestamp_never_wins() {
        let events = vec![
            event("1", "101", "COBRANÇA", Some(1)),
            event("1", "101", "FINALIZADO", None),
        ];
        let latest = latest_by(&events, CrmEventRecord::document_key);
        assert_eq!(latest["101"].description.as_deref(), Some("COBRANÇA"));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let events = vec![
            event("1", "101", "PRIMEIRO", Some(5)),
            event("1", "101", "SEGUNDO", Some(5)),
        ];
        let latest = latest_by(&events, CrmEventRecord::document_key);
        assert_eq!(latest["101"].description.as_deref(), Some("PRIMEIRO"));
    }

    #[test]
    fn test_per_order_and_per_raw_views_differ() {
        let events = vec![
            event("1", "101", "FINALIZADO", Some(1)),
            event("1", "102", "COBRANÇA", Some(2)),
        ];
        let agg = Aggregates::compute(&[], &events);

        assert_eq!(agg.latest_event_by_raw_id.len(), 2);
        assert_eq!(
            agg.latest_event_by_order["1"].description.as_deref(),
            Some("COBRANÇA")
        );
        assert!(!agg.orders_finalized.contains("1"));
    }

    #[test]
    fn test_real_activity_ignores_dispatch_placeholder() {
        let events = vec![
            event("1", "101", "EM EXPEDIÇÃO", Some(1)),
            event("2", "201", "EM EXPEDIÇÃO", Some(1)),
            event("2", "201", "CONTATO CLIENTE", Some(2)),
        ];
        let agg = Aggregates::compute(&[], &events);

        assert!(!agg.orders_with_real_activity.contains("1"));
        assert!(agg.orders_with_real_activity.contains("2"));
        assert!(agg.has_crm_records());
    }
}
