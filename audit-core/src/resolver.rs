//! Priority Resolver
//!
//! First-match-wins: each order gets the category of the earliest rule in the
//! policy whose result contains it, or [`AuditCategory::Ok`].

use crate::aggregate::Aggregates;
use crate::rules::RuleHits;
use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;
use shared::{AuditCategory, OrderKey};
use std::collections::{BTreeMap, HashMap};

/// Order key → category, iterable in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditMap {
    order: Vec<OrderKey>,
    categories: HashMap<OrderKey, AuditCategory>,
}

impl AuditMap {
    pub fn get(&self, key: &str) -> Option<AuditCategory> {
        self.categories.get(key).copied()
    }

    /// Category of a key, `Ok` for keys the map does not know
    pub fn category_or_ok(&self, key: &str) -> AuditCategory {
        self.get(key).unwrap_or(AuditCategory::Ok)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.categories.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OrderKey, AuditCategory)> {
        self.order.iter().map(|k| (k, self.categories[k.as_str()]))
    }

    /// Orders per category; every category present, zero-filled
    pub fn counts(&self) -> BTreeMap<AuditCategory, usize> {
        let mut counts: BTreeMap<_, _> = AuditCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for category in self.categories.values() {
            *counts.entry(*category).or_default() += 1;
        }
        counts
    }

    /// Keys assigned to `category`, first-seen order
    pub fn keys_in(&self, category: AuditCategory) -> Vec<&OrderKey> {
        self.iter()
            .filter(|(_, c)| *c == category)
            .map(|(k, _)| k)
            .collect()
    }

    fn insert(&mut self, key: OrderKey, category: AuditCategory) {
        if self.categories.insert(key.clone(), category).is_none() {
            self.order.push(key);
        }
    }
}

impl Serialize for AuditMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, category) in self.iter() {
            map.serialize_entry(key, &category)?;
        }
        map.end()
    }
}

/// Assign exactly one category to every order in the aggregates
pub fn resolve(agg: &Aggregates<'_>, hits: &RuleHits<'_>) -> AuditMap {
    let mut map = AuditMap::default();
    for key in &agg.order_keys {
        let category = hits
            .iter()
            .find(|hit| hit.orders.contains(key))
            .map(|hit| hit.category)
            .unwrap_or(AuditCategory::Ok);
        if let Some(order_key) = OrderKey::canonical(key) {
            map.insert(order_key, category);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AuditPolicy, Predicate, RuleDefinition};
    use crate::rules::evaluate;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shared::{CrmEventRecord, CrmStatus, OrderAttributes, OrderDetailRecord, RecordKind};

    fn detail(key: &str, kind: RecordKind, value: i64, status: Option<&str>, blocked: bool) -> OrderDetailRecord {
        OrderDetailRecord {
            order_key: OrderKey::canonical(key).unwrap(),
            raw_id: Some(format!("{key}01")),
            record_kind: kind,
            kind_label: None,
            net_value: Decimal::from(value),
            document_status_code: status.map(str::to_string),
            blocked,
            attributes: OrderAttributes::default(),
        }
    }

    fn event(key: &str, desc: &str, day: u32) -> CrmEventRecord {
        CrmEventRecord {
            order_key: OrderKey::canonical(key).unwrap(),
            raw_id: Some(format!("{key}01")),
            status: CrmStatus::from_description(Some(desc)),
            description: Some(desc.to_string()),
            note: None,
            actor: None,
            timestamp: NaiveDate::from_ymd_opt(2024, 3, day).and_then(|d| d.and_hms_opt(10, 0, 0)),
        }
    }

    #[test]
    fn test_every_order_gets_exactly_one_category() {
        let details = vec![
            detail("A", RecordKind::OrderLevel, 150, None, true),
            detail("B", RecordKind::FiscalDocument, 80, Some("101"), false),
            detail("C", RecordKind::FiscalDocument, 0, None, false),
            detail("D", RecordKind::FiscalDocument, 300, None, false),
            detail("A", RecordKind::OrderLevel, 0, None, false),
        ];
        let policy = AuditPolicy::default().compile().unwrap();
        let agg = Aggregates::compute(&details, &[]);
        let map = resolve(&agg, &evaluate(&policy, &agg));

        assert_eq!(map.len(), 4);
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C", "D"]);
        assert_eq!(map.get("A"), Some(AuditCategory::BlockedWithoutBilling));
        assert_eq!(map.get("B"), Some(AuditCategory::FullyCanceledBilling));
        assert_eq!(map.get("C"), Some(AuditCategory::Returned));
        assert_eq!(map.get("D"), Some(AuditCategory::Ok));
        assert_eq!(map.counts().values().sum::<usize>(), 4);
    }

    #[test]
    fn test_reordering_the_policy_changes_the_outcome() {
        // collection history, then finalized: both rules select the order
        let details = vec![detail("B", RecordKind::FiscalDocument, 250, None, false)];
        let events = vec![event("B", "COBRANÇA", 1), event("B", "FINALIZADO", 2)];
        let agg = Aggregates::compute(&details, &events);

        let default = AuditPolicy::default().compile().unwrap();
        let map = resolve(&agg, &evaluate(&default, &agg));
        assert_eq!(map.get("B"), Some(AuditCategory::ActiveCollection));

        let finalized_first = AuditPolicy {
            version: "finalized-first".to_string(),
            rules: vec![
                RuleDefinition::new(AuditCategory::Finalized, Predicate::FinalizedWithBilling),
                RuleDefinition::new(
                    AuditCategory::ActiveCollection,
                    Predicate::PositiveWithDescription {
                        pattern: "COBRAN[ÇC]".to_string(),
                    },
                ),
            ],
        }
        .compile()
        .unwrap();
        let map = resolve(&agg, &evaluate(&finalized_first, &agg));
        assert_eq!(map.get("B"), Some(AuditCategory::Finalized));
    }

    #[test]
    fn test_empty_policy_assigns_ok() {
        let details = vec![detail("X", RecordKind::FiscalDocument, 10, Some("101"), true)];
        let agg = Aggregates::compute(&details, &[]);
        let policy = AuditPolicy {
            version: "empty".to_string(),
            rules: vec![],
        }
        .compile()
        .unwrap();
        let map = resolve(&agg, &evaluate(&policy, &agg));
        assert_eq!(map.get("X"), Some(AuditCategory::Ok));
        assert_eq!(map.category_or_ok("unknown"), AuditCategory::Ok);
        assert!(!map.contains("unknown"));
    }

    #[test]
    fn test_counts_are_zero_filled() {
        let map = AuditMap::default();
        let counts = map.counts();
        assert_eq!(counts.len(), AuditCategory::ALL.len());
        assert!(counts.values().all(|n| *n == 0));
    }

    #[test]
    fn test_serializes_in_first_seen_order() {
        let details = vec![
            detail("Z", RecordKind::FiscalDocument, 10, None, false),
            detail("A", RecordKind::FiscalDocument, 0, None, false),
        ];
        let agg = Aggregates::compute(&details, &[]);
        let policy = AuditPolicy::default().compile().unwrap();
        let map = resolve(&agg, &evaluate(&policy, &agg));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Z":"ok","A":"returned"}"#);
    }
}
