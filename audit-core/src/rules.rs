//! Rule Evaluator
//!
//! Evaluates every rule of a [`CompiledPolicy`] independently against the
//! aggregates. Each rule yields the set of order keys it selects; CRM-backed
//! rules yield an empty set when the order has no CRM history.

use crate::aggregate::Aggregates;
use crate::policy::{CompiledPolicy, Matcher};
use regex::Regex;
use rust_decimal::Decimal;
use shared::{AuditCategory, CrmStatus};
use std::collections::HashSet;

/// Result of one rule
#[derive(Debug, Clone)]
pub struct RuleHit<'a> {
    pub category: AuditCategory,
    pub orders: HashSet<&'a str>,
}

/// Results of all rules, in priority order
#[derive(Debug, Clone, Default)]
pub struct RuleHits<'a> {
    hits: Vec<RuleHit<'a>>,
}

impl<'a> RuleHits<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &RuleHit<'a>> {
        self.hits.iter()
    }

    /// Orders selected by the rule for `category`, if the policy has one
    pub fn orders_for(&self, category: AuditCategory) -> Option<&HashSet<&'a str>> {
        self.hits
            .iter()
            .find(|h| h.category == category)
            .map(|h| &h.orders)
    }
}

/// Missing text never matches
fn text_matches(re: &Regex, text: Option<&str>) -> bool {
    text.is_some_and(|t| re.is_match(t))
}

/// Evaluate the whole policy.
///
/// Rules are independent; exclusions named by an open-follow-up rule are
/// applied afterwards against the other rules' raw results.
pub fn evaluate<'a>(policy: &CompiledPolicy, agg: &Aggregates<'a>) -> RuleHits<'a> {
    let mut hits: Vec<RuleHit<'a>> = policy
        .rules()
        .iter()
        .map(|rule| RuleHit {
            category: rule.category,
            orders: select(&rule.matcher, agg),
        })
        .collect();

    let exclusions: Vec<(usize, HashSet<&'a str>)> = policy
        .rules()
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| match &rule.matcher {
            Matcher::OpenFollowUp { exclude } => {
                let excluded = hits
                    .iter()
                    .filter(|h| exclude.contains(&h.category))
                    .flat_map(|h| h.orders.iter().copied())
                    .collect();
                Some((i, excluded))
            }
            _ => None,
        })
        .collect();
    for (i, excluded) in exclusions {
        hits[i].orders.retain(|key| !excluded.contains(key));
    }

    for hit in &hits {
        tracing::debug!(category = hit.category.name(), orders = hit.orders.len(), "Rule evaluated");
    }
    RuleHits { hits }
}

fn select<'a>(matcher: &Matcher, agg: &Aggregates<'a>) -> HashSet<&'a str> {
    match matcher {
        Matcher::LatestDocumentNote(re) => pending_cancellation(agg, re),
        Matcher::BlockedWithoutBilling => blocked_without_billing(agg),
        Matcher::FullyCanceledBilling => agg.fully_canceled_orders.clone(),
        Matcher::NetValueWithin { lower, upper } => returned(agg, *lower, *upper),
        Matcher::PositiveWithDescription(re) => active_collection(agg, re),
        Matcher::PositiveFinalizedWithNote(re) => debit_note_sent(agg, re),
        Matcher::FinalizedWithBilling => finalized(agg),
        Matcher::OpenFollowUp { .. } => open_follow_up(agg),
        Matcher::PositiveWithoutFollowUp => no_follow_up_yet(agg),
    }
}

fn pending_cancellation<'a>(agg: &Aggregates<'a>, re: &Regex) -> HashSet<&'a str> {
    agg.latest_event_by_raw_id
        .values()
        .copied()
        .filter(|e| text_matches(re, e.note.as_deref()))
        .map(|e| e.order_key.as_str())
        .collect()
}

fn blocked_without_billing<'a>(agg: &Aggregates<'a>) -> HashSet<&'a str> {
    agg.blocked_orders
        .iter()
        .copied()
        .filter(|key| agg.has_only_order_entries(key))
        .collect()
}

fn returned<'a>(agg: &Aggregates<'a>, lower: Decimal, upper: Decimal) -> HashSet<&'a str> {
    agg.order_keys
        .iter()
        .copied()
        .filter(|key| agg.has_fiscal_document(key))
        .filter(|key| {
            let value = agg.net_value(key);
            value > lower && value < upper
        })
        .filter(|key| !agg.fully_canceled_orders.contains(key))
        .collect()
}

fn active_collection<'a>(agg: &Aggregates<'a>, re: &Regex) -> HashSet<&'a str> {
    let in_collection: HashSet<&str> = agg
        .crm_events
        .iter()
        .filter(|e| text_matches(re, e.description.as_deref()))
        .map(|e| e.order_key.as_str())
        .collect();
    agg.positive_orders()
        .filter(|key| in_collection.contains(key))
        .collect()
}

fn debit_note_sent<'a>(agg: &Aggregates<'a>, re: &Regex) -> HashSet<&'a str> {
    agg.positive_orders()
        .filter(|key| {
            agg.latest_event_by_order.get(key).is_some_and(|e| {
                e.status == CrmStatus::Finalized && text_matches(re, e.note.as_deref())
            })
        })
        .collect()
}

fn finalized<'a>(agg: &Aggregates<'a>) -> HashSet<&'a str> {
    agg.orders_finalized
        .iter()
        .copied()
        .filter(|key| agg.has_fiscal_document(key))
        .collect()
}

fn open_follow_up<'a>(agg: &Aggregates<'a>) -> HashSet<&'a str> {
    agg.orders_with_real_activity
        .iter()
        .copied()
        .filter(|key| agg.has_fiscal_document(key))
        .filter(|key| !agg.orders_finalized.contains(key))
        .collect()
}

fn no_follow_up_yet<'a>(agg: &Aggregates<'a>) -> HashSet<&'a str> {
    if !agg.has_crm_records() {
        return HashSet::new();
    }
    agg.positive_orders()
        .filter(|key| !agg.orders_with_real_activity.contains(key))
        .filter(|key| !agg.fully_canceled_orders.contains(key))
        .collect()
}
