//! Ingestion boundary
//!
//! Converts wire records into typed records. Nothing here fails the run:
//! malformed records are dropped and degraded fields are recorded as
//! [`Diagnostic`]s.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::order_detail::is_blocked_flag;
use shared::util::{parse_decimal, parse_timestamp};
use shared::{
    CrmEventRecord, CrmEventWire, CrmStatus, ErrorCode, OrderAttributes, OrderDetailRecord,
    OrderDetailWire, OrderKey, RecordKind,
};

/// Which input collection a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    OrderDetail,
    CrmEvent,
}

/// Data-quality finding recorded during ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub origin: RecordOrigin,
    /// Position of the record in its input collection
    pub index: usize,
    pub message: String,
}

impl Diagnostic {
    fn new(code: ErrorCode, origin: RecordOrigin, index: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            origin,
            index,
            message: message.into(),
        }
    }

    /// Whether the record was excluded from aggregation
    pub fn is_dropped(&self) -> bool {
        self.code == ErrorCode::MalformedRecord
    }
}

/// Immutable, typed inputs of one classification run
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot {
    pub order_details: Vec<OrderDetailRecord>,
    pub crm_events: Vec<CrmEventRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecordSnapshot {
    /// Ingest both wire collections, preserving input order.
    pub fn ingest(order_details: Vec<OrderDetailWire>, crm_events: Vec<CrmEventWire>) -> Self {
        let mut diagnostics = Vec::new();

        let order_details: Vec<_> = order_details
            .into_iter()
            .enumerate()
            .filter_map(|(index, wire)| ingest_order_detail(index, wire, &mut diagnostics))
            .collect();
        let crm_events: Vec<_> = crm_events
            .into_iter()
            .enumerate()
            .filter_map(|(index, wire)| ingest_crm_event(index, wire, &mut diagnostics))
            .collect();

        for d in &diagnostics {
            tracing::warn!(
                code = %d.code,
                origin = ?d.origin,
                index = d.index,
                "{}",
                d.message
            );
        }
        tracing::info!(
            order_details = order_details.len(),
            crm_events = crm_events.len(),
            diagnostics = diagnostics.len(),
            "Records ingested"
        );

        Self {
            order_details,
            crm_events,
            diagnostics,
        }
    }

    /// Number of records dropped from aggregation
    pub fn dropped(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_dropped()).count()
    }
}

/// Convert one order-detail wire record.
///
/// Returns `None` (and records a diagnostic) when the order key is missing.
pub fn ingest_order_detail(
    index: usize,
    wire: OrderDetailWire,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<OrderDetailRecord> {
    let origin = RecordOrigin::OrderDetail;
    let Some(order_key) = wire.order_key.as_deref().and_then(OrderKey::canonical) else {
        diagnostics.push(Diagnostic::new(
            ErrorCode::MalformedRecord,
            origin,
            index,
            "order-detail record without order key dropped",
        ));
        return None;
    };

    let net_value = match &wire.net_value {
        None => Decimal::ZERO,
        Some(value) if value.is_null() => Decimal::ZERO,
        Some(value) => parse_decimal(value).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::new(
                ErrorCode::UnparseableValue,
                origin,
                index,
                format!("net value {value} of order {order_key} is not numeric, counted as 0"),
            ));
            Decimal::ZERO
        }),
    };

    Some(OrderDetailRecord {
        record_kind: RecordKind::from_label(wire.record_kind.as_deref()),
        kind_label: wire.record_kind,
        blocked: is_blocked_flag(wire.blocked_flag.as_deref()),
        raw_id: wire.raw_id,
        net_value,
        document_status_code: wire.document_status_code,
        attributes: OrderAttributes {
            channel: wire.channel,
            company_id: wire.company_id,
            carrier: wire.carrier,
            block_reason: wire.block_reason,
            order_date: wire.order_date,
            extra: wire.extra,
        },
        order_key,
    })
}

/// Convert one CRM wire record.
///
/// Returns `None` (and records a diagnostic) when the order key is missing.
pub fn ingest_crm_event(
    index: usize,
    wire: CrmEventWire,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<CrmEventRecord> {
    let origin = RecordOrigin::CrmEvent;
    let Some(order_key) = wire.order_key.as_deref().and_then(OrderKey::canonical) else {
        diagnostics.push(Diagnostic::new(
            ErrorCode::MalformedRecord,
            origin,
            index,
            "CRM record without order key dropped",
        ));
        return None;
    };

    let timestamp = wire.timestamp.as_deref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            diagnostics.push(Diagnostic::new(
                ErrorCode::UnparseableTimestamp,
                origin,
                index,
                format!("timestamp '{raw}' of order {order_key} is not a date, sorted as earliest"),
            ));
        }
        parsed
    });

    Some(CrmEventRecord {
        status: CrmStatus::from_description(wire.description.as_deref()),
        order_key,
        raw_id: wire.raw_id,
        description: wire.description,
        note: wire.note,
        actor: wire.actor,
        timestamp,
    })
}
