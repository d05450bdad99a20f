//! Order Detail Model

use crate::types::OrderKey;
use crate::util::lenient_text;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record-kind label of the order-level placeholder entry
pub const ORDER_LEVEL_LABEL: &str = "Pedido";
/// Fiscal document status code meaning "canceled"
pub const FISCAL_CANCELED_STATUS: &str = "101";
/// Suffix appended to a raw id whose document was canceled
pub const CANCEL_MARKER: &str = "_CANC";
/// Blocked-flag value meaning "order is blocked"
pub const BLOCKED_FLAG: &str = "T";

/// Order-detail record as returned by the upstream service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDetailWire {
    #[serde(rename = "pedido_normalizado", default, deserialize_with = "lenient_text")]
    pub order_key: Option<String>,
    #[serde(rename = "pedido_raw", default, deserialize_with = "lenient_text")]
    pub raw_id: Option<String>,
    #[serde(rename = "validacao_pedido", default, deserialize_with = "lenient_text")]
    pub record_kind: Option<String>,
    #[serde(rename = "valor_normalizado", default)]
    pub net_value: Option<Value>,
    #[serde(rename = "nfe_cstat", default, deserialize_with = "lenient_text")]
    pub document_status_code: Option<String>,
    #[serde(rename = "bloqueada", default, deserialize_with = "lenient_text")]
    pub blocked_flag: Option<String>,
    #[serde(rename = "canal_venda", default, deserialize_with = "lenient_text")]
    pub channel: Option<String>,
    #[serde(rename = "id_empresa", default, deserialize_with = "lenient_text")]
    pub company_id: Option<String>,
    #[serde(rename = "transportadora", default, deserialize_with = "lenient_text")]
    pub carrier: Option<String>,
    #[serde(rename = "motivo_bloqueio", default, deserialize_with = "lenient_text")]
    pub block_reason: Option<String>,
    #[serde(rename = "data_pedido", default, deserialize_with = "lenient_text")]
    pub order_date: Option<String>,
    /// Columns not used by classification, kept for export
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kind of an order-detail line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Order-level placeholder (no invoice issued yet)
    OrderLevel,
    /// Fiscal document (invoice) entry
    FiscalDocument,
}

impl RecordKind {
    /// Tag a record-kind label. Only the order-level label is recognized;
    /// every other value, including a missing one, denotes a fiscal document.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(l) if l.trim().eq_ignore_ascii_case(ORDER_LEVEL_LABEL) => Self::OrderLevel,
            _ => Self::FiscalDocument,
        }
    }
}

/// Descriptive attributes, opaque to classification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderAttributes {
    pub channel: Option<String>,
    pub company_id: Option<String>,
    pub carrier: Option<String>,
    pub block_reason: Option<String>,
    pub order_date: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Typed order-detail record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetailRecord {
    pub order_key: OrderKey,
    pub raw_id: Option<String>,
    pub record_kind: RecordKind,
    /// Original record-kind label
    pub kind_label: Option<String>,
    /// Contribution to the order's net value (zero when unparseable)
    pub net_value: Decimal,
    pub document_status_code: Option<String>,
    pub blocked: bool,
    pub attributes: OrderAttributes,
}

impl OrderDetailRecord {
    pub fn is_fiscal(&self) -> bool {
        self.record_kind == RecordKind::FiscalDocument
    }

    /// Whether this line represents a canceled fiscal document
    pub fn is_canceled_document(&self) -> bool {
        self.document_status_code.as_deref() == Some(FISCAL_CANCELED_STATUS)
            || self
                .raw_id
                .as_deref()
                .is_some_and(|id| id.to_uppercase().ends_with(CANCEL_MARKER))
    }
}

/// Whether a raw blocked-flag value means "blocked"
pub fn is_blocked_flag(flag: Option<&str>) -> bool {
    flag.is_some_and(|f| f.trim().eq_ignore_ascii_case(BLOCKED_FLAG))
}
