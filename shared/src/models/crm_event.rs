//! CRM progress-log model

use crate::types::OrderKey;
use crate::util::lenient_text;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default description of a freshly dispatched order (no real follow-up yet)
pub const IN_DISPATCH_LABEL: &str = "EM EXPEDIÇÃO";
/// Terminal description written when an order's case is closed
pub const FINALIZED_LABEL: &str = "FINALIZADO";
/// Prefix shared by every finalized variant
pub const FINALIZED_PREFIX: &str = "FINAL";

/// CRM progress-log entry as returned by the upstream service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmEventWire {
    #[serde(rename = "pedido_normalizado", default, deserialize_with = "lenient_text")]
    pub order_key: Option<String>,
    #[serde(rename = "pedido_raw", default, deserialize_with = "lenient_text")]
    pub raw_id: Option<String>,
    #[serde(rename = "andamento_descricao", default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(rename = "andamento_obs", default, deserialize_with = "lenient_text")]
    pub note: Option<String>,
    #[serde(rename = "usuario_andamento", default, deserialize_with = "lenient_text")]
    pub actor: Option<String>,
    #[serde(rename = "datahora_andamento", default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Progress status, tagged from the free-form description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmStatus {
    /// Placeholder written on dispatch
    InDispatch,
    /// Exactly the terminal "finalized" description
    Finalized,
    /// Some other description starting with the finalized prefix
    FinalizedOther,
    /// Any other description
    Other,
    /// No description
    Missing,
}

impl CrmStatus {
    pub fn from_description(description: Option<&str>) -> Self {
        let Some(text) = description.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::Missing;
        };
        let upper = text.to_uppercase();
        if upper == IN_DISPATCH_LABEL {
            Self::InDispatch
        } else if upper == FINALIZED_LABEL {
            Self::Finalized
        } else if upper.starts_with(FINALIZED_PREFIX) {
            Self::FinalizedOther
        } else {
            Self::Other
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized | Self::FinalizedOther)
    }

    /// Anything other than the dispatch placeholder counts as a real follow-up
    pub fn is_real_activity(&self) -> bool {
        !matches!(self, Self::InDispatch)
    }
}

/// Typed CRM progress-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmEventRecord {
    pub order_key: OrderKey,
    pub raw_id: Option<String>,
    pub status: CrmStatus,
    pub description: Option<String>,
    pub note: Option<String>,
    pub actor: Option<String>,
    /// `None` when missing or unparseable; sorts before every real timestamp
    pub timestamp: Option<NaiveDateTime>,
}

impl CrmEventRecord {
    /// Grouping key for per-document projections.
    /// Entries without a raw id refer to the order itself.
    pub fn document_key(&self) -> &str {
        self.raw_id.as_deref().unwrap_or(self.order_key.as_str())
    }
}
