//! Audit category taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit category assigned to an order
///
/// Declaration order is the default priority order; `Ok` is the terminal
/// default and is never produced by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    PendingCancellation,
    BlockedWithoutBilling,
    FullyCanceledBilling,
    Returned,
    ActiveCollection,
    DebitNoteSent,
    Finalized,
    OtherFollowUp,
    NoFollowUpYet,
    Ok,
}

impl AuditCategory {
    pub const ALL: [Self; 10] = [
        Self::PendingCancellation,
        Self::BlockedWithoutBilling,
        Self::FullyCanceledBilling,
        Self::Returned,
        Self::ActiveCollection,
        Self::DebitNoteSent,
        Self::Finalized,
        Self::OtherFollowUp,
        Self::NoFollowUpYet,
        Self::Ok,
    ];

    /// Stable machine name (matches the serde representation)
    pub fn name(&self) -> &'static str {
        match self {
            Self::PendingCancellation => "pending_cancellation",
            Self::BlockedWithoutBilling => "blocked_without_billing",
            Self::FullyCanceledBilling => "fully_canceled_billing",
            Self::Returned => "returned",
            Self::ActiveCollection => "active_collection",
            Self::DebitNoteSent => "debit_note_sent",
            Self::Finalized => "finalized",
            Self::OtherFollowUp => "other_follow_up",
            Self::NoFollowUpYet => "no_follow_up_yet",
            Self::Ok => "ok",
        }
    }

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::PendingCancellation => "Pending cancellation",
            Self::BlockedWithoutBilling => "Blocked without billing",
            Self::FullyCanceledBilling => "Fully canceled billing",
            Self::Returned => "Returned",
            Self::ActiveCollection => "Active collection",
            Self::DebitNoteSent => "Debit-note sent",
            Self::Finalized => "Finalized",
            Self::OtherFollowUp => "Other follow-up",
            Self::NoFollowUpYet => "No follow-up yet",
            Self::Ok => "OK",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Look up a category by machine name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matches_serde() {
        for category in AuditCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.name()));
        }
    }

    #[test]
    fn test_only_ok_is_default() {
        let defaults: Vec<_> = AuditCategory::ALL.iter().filter(|c| c.is_default()).collect();
        assert_eq!(defaults, vec![&AuditCategory::Ok]);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            AuditCategory::from_name(" Debit_Note_Sent "),
            Some(AuditCategory::DebitNoteSent)
        );
        assert_eq!(AuditCategory::from_name("returned"), Some(AuditCategory::Returned));
        assert_eq!(AuditCategory::from_name("unknown"), None);
    }

    #[test]
    fn test_display_uses_label() {
        assert_eq!(AuditCategory::DebitNoteSent.to_string(), "Debit-note sent");
        assert_eq!(AuditCategory::Ok.to_string(), "OK");
    }
}
