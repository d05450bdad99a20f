//! Audit policy
//!
//! The ordered rule table is data: each entry names the category it assigns
//! and the predicate (with its parameters) that selects orders. Priority is
//! the position in the table. A policy is compiled once per run, which
//! validates it and builds the regular expressions.

use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{AppError, AppResult, AuditCategory, ErrorCode};
use std::collections::HashSet;
use std::path::Path;

/// Version tag of the built-in policy
pub const DEFAULT_POLICY_VERSION: &str = "2024.2";

pub const PENDING_CANCELLATION_PATTERN: &str = r"^LIB.*CANC";
pub const ACTIVE_COLLECTION_PATTERN: &str = r"JUR[ÍI]D|COBRAN[ÇC]|REVERSA.*?PAGAMENTO";
pub const DEBIT_NOTE_SENT_PATTERN: &str = r"BITO.*?ENV";

/// Predicate selecting the orders a rule applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// The most recent note of any of the order's documents matches
    LatestDocumentNote { pattern: String },
    /// Only order-level entries, and blocked
    BlockedWithoutBilling,
    /// Every fiscal document canceled
    FullyCanceledBilling,
    /// Has a fiscal document, net value strictly inside `(lower, upper)`,
    /// not fully canceled
    NetValueWithin { lower: Decimal, upper: Decimal },
    /// Positive net value and any CRM description in the order's history matches
    PositiveWithDescription { pattern: String },
    /// Positive net value, latest status exactly finalized, and its note matches
    PositiveFinalizedWithNote { pattern: String },
    /// Has a fiscal document and the latest status is finalized
    FinalizedWithBilling,
    /// Has a fiscal document, real CRM activity, not finalized, and not
    /// selected by any of the listed categories' rules
    OpenFollowUp {
        #[serde(default)]
        exclude: Vec<AuditCategory>,
    },
    /// CRM data present, positive net value, no real activity, not fully canceled
    PositiveWithoutFollowUp,
}

/// One row of the policy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub category: AuditCategory,
    pub predicate: Predicate,
}

impl RuleDefinition {
    pub fn new(category: AuditCategory, predicate: Predicate) -> Self {
        Self {
            category,
            predicate,
        }
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    pub version: String,
    pub rules: Vec<RuleDefinition>,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        use AuditCategory as C;
        use Predicate as P;

        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            rules: vec![
                RuleDefinition::new(
                    C::PendingCancellation,
                    P::LatestDocumentNote {
                        pattern: PENDING_CANCELLATION_PATTERN.to_string(),
                    },
                ),
                RuleDefinition::new(C::BlockedWithoutBilling, P::BlockedWithoutBilling),
                RuleDefinition::new(C::FullyCanceledBilling, P::FullyCanceledBilling),
                RuleDefinition::new(
                    C::Returned,
                    P::NetValueWithin {
                        lower: Decimal::NEGATIVE_ONE,
                        upper: Decimal::ONE,
                    },
                ),
                RuleDefinition::new(
                    C::ActiveCollection,
                    P::PositiveWithDescription {
                        pattern: ACTIVE_COLLECTION_PATTERN.to_string(),
                    },
                ),
                RuleDefinition::new(
                    C::DebitNoteSent,
                    P::PositiveFinalizedWithNote {
                        pattern: DEBIT_NOTE_SENT_PATTERN.to_string(),
                    },
                ),
                RuleDefinition::new(C::Finalized, P::FinalizedWithBilling),
                RuleDefinition::new(
                    C::OtherFollowUp,
                    P::OpenFollowUp {
                        exclude: vec![
                            C::ActiveCollection,
                            C::DebitNoteSent,
                            C::FullyCanceledBilling,
                        ],
                    },
                ),
                RuleDefinition::new(C::NoFollowUpYet, P::PositiveWithoutFollowUp),
            ],
        }
    }
}

impl AuditPolicy {
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            AppError::invalid_policy(format!("policy document is not valid: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::from(e).with_detail("path", path.display().to_string())
        })?;
        Self::from_json_str(&json)
    }

    /// Validate the table and build its matchers
    pub fn compile(&self) -> AppResult<CompiledPolicy> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(self.rules.len());

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.category.is_default() {
                return Err(AppError::new(ErrorCode::ReservedCategory)
                    .with_detail("index", index));
            }
            if !seen.insert(rule.category) {
                return Err(AppError::new(ErrorCode::DuplicateRule)
                    .with_detail("index", index)
                    .with_detail("category", rule.category.name()));
            }
            rules.push(CompiledRule {
                category: rule.category,
                matcher: Matcher::compile(&rule.predicate, index)?,
            });
        }

        Ok(CompiledPolicy {
            version: self.version.clone(),
            rules,
        })
    }
}

/// Predicate with its patterns built
#[derive(Debug, Clone)]
pub enum Matcher {
    LatestDocumentNote(Regex),
    BlockedWithoutBilling,
    FullyCanceledBilling,
    NetValueWithin { lower: Decimal, upper: Decimal },
    PositiveWithDescription(Regex),
    PositiveFinalizedWithNote(Regex),
    FinalizedWithBilling,
    OpenFollowUp { exclude: Vec<AuditCategory> },
    PositiveWithoutFollowUp,
}

impl Matcher {
    fn compile(predicate: &Predicate, index: usize) -> AppResult<Self> {
        Ok(match predicate {
            Predicate::LatestDocumentNote { pattern } => {
                Self::LatestDocumentNote(build_regex(pattern, index)?)
            }
            Predicate::BlockedWithoutBilling => Self::BlockedWithoutBilling,
            Predicate::FullyCanceledBilling => Self::FullyCanceledBilling,
            Predicate::NetValueWithin { lower, upper } => {
                if lower >= upper {
                    return Err(AppError::invalid_policy(format!(
                        "empty value window ({lower}, {upper})"
                    ))
                    .with_detail("index", index));
                }
                Self::NetValueWithin {
                    lower: *lower,
                    upper: *upper,
                }
            }
            Predicate::PositiveWithDescription { pattern } => {
                Self::PositiveWithDescription(build_regex(pattern, index)?)
            }
            Predicate::PositiveFinalizedWithNote { pattern } => {
                Self::PositiveFinalizedWithNote(build_regex(pattern, index)?)
            }
            Predicate::FinalizedWithBilling => Self::FinalizedWithBilling,
            Predicate::OpenFollowUp { exclude } => {
                if exclude.iter().any(AuditCategory::is_default) {
                    return Err(AppError::new(ErrorCode::ReservedCategory)
                        .with_detail("index", index));
                }
                Self::OpenFollowUp {
                    exclude: exclude.clone(),
                }
            }
            Predicate::PositiveWithoutFollowUp => Self::PositiveWithoutFollowUp,
        })
    }
}

/// Case-insensitive matcher for free text
fn build_regex(pattern: &str, index: usize) -> AppResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            AppError::with_message(ErrorCode::InvalidPattern, e.to_string())
                .with_detail("index", index)
                .with_detail("pattern", pattern)
        })
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub category: AuditCategory,
    pub matcher: Matcher,
}

/// Validated rule table, ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    version: String,
    rules: Vec<CompiledRule>,
}

impl CompiledPolicy {
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Rules in priority order
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }
}
