use audit_core::{ReportFilter, RequestedIds};
use clap::Parser;
use shared::AuditCategory;
use std::path::{Path, PathBuf};

/// Order audit - classify orders into audit categories
#[derive(Parser, Debug, Clone)]
#[command(name = "order-audit", version)]
pub struct Args {
    /// File with the order identifiers to audit, one per line
    pub ids: PathBuf,

    /// Order-detail snapshot (JSON array); replaces live retrieval
    #[arg(long, value_name = "FILE")]
    pub details: Option<PathBuf>,

    /// CRM snapshot (JSON array), used together with --details
    #[arg(long, value_name = "FILE", requires = "details")]
    pub crm: Option<PathBuf>,

    /// Policy table (JSON); the built-in policy when absent
    #[arg(long, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Directory receiving the report files
    #[arg(short, long, default_value = "audit-report")]
    pub output: PathBuf,

    /// Only export orders of this category (machine name, e.g. "returned")
    #[arg(long, value_parser = parse_category)]
    pub category: Option<AuditCategory>,

    /// Only export orders whose key contains this text
    #[arg(long)]
    pub order: Option<String>,

    /// Only export records of this sales channel
    #[arg(long)]
    pub channel: Option<String>,

    /// Only export records of this company id
    #[arg(long)]
    pub company: Option<String>,

    /// Only export records with this block reason
    #[arg(long)]
    pub block_reason: Option<String>,

    /// Only export records of this carrier
    #[arg(long)]
    pub carrier: Option<String>,
}

impl Args {
    pub fn filter(&self) -> ReportFilter {
        ReportFilter {
            category: self.category,
            order_contains: self.order.clone(),
            channel: self.channel.clone(),
            company_id: self.company.clone(),
            block_reason: self.block_reason.clone(),
            carrier: self.carrier.clone(),
        }
    }
}

fn parse_category(raw: &str) -> Result<AuditCategory, String> {
    AuditCategory::from_name(raw).ok_or_else(|| {
        let names: Vec<_> = AuditCategory::ALL.iter().map(|c| c.name()).collect();
        format!("unknown category '{raw}', expected one of: {}", names.join(", "))
    })
}

/// Read requested identifiers, one per line
pub fn read_ids(path: &Path) -> anyhow::Result<RequestedIds> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read identifiers from {}: {e}", path.display()))?;
    let ids = RequestedIds::from_raw(text.lines());
    if ids.skipped() > 0 {
        tracing::debug!(skipped = ids.skipped(), "Blank identifier lines ignored");
    }
    Ok(ids)
}
