//! Order audit command-line driver
//!
//! Reads requested identifiers, retrieves (or replays) the records, runs the
//! classification and writes the report files.

pub mod cli;
pub mod config;
pub mod logger;
pub mod output;

pub use cli::Args;
pub use config::Config;

use anyhow::Context;
use audit_client::{FetchFailure, HttpRecordSource, RecordSource, fetch_snapshot, load_source};
use audit_core::{AuditPolicy, AuditReport, AuditStats, CompiledPolicy, RecordSnapshot, run_audit};
use std::path::PathBuf;

/// What one run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: AuditStats,
    pub failures: Vec<FetchFailure>,
    pub files: Vec<PathBuf>,
}

/// Load the policy table, falling back to the built-in one.
///
/// Compiled before any record is touched so a bad policy fails fast.
pub fn load_policy(args: &Args) -> anyhow::Result<CompiledPolicy> {
    let policy = match &args.policy {
        Some(path) => AuditPolicy::from_file(path)
            .with_context(|| format!("loading policy {}", path.display()))?,
        None => AuditPolicy::default(),
    };
    Ok(policy.compile()?)
}

/// Execute one audit run
pub async fn run(args: &Args, config: &Config) -> anyhow::Result<RunSummary> {
    let policy = load_policy(args)?;
    let requested = cli::read_ids(&args.ids)?;
    if requested.is_empty() {
        anyhow::bail!("no identifiers found in {}", args.ids.display());
    }
    tracing::info!(
        requested = requested.len(),
        policy = policy.version(),
        "Audit run starting"
    );

    let client_config = config.client_config();
    let source: Box<dyn RecordSource> = match &args.details {
        Some(details) => Box::new(load_source(details, args.crm.as_deref())?),
        None => Box::new(HttpRecordSource::new(&client_config)?),
    };
    let fetched = fetch_snapshot(
        source.as_ref(),
        &requested.lookup_keys(),
        &client_config.limits(),
    )
    .await;

    let snapshot = RecordSnapshot::ingest(fetched.order_details, fetched.crm_events);
    let outcome = run_audit(&requested, &snapshot, &policy);
    let report = AuditReport::build(&outcome, &snapshot, &args.filter());
    log_dashboard(&report.stats);

    let files = output::write_report(&args.output, &report)?;
    Ok(RunSummary {
        stats: report.stats,
        failures: fetched.failures,
        files,
    })
}

fn log_dashboard(stats: &AuditStats) {
    for (category, count) in &stats.counts {
        tracing::info!(category = category.name(), count, "{}", category.label());
    }
    match stats.control_indicator {
        Some(indicator) => tracing::info!(
            requested = stats.requested,
            not_found = stats.not_found,
            "Control indicator {:.1}%",
            indicator * 100.0
        ),
        None => tracing::info!("Control indicator unavailable, nothing requested"),
    }
}
