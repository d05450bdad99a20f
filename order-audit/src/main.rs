use clap::Parser;
use order_audit::{Args, Config, logger, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env();
    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    let summary = match run(&args, &config).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Audit failed: {e:#}");
            return Err(e);
        }
    };

    if !summary.failures.is_empty() {
        tracing::warn!(
            failures = summary.failures.len(),
            "Some identifiers could not be fetched and count as not found"
        );
    }
    for file in &summary.files {
        println!("{}", file.display());
    }
    Ok(())
}
