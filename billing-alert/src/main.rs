use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;

use billing_alert::{run_check, BillingConfig, Notifier, S3BillingStore};

#[derive(Parser, Debug)]
#[command(
    name = "billing-alert",
    about = "Blended-cost threshold watchdog for raw billing exports"
)]
pub struct CliArgs {
    /// Path to a JSON configuration document; the AWS_BILLING_*
    /// environment variables are used when absent
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value = "false")]
    pub debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => BillingConfig::from_file(path)?,
        None => BillingConfig::from_env()?,
    };

    let level = if args.debug || config.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let store = S3BillingStore::new(&config.bucket).await;
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch_dir = std::env::temp_dir();

    let outcome = run_check(&store, &notifier, &config, &scratch_dir, Utc::now()).await?;

    if outcome.notified {
        log::info!(
            "Charges [{:.2}] exceeded threshold [{}], notification sent to [{}]",
            outcome.total,
            config.threshold,
            config.channel
        );
    } else {
        log::debug!(
            "Charges [{:.2}] within threshold [{}]",
            outcome.total,
            config.threshold
        );
    }

    Ok(())
}
