use std::path::Path;

use chrono::{DateTime, Utc};

use crate::aggregate::{sum_blended_cost, UsageWindow};
use crate::archive::{extract_archive, read_records};
use crate::config::BillingConfig;
use crate::errors::BillingError;
use crate::notify::{breach_message, should_notify, Notifier};
use crate::storage::{ensure_local, monthly_archive_key, BillingStore};

/// Result of one billing check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckOutcome {
    /// Aggregate blended cost for the account over the window
    pub total: f64,
    /// Whether the threshold was breached and the webhook was called
    pub notified: bool,
}

/// Run one billing check: locate the current month's archive, fetch and
/// unpack it, sum the account's blended cost over the usage window, and
/// notify when the threshold is exceeded. Stages run sequentially; any
/// failure aborts the invocation and propagates to the caller.
pub async fn run_check(
    store: &dyn BillingStore,
    notifier: &Notifier,
    config: &BillingConfig,
    scratch_dir: &Path,
    now: DateTime<Utc>,
) -> Result<CheckOutcome, BillingError> {
    log::debug!(
        "Filtering by [{}] and [{}] in [{}] for [{}] day/s",
        config.payer_account_id,
        config.linked_account_id,
        config.bucket,
        config.duration_in_days
    );

    let keys = store.list_keys(&config.payer_account_id).await?;
    let key = monthly_archive_key(&keys, now)?;

    let archive_path = ensure_local(store, &key, scratch_dir).await?;
    let csv_path = extract_archive(&archive_path)?;

    let window = UsageWindow::ending_at(now, config.duration_in_days);
    let total = sum_blended_cost(read_records(&csv_path)?, &window, &config.linked_account_id)?;

    log::debug!("Estimated charges are [{}]", total);

    let notified = if should_notify(total, config.threshold) {
        notifier.send(&breach_message(config, total)).await?;
        true
    } else {
        false
    };

    Ok(CheckOutcome { total, notified })
}
