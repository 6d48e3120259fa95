use std::path::Path;

use serde::Deserialize;

use crate::errors::BillingError;

const ENV_BUCKET: &str = "AWS_BILLING_BUCKET";
const ENV_PAYER_ACCOUNT_ID: &str = "AWS_BILLING_PAYER_ACCOUNT_ID";
const ENV_LINKED_ACCOUNT_ID: &str = "AWS_BILLING_LINKED_ACCOUNT_ID";
const ENV_LINKED_ACCOUNT_ALIAS: &str = "AWS_BILLING_LINKED_ACCOUNT_ALIAS";
const ENV_DURATION_IN_DAYS: &str = "AWS_BILLING_DURATION_IN_DAYS";
const ENV_THRESHOLD: &str = "AWS_BILLING_THRESHOLD";
const ENV_SLACK_WEBHOOK_URL: &str = "AWS_BILLING_SLACK_WEBHOOK_URL";
const ENV_SLACK_CHANNEL: &str = "AWS_BILLING_SLACK_CHANNEL";
const ENV_DEBUG: &str = "AWS_BILLING_DEBUG";

/// Operating parameters for one billing check. Loaded once per
/// invocation from either a JSON document or the `AWS_BILLING_*`
/// environment variables, immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingConfig {
    /// Bucket housing the raw billing export
    pub bucket: String,

    /// Parent account ID for consolidated billing; object keys in the
    /// bucket start with this prefix
    pub payer_account_id: String,

    /// Linked account whose charges are being watched
    pub linked_account_id: String,

    /// Optional display name used in notifications instead of the raw id
    pub linked_account_alias: Option<String>,

    /// Number of days of usage to sum, ending at the current day
    pub duration_in_days: i64,

    /// Blended-cost threshold above which a notification fires
    pub threshold: f64,

    /// Webhook endpoint notifications are posted to
    pub slack_webhook_url: String,

    /// Channel name carried in the notification body
    pub channel: String,

    /// Raise log verbosity to debug
    pub debug: bool,
}

/// Intermediate form shared by both configuration surfaces; required
/// fields are checked in one place so the missing field is named
/// regardless of the source.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    bucket: Option<String>,
    payer_account_id: Option<String>,
    linked_account_id: Option<String>,
    linked_account_alias: Option<String>,
    duration_in_days: Option<i64>,
    threshold: Option<f64>,
    slack_webhook_url: Option<String>,
    channel: Option<String>,
    debug: Option<bool>,
}

impl BillingConfig {
    /// Load configuration from a JSON document
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BillingError> {
        let raw: RawConfig = serde_json::from_slice(&std::fs::read(path)?)?;
        Self::resolve(raw)
    }

    /// Load configuration from the `AWS_BILLING_*` environment variables
    pub fn from_env() -> Result<Self, BillingError> {
        let raw = RawConfig {
            bucket: env_var(ENV_BUCKET),
            payer_account_id: env_var(ENV_PAYER_ACCOUNT_ID),
            linked_account_id: env_var(ENV_LINKED_ACCOUNT_ID),
            linked_account_alias: env_var(ENV_LINKED_ACCOUNT_ALIAS),
            duration_in_days: parse_env_var(ENV_DURATION_IN_DAYS, "duration_in_days")?,
            threshold: parse_env_var(ENV_THRESHOLD, "threshold")?,
            slack_webhook_url: env_var(ENV_SLACK_WEBHOOK_URL),
            channel: env_var(ENV_SLACK_CHANNEL),
            debug: env_var(ENV_DEBUG).map(|value| truthy(&value)),
        };
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self, BillingError> {
        Ok(Self {
            bucket: raw.bucket.ok_or(BillingError::MissingConfig("bucket"))?,
            payer_account_id: raw
                .payer_account_id
                .ok_or(BillingError::MissingConfig("payer_account_id"))?,
            linked_account_id: raw
                .linked_account_id
                .ok_or(BillingError::MissingConfig("linked_account_id"))?,
            linked_account_alias: raw.linked_account_alias,
            duration_in_days: raw.duration_in_days.unwrap_or(1),
            threshold: raw.threshold.ok_or(BillingError::MissingConfig("threshold"))?,
            slack_webhook_url: raw
                .slack_webhook_url
                .ok_or(BillingError::MissingConfig("slack_webhook_url"))?,
            channel: raw.channel.ok_or(BillingError::MissingConfig("channel"))?,
            debug: raw.debug.unwrap_or(false),
        })
    }

    /// Account name shown in notifications: the alias when one is
    /// configured, the raw id otherwise
    pub fn account_display_name(&self) -> &str {
        self.linked_account_alias
            .as_deref()
            .unwrap_or(&self.linked_account_id)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_env_var<T: std::str::FromStr>(
    name: &str,
    field: &'static str,
) -> Result<Option<T>, BillingError> {
    match env_var(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| BillingError::InvalidConfig { field, value }),
        None => Ok(None),
    }
}

fn truthy(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false" | "False")
}
