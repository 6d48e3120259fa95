//! End-to-end pipeline tests against an in-memory store and a mock
//! webhook: archive resolution, download/extraction caching, window
//! filtering, and the notify decision.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use billing_alert::{run_check, BillingConfig, BillingError, BillingStore, Notifier};

const ARCHIVE_KEY: &str = "111111111111/items-2024-06.csv.zip";

/// Bucket fixture: a fixed listing plus one downloadable archive, with
/// a fetch counter to observe cache behavior.
struct FixtureStore {
    keys: Vec<String>,
    archive: Vec<u8>,
    fetches: AtomicUsize,
}

impl FixtureStore {
    fn new(keys: Vec<String>, archive: Vec<u8>) -> Self {
        Self {
            keys,
            archive,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BillingStore for FixtureStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BillingError> {
        Ok(self
            .keys
            .iter()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn fetch(&self, _key: &str, dest: &Path) -> Result<(), BillingError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest, &self.archive)?;
        Ok(())
    }
}

fn zipped_export(rows: &str) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buffer);
        writer
            .start_file("items-2024-06.csv", SimpleFileOptions::default())
            .unwrap();
        let header =
            "RecordType,LinkedAccountId,UsageStartDate,UsageEndDate,BlendedCost,ProductName\n";
        writer.write_all(header.as_bytes()).unwrap();
        writer.write_all(rows.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

fn export_rows() -> &'static str {
    "LineItem,222222222222,2024-06-14 10:00:00,2024-06-14 11:00:00,12.50,Compute\n\
     LineItem,333333333333,2024-06-14 10:00:00,2024-06-14 11:00:00,999.0,Compute\n"
}

fn config(threshold: f64, webhook_url: String) -> BillingConfig {
    BillingConfig {
        bucket: "billing-exports".to_string(),
        payer_account_id: "111111111111".to_string(),
        linked_account_id: "222222222222".to_string(),
        linked_account_alias: None,
        duration_in_days: 1,
        threshold,
        slack_webhook_url: webhook_url,
        channel: "#billing".to_string(),
        debug: false,
    }
}

fn june_15() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
}

#[tokio::test]
async fn breach_notifies_with_formatted_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .and(body_string_contains("12.50"))
        .and(body_string_contains("#billing"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = FixtureStore::new(vec![ARCHIVE_KEY.to_string()], zipped_export(export_rows()));
    let config = config(10.0, format!("{}/webhook", server.uri()));
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch = tempfile::tempdir().unwrap();

    let outcome = run_check(&store, &notifier, &config, scratch.path(), june_15())
        .await
        .unwrap();

    assert_eq!(outcome.total, 12.50);
    assert!(outcome.notified);
}

#[tokio::test]
async fn total_below_threshold_makes_no_http_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = FixtureStore::new(vec![ARCHIVE_KEY.to_string()], zipped_export(export_rows()));
    let config = config(20.0, format!("{}/webhook", server.uri()));
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch = tempfile::tempdir().unwrap();

    let outcome = run_check(&store, &notifier, &config, scratch.path(), june_15())
        .await
        .unwrap();

    assert_eq!(outcome.total, 12.50);
    assert!(!outcome.notified);
}

#[tokio::test]
async fn row_past_window_end_is_excluded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let rows = "LineItem,222222222222,2024-06-14 10:00:00,2024-06-15 00:00:01,12.50,Compute\n";
    let store = FixtureStore::new(vec![ARCHIVE_KEY.to_string()], zipped_export(rows));
    let config = config(10.0, format!("{}/webhook", server.uri()));
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch = tempfile::tempdir().unwrap();

    let outcome = run_check(&store, &notifier, &config, scratch.path(), june_15())
        .await
        .unwrap();

    assert_eq!(outcome.total, 0.0);
    assert!(!outcome.notified);
}

#[tokio::test]
async fn warm_rerun_skips_download_and_matches_cold_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = FixtureStore::new(vec![ARCHIVE_KEY.to_string()], zipped_export(export_rows()));
    let config = config(10.0, format!("{}/webhook", server.uri()));
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch = tempfile::tempdir().unwrap();

    let cold = run_check(&store, &notifier, &config, scratch.path(), june_15())
        .await
        .unwrap();
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

    let warm = run_check(&store, &notifier, &config, scratch.path(), june_15())
        .await
        .unwrap();

    // Same aggregate, no second download
    assert_eq!(warm.total, cold.total);
    assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_monthly_archive_is_fatal() {
    let store = FixtureStore::new(
        vec!["111111111111/items-2024-05.csv.zip".to_string()],
        zipped_export(export_rows()),
    );
    let config = config(10.0, "http://127.0.0.1:1/webhook".to_string());
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch = tempfile::tempdir().unwrap();

    let result = run_check(&store, &notifier, &config, scratch.path(), june_15()).await;
    assert!(matches!(result, Err(BillingError::NoMonthlyArchive(_))));
}

#[tokio::test]
async fn failed_webhook_delivery_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = FixtureStore::new(vec![ARCHIVE_KEY.to_string()], zipped_export(export_rows()));
    let config = config(10.0, format!("{}/webhook", server.uri()));
    let notifier = Notifier::new(&config.slack_webhook_url, &config.channel);
    let scratch = tempfile::tempdir().unwrap();

    let result = run_check(&store, &notifier, &config, scratch.path(), june_15()).await;
    assert!(matches!(result, Err(BillingError::Notification(_))));
}
