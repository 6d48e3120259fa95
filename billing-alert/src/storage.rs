use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use crate::errors::BillingError;

/// Read-only view of the billing bucket. The pipeline only ever lists
/// keys under a prefix and downloads single objects, so the seam stays
/// that narrow.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// List all object keys starting with `prefix`
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BillingError>;

    /// Download the object at `key` to `dest`
    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), BillingError>;
}

/// S3-backed implementation of [`BillingStore`]
pub struct S3BillingStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BillingStore {
    /// Create a store using the default credential chain and region
    pub async fn new(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::with_client(aws_sdk_s3::Client::new(&config), bucket)
    }

    /// Create a store from a preconfigured client
    pub fn with_client(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BillingStore for S3BillingStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, BillingError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| BillingError::Storage(e.to_string()))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        Ok(keys)
    }

    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), BillingError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BillingError::Storage(e.to_string()))?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| BillingError::Storage(e.to_string()))?
            .into_bytes();

        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

/// Suffix identifying the raw detail archive for a given UTC month
pub fn monthly_archive_suffix(now: DateTime<Utc>) -> String {
    format!("items-{}-{:02}.csv.zip", now.year(), now.month())
}

/// Select the current month's archive key from a bucket listing.
///
/// Matching is a plain suffix test. An empty match set and an ambiguous
/// one are both fatal; the listing carries no tiebreaker worth trusting.
pub fn monthly_archive_key(keys: &[String], now: DateTime<Utc>) -> Result<String, BillingError> {
    let suffix = monthly_archive_suffix(now);
    let mut matches = keys.iter().filter(|key| key.ends_with(&suffix));

    match (matches.next(), matches.next()) {
        (Some(key), None) => Ok(key.clone()),
        (None, _) => Err(BillingError::NoMonthlyArchive(suffix)),
        (Some(_), Some(_)) => Err(BillingError::AmbiguousArchive(suffix)),
    }
}

/// Return the local path of the archive, downloading it unless a file
/// is already present at the destination. Presence alone counts as
/// fresh; concurrent invocations sharing the scratch directory race
/// here, an accepted risk at scheduled-invocation frequency.
pub async fn ensure_local(
    store: &dyn BillingStore,
    key: &str,
    scratch_dir: &Path,
) -> Result<PathBuf, BillingError> {
    let dest = scratch_dir.join(key);

    if dest.exists() {
        log::debug!("Archive already present at [{}]", dest.display());
        return Ok(dest);
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::debug!("Downloading [{}] to [{}]", key, dest.display());
    store.fetch(key, &dest).await?;

    Ok(dest)
}
