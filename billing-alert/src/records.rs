use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::errors::BillingError;

/// Record type tag marking a detail line item, as opposed to
/// summary/tax/fee rows
pub const LINE_ITEM_RECORD_TYPE: &str = "LineItem";

/// Datetime format used by the usage columns of the export
pub const USAGE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the raw billing export as read from the CSV stream.
///
/// Columns are addressed by header name; every other column of the
/// export is ignored. Values stay untyped here because summary rows
/// carry empty usage dates and must be filterable without parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBillingRow {
    /// Row kind tag; only `LineItem` rows are detail items
    #[serde(rename = "RecordType")]
    pub record_type: String,

    /// Sub-account the charge was accrued by
    #[serde(rename = "LinkedAccountId")]
    pub linked_account_id: String,

    /// Start of the usage period covered by the row
    #[serde(rename = "UsageStartDate")]
    pub usage_start: String,

    /// End of the usage period covered by the row
    #[serde(rename = "UsageEndDate")]
    pub usage_end: String,

    /// Cost with reserved-capacity discounts blended across the
    /// consolidated billing family
    #[serde(rename = "BlendedCost")]
    pub blended_cost: String,
}

/// A fully-typed detail row, materialized transiently while streaming
#[derive(Debug, Clone, PartialEq)]
pub struct BillingRecord {
    pub record_type: String,
    pub linked_account_id: String,
    pub usage_start: NaiveDateTime,
    pub usage_end: NaiveDateTime,
    pub blended_cost: f64,
}

impl RawBillingRow {
    /// Whether this row is a detail item for the given linked account.
    /// Cheap string test, safe to apply before any value parsing.
    pub fn is_candidate(&self, linked_account_id: &str) -> bool {
        self.record_type == LINE_ITEM_RECORD_TYPE && self.linked_account_id == linked_account_id
    }

    /// Parse the row into its typed form. Malformed timestamps and
    /// non-numeric costs are fatal for the invocation.
    pub fn materialize(&self) -> Result<BillingRecord, BillingError> {
        Ok(BillingRecord {
            record_type: self.record_type.clone(),
            linked_account_id: self.linked_account_id.clone(),
            usage_start: parse_usage_timestamp(&self.usage_start)?,
            usage_end: parse_usage_timestamp(&self.usage_end)?,
            blended_cost: self
                .blended_cost
                .trim()
                .parse::<f64>()
                .map_err(|_| BillingError::InvalidCost(self.blended_cost.clone()))?,
        })
    }
}

/// Parse a usage column timestamp with the export's fixed format
pub fn parse_usage_timestamp(value: &str) -> Result<NaiveDateTime, BillingError> {
    NaiveDateTime::parse_from_str(value, USAGE_DATETIME_FORMAT)
        .map_err(|_| BillingError::InvalidTimestamp(value.to_string()))
}
