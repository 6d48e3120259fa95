use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};

use crate::errors::BillingError;
use crate::records::{BillingRecord, RawBillingRow};

/// Usage-date window a record must fall inside to be counted.
///
/// `end` is the reference time floored to midnight UTC; `start` is `end`
/// minus the configured number of days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl UsageWindow {
    /// Build the window ending at `now`'s UTC midnight
    pub fn ending_at(now: DateTime<Utc>, duration_in_days: i64) -> Self {
        let end = now.date_naive().and_time(NaiveTime::MIN);
        let start = end - Duration::days(duration_in_days);
        Self { start, end }
    }

    /// Window containment: inclusive on both edges
    pub fn contains(&self, usage_start: NaiveDateTime, usage_end: NaiveDateTime) -> bool {
        usage_start >= self.start && usage_end <= self.end
    }
}

/// Whether a record counts toward the aggregate: a detail line item,
/// accrued by the target account, with its usage period inside the
/// window.
pub fn qualifies(record: &BillingRecord, window: &UsageWindow, linked_account_id: &str) -> bool {
    record.record_type == crate::records::LINE_ITEM_RECORD_TYPE
        && record.linked_account_id == linked_account_id
        && window.contains(record.usage_start, record.usage_end)
}

/// Kahan-Babuska (Neumaier) compensated accumulator. The export holds
/// many small costs; naive sequential addition drifts and makes the
/// total depend on row order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Sum the blended cost of every qualifying row in the stream.
///
/// Non-candidate rows (summary rows, other accounts) are skipped before
/// any value parsing; candidate rows with malformed timestamps or costs
/// abort the invocation. Zero qualifying rows sum to exactly 0.0.
pub fn sum_blended_cost<I>(
    rows: I,
    window: &UsageWindow,
    linked_account_id: &str,
) -> Result<f64, BillingError>
where
    I: IntoIterator<Item = Result<RawBillingRow, BillingError>>,
{
    let mut sum = CompensatedSum::default();

    for row in rows {
        let row = row?;
        if !row.is_candidate(linked_account_id) {
            continue;
        }

        let record = row.materialize()?;
        if qualifies(&record, window, linked_account_id) {
            sum.add(record.blended_cost);
        }
    }

    Ok(sum.total())
}
