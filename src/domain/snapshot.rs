//! Daily deposit snapshot and the reference-timezone date bucketing rule.

use crate::domain::Decimal;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One participant's reported deposit value for one calendar date.
///
/// At most one row exists per (participant, date); a resubmission for the
/// same date overwrites the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositSnapshot {
    pub participant_id: i64,
    /// Calendar date in the single reference timezone.
    pub snapshot_date: NaiveDate,
    pub value: Decimal,
    /// Write time in milliseconds since Unix epoch.
    pub updated_at: i64,
}

/// Resolve the calendar date of `at` in the reference timezone.
///
/// All date bucketing goes through one fixed offset so snapshot rows line up
/// on the same date across participants regardless of client timezones.
pub fn reference_date(at: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    at.with_timezone(&offset).date_naive()
}

/// Today's calendar date in the reference timezone.
pub fn reference_today(utc_offset_hours: i32) -> NaiveDate {
    reference_date(Utc::now(), utc_offset_hours)
}
