//! Rental pricing
//!
//! Pure functions for rental cost, checkout totals and late-return penalties.
//! Dates are accepted as RFC 3339 timestamps, naive date-times (read as UTC)
//! or plain `YYYY-MM-DD` dates (UTC midnight).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::models::TimeUnit;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Late returns are charged at twice the daily rate
pub const PENALTY_MULTIPLIER: f64 = 2.0;

/// Parse a date or timestamp string into UTC
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid date: '{}'", value)))
}

/// Whole days between two instants, any partial day counted as a full one.
/// Zero or negative spans yield zero.
fn ceil_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let millis = (to - from).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }
}

/// Cost of renting at `price_per_day` from `start_date` to `end_date`.
///
/// Partial days round up and at least one day is always charged, so a
/// same-day or reversed range costs exactly one day.
pub fn calculate_rental_cost(price_per_day: f64, start_date: &str, end_date: &str) -> Result<f64> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;

    let days = ceil_days(start, end).max(1);
    Ok(price_per_day * days as f64)
}

/// Penalty for returning `late_days` days late: double the daily rate per day.
/// Nothing is charged for on-time or early returns.
pub fn calculate_penalty(price_per_day: f64, late_days: i64) -> f64 {
    if late_days <= 0 {
        return 0.0;
    }
    late_days as f64 * price_per_day * PENALTY_MULTIPLIER
}

/// Total charged at checkout for `quantity` units over `duration` billing units
pub fn calculate_checkout_total(unit_price: f64, duration: u32, quantity: u32) -> f64 {
    unit_price * f64::from(duration) * f64::from(quantity)
}

/// When a rental starting at `start` is due back
pub fn rental_end_date(start: DateTime<Utc>, duration: u32, unit: TimeUnit) -> DateTime<Utc> {
    let span = match unit {
        TimeUnit::Day => Duration::days(i64::from(duration)),
        TimeUnit::Hour => Duration::hours(i64::from(duration)),
    };
    start + span
}

/// Days late when returned at `returned_at`, partial days rounded up
pub fn late_days(end: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    ceil_days(end, returned_at)
}
