//! Hour arithmetic for a fixed schedule: 8.5h Monday to Friday, 4h Saturday, nothing on Sunday.

use crate::error::Result;
use crate::schema::DayType;
use crate::utils::month_bounds;
use chrono::{Datelike, NaiveDate, Weekday};

/// Parses `H:MM`/`HH:MM` into minutes since midnight. Values are not range checked.
fn clock_minutes(time: &str) -> Option<i64> {
    let (hours, minutes) = time.trim().split_once(':')?;
    let hours: i64 = hours.trim().parse().ok()?;
    let minutes: i64 = minutes.trim().parse().ok()?;
    hours.checked_mul(60)?.checked_add(minutes)
}

/// Hours between two clock times. Returns 0.0 when either side is missing or unparseable.
///
/// There is no cross-midnight handling: an out time earlier than the in time
/// yields a negative duration.
pub fn elapsed_hours(in_time: Option<&str>, out_time: Option<&str>) -> f64 {
    match (in_time.and_then(clock_minutes), out_time.and_then(clock_minutes)) {
        (Some(start), Some(end)) => (end - start) as f64 / 60.0,
        _ => 0.0,
    }
}

pub fn day_type_for(date: NaiveDate) -> DayType {
    match date.weekday() {
        Weekday::Sun => DayType::Sunday,
        Weekday::Sat => DayType::Saturday,
        _ => DayType::Weekday,
    }
}

pub fn expected_hours_for(date: NaiveDate) -> f64 {
    day_type_for(date).expected_hours()
}

/// A working day with either clock time missing. Sundays are never leave.
pub fn is_leave_day(in_time: Option<&str>, out_time: Option<&str>, date: NaiveDate) -> bool {
    if expected_hours_for(date) == 0.0 {
        return false;
    }
    in_time.is_none() || out_time.is_none()
}

pub fn monthly_expected_hours(month: u32, year: i32) -> Result<f64> {
    let (start, end) = month_bounds(year, month)?;
    Ok(start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(expected_hours_for)
        .sum())
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Actual over expected as a percentage with two decimals. Zero when nothing was expected.
pub fn productivity(actual_hours: f64, expected_hours: f64) -> f64 {
    if expected_hours == 0.0 {
        return 0.0;
    }
    round_to_cents(actual_hours / expected_hours * 100.0)
}
