use crate::error::{AttendanceError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rand::Rng;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Serial 2958465 is 9999-12-31, the last day Excel can represent.
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(AttendanceError::InvalidMonth(month));
    }
    Ok(())
}

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    validate_month(month)?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(AttendanceError::InvalidMonth(month))
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    validate_month(month)?;
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    first_day_of_month(next_year, next_month)?
        .pred_opt()
        .ok_or(AttendanceError::InvalidMonth(month))
}

/// Inclusive (first, last) day bounds of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    Ok((
        first_day_of_month(year, month)?,
        last_day_of_month(year, month)?,
    ))
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    Ok(last_day_of_month(year, month)?.day())
}

/// Converts an Excel 1900-system serial (days since 1899-12-30, fraction = time of day).
///
/// The 1899-12-30 epoch absorbs Excel's phantom 1900-02-29, so serials from March 1900
/// onwards land on the right day.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// Lowercases the name and turns each whitespace run into a single hyphen.
pub fn slugify_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds `<slug>-<0..999>`. Two employees sharing a slug collide with probability 1/1000.
pub fn generate_external_code<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    format!("{}-{}", slugify_name(name), rng.gen_range(0..1000))
}
