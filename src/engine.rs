use crate::error::Result;
use crate::hours::{
    day_type_for, elapsed_hours, is_leave_day, monthly_expected_hours, productivity,
};
use crate::schema::{AttendanceRecord, DailyAttendance, MonthlySummary};
use crate::utils::month_bounds;
use log::warn;

/// Derives the stored fact for one normalized row. The date loses any time-of-day.
pub fn daily_fact(employee_id: &str, record: &AttendanceRecord) -> DailyAttendance {
    let date = record.date.date();
    let in_time = record.in_time.as_deref();
    let out_time = record.out_time.as_deref();

    let worked_hours = elapsed_hours(in_time, out_time);
    if worked_hours < 0.0 {
        warn!(
            "{} on {}: out time {:?} precedes in time {:?}, storing {:.2}h",
            record.employee_name, date, record.out_time, record.in_time, worked_hours
        );
    }

    let day_type = day_type_for(date);

    DailyAttendance {
        employee_id: employee_id.to_string(),
        date,
        in_time: record.in_time.clone(),
        out_time: record.out_time.clone(),
        worked_hours,
        is_leave: is_leave_day(in_time, out_time, date),
        day_type,
        expected_hours: day_type.expected_hours(),
    }
}

/// Rolls one employee's facts up into the summary for `month`/`year`.
///
/// Facts dated outside the month are ignored. Expected hours come from the calendar,
/// so days without a fact still count towards the denominator.
pub fn aggregate_month(
    employee_id: &str,
    month: u32,
    year: i32,
    facts: &[DailyAttendance],
) -> Result<MonthlySummary> {
    let (start, end) = month_bounds(year, month)?;
    let in_month = || facts.iter().filter(move |f| f.date >= start && f.date <= end);

    let actual_hours: f64 = in_month().map(|f| f.worked_hours).sum();
    let leaves_used = in_month().filter(|f| f.is_leave).count() as u32;
    let expected_hours = monthly_expected_hours(month, year)?;

    Ok(MonthlySummary {
        employee_id: employee_id.to_string(),
        month,
        year,
        expected_hours,
        actual_hours,
        leaves_used,
        productivity_percentage: productivity(actual_hours, expected_hours),
    })
}
