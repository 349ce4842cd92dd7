use attendance_analyzer::{days_in_month, AttendanceProcessor, AttendanceStore, InMemoryStore};
use chrono::{Datelike, Local, NaiveDate, Weekday};
use rand::Rng;
use rust_xlsxwriter::Workbook;
use std::collections::BTreeSet;

const EMPLOYEES: [(&str, f64); 4] = [
    ("Jane Smith", 0.95),
    ("John Doe", 0.82),
    ("Robert Johnson", 0.88),
    ("Emily Davis", 0.92),
];

struct SampleRow {
    name: &'static str,
    date: NaiveDate,
    in_time: String,
    out_time: String,
}

fn clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// One month of rows per employee: Sundays skipped, 1-3 random leave days in the
/// first 20 days, Saturdays around 10:00-14:00, weekdays scaled by productivity.
fn generate_rows(year: i32, month: u32) -> Result<Vec<SampleRow>, Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let mut rows = Vec::new();

    for (name, productivity) in EMPLOYEES {
        let leave_count = rng.gen_range(1..=3);
        let mut leave_days = BTreeSet::new();
        while leave_days.len() < leave_count {
            leave_days.insert(rng.gen_range(1..=20));
        }

        for day in 1..=days_in_month(year, month)? {
            let date = NaiveDate::from_ymd_opt(year, month, day).ok_or("invalid sample date")?;

            let (in_time, out_time) = match date.weekday() {
                Weekday::Sun => continue,
                _ if leave_days.contains(&day) => (String::new(), String::new()),
                Weekday::Sat => (
                    clock(10 * 60 + rng.gen_range(0..15)),
                    clock(14 * 60 + rng.gen_range(0..15)),
                ),
                _ => {
                    let start = rng.gen_range(9..=10) * 60 + rng.gen_range(0..30);
                    let worked = (8.5 * 60.0 * productivity) as u32 + rng.gen_range(0..60);
                    (clock(start), clock(start + worked))
                }
            };

            rows.push(SampleRow {
                name,
                date,
                in_time,
                out_time,
            });
        }
    }

    Ok(rows)
}

fn write_workbook(rows: &[SampleRow]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Attendance")?;

    for (col, header) in ["Employee Name", "Date", "In-Time", "Out-Time"].iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        worksheet.write_string(r, 0, row.name)?;
        worksheet.write_string(r, 1, row.date.format("%Y-%m-%d").to_string())?;
        worksheet.write_string(r, 2, &row.in_time)?;
        worksheet.write_string(r, 3, &row.out_time)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let today = Local::now().date_naive();
    let mut args = std::env::args().skip(1);
    let year: i32 = match args.next() {
        Some(y) => y.parse()?,
        None => today.year(),
    };
    let month: u32 = match args.next() {
        Some(m) => m.parse()?,
        None => today.month(),
    };

    let rows = generate_rows(year, month)?;
    let bytes = write_workbook(&rows)?;

    let path = "sample-attendance.xlsx";
    std::fs::write(path, &bytes)?;
    println!("Sample Excel file created at: {}", path);
    println!("Generated records for {}-{:02}", year, month);
    println!("Total records: {}", rows.len());

    let mut processor = AttendanceProcessor::new(InMemoryStore::new());
    let report = processor.ingest(&bytes)?;

    println!("\n{:<16} {:>8} {:>10} {:>10} {:>7} {:>13}", "Employee", "Rows", "Actual", "Expected", "Leaves", "Productivity");
    for result in &report.employees {
        let employee = processor
            .store()
            .find_employee_by_name(&result.employee_name)?
            .ok_or("employee missing after ingest")?;
        let summary = processor.summary_for_month(&employee.id, month, year)?;

        println!(
            "{:<16} {:>8} {:>10.2} {:>10.2} {:>7} {:>12.2}%",
            result.employee_name,
            result.processed_records,
            summary.actual_hours,
            summary.expected_hours,
            summary.leaves_used,
            summary.productivity_percentage
        );
    }

    Ok(())
}
