use anyhow::Result;
use attendance_analyzer::*;
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::cell::Cell;

const HEADERS: [&str; 4] = ["Employee Name", "Date", "In-Time", "Out-Time"];

enum Value<'a> {
    Str(&'a str),
    Num(f64),
    Date(u16, u8, u8),
    Time(f64),
    Blank,
}

use Value::*;

fn workbook_bytes(sheet_name: &str, headers: &[&str], rows: &[Vec<Value>]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let time_format = Format::new().set_num_format("hh:mm");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            let c = col as u16;
            match value {
                Str(s) => {
                    worksheet.write_string(r, c, *s)?;
                }
                Num(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Date(y, m, d) => {
                    let date = ExcelDateTime::from_ymd(*y, *m, *d)?;
                    worksheet.write_datetime_with_format(r, c, &date, &date_format)?;
                }
                Time(fraction) => {
                    worksheet.write_number_with_format(r, c, *fraction, &time_format)?;
                }
                Blank => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn attendance_bytes(rows: &[Vec<Value>]) -> Result<Vec<u8>> {
    workbook_bytes("Attendance", &HEADERS, rows)
}

fn jane_first_week() -> Vec<Vec<Value<'static>>> {
    let mut rows: Vec<Vec<Value>> = (1..=5)
        .map(|day| {
            vec![
                Str("Jane Smith"),
                Str(["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"][day - 1]),
                Str("10:00"),
                Str("18:30"),
            ]
        })
        .collect();
    rows.push(vec![Str("Jane Smith"), Str("2024-01-06"), Str("10:00"), Str("14:00")]);
    rows
}

/// Counts every call that reaches the wrapped store.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    calls: Cell<usize>,
}

impl CountingStore {
    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl AttendanceStore for CountingStore {
    fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>> {
        self.tick();
        self.inner.find_employee_by_name(name)
    }

    fn create_employee(&mut self, employee: NewEmployee) -> StoreResult<Employee> {
        self.tick();
        self.inner.create_employee(employee)
    }

    fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        self.tick();
        self.inner.list_employees()
    }

    fn upsert_daily_attendance(&mut self, fact: DailyAttendance) -> StoreResult<()> {
        self.tick();
        self.inner.upsert_daily_attendance(fact)
    }

    fn query_daily_attendance(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyAttendance>> {
        self.tick();
        self.inner.query_daily_attendance(employee_id, start, end)
    }

    fn upsert_monthly_summary(&mut self, summary: MonthlySummary) -> StoreResult<()> {
        self.tick();
        self.inner.upsert_monthly_summary(summary)
    }

    fn get_monthly_summary(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<MonthlySummary>> {
        self.tick();
        self.inner.get_monthly_summary(employee_id, month, year)
    }
}

/// Accepts everything except monthly summaries.
#[derive(Default)]
struct BrokenSummaryStore {
    inner: InMemoryStore,
}

impl AttendanceStore for BrokenSummaryStore {
    fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>> {
        self.inner.find_employee_by_name(name)
    }

    fn create_employee(&mut self, employee: NewEmployee) -> StoreResult<Employee> {
        self.inner.create_employee(employee)
    }

    fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        self.inner.list_employees()
    }

    fn upsert_daily_attendance(&mut self, fact: DailyAttendance) -> StoreResult<()> {
        self.inner.upsert_daily_attendance(fact)
    }

    fn query_daily_attendance(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyAttendance>> {
        self.inner.query_daily_attendance(employee_id, start, end)
    }

    fn upsert_monthly_summary(&mut self, _summary: MonthlySummary) -> StoreResult<()> {
        Err(StoreError::Backend("connection reset".to_string()))
    }

    fn get_monthly_summary(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<MonthlySummary>> {
        self.inner.get_monthly_summary(employee_id, month, year)
    }
}

#[test]
fn test_jane_smith_first_week_of_january() -> Result<()> {
    let bytes = attendance_bytes(&jane_first_week())?;
    let mut processor = AttendanceProcessor::new(InMemoryStore::new());

    let report = processor.ingest(&bytes)?;
    assert!(report.success);
    assert_eq!(report.employees.len(), 1);
    assert_eq!(report.employees[0].employee_name, "Jane Smith");
    assert_eq!(report.employees[0].processed_records, 6);
    assert!(report.rejected_rows.is_empty());

    let jane = processor
        .store()
        .find_employee_by_name("Jane Smith")?
        .expect("employee should be created");
    let summary = processor.summary_for_month(&jane.id, 1, 2024)?;
    let expected = monthly_expected_hours(1, 2024)?;

    assert!((summary.actual_hours - 46.5).abs() < 1e-9);
    assert_eq!(summary.leaves_used, 0);
    assert_eq!(summary.expected_hours, expected);
    assert_eq!(summary.productivity_percentage, productivity(46.5, expected));

    let days = processor.attendance_for_month(&jane.id, 1, 2024)?;
    assert_eq!(days.len(), 6);
    assert!(days.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!(days[5].day_type, DayType::Saturday);
    assert_eq!(days[5].worked_hours, 4.0);

    Ok(())
}

#[test]
fn test_reingesting_same_file_is_idempotent() -> Result<()> {
    let mut rows = jane_first_week();
    rows.push(vec![Str("John Doe"), Str("2024-01-02"), Blank, Blank]);
    rows.push(vec![Str("John Doe"), Str("2024-01-07"), Blank, Blank]);
    let bytes = attendance_bytes(&rows)?;

    let mut processor = AttendanceProcessor::new(InMemoryStore::new());
    processor.ingest(&bytes)?;

    let facts_before: Vec<DailyAttendance> = processor.store().daily_attendance().cloned().collect();
    let summaries_before: Vec<MonthlySummary> =
        processor.store().monthly_summaries().cloned().collect();
    let employees_before = processor.store().employees().to_vec();

    processor.ingest(&bytes)?;

    let facts_after: Vec<DailyAttendance> = processor.store().daily_attendance().cloned().collect();
    let summaries_after: Vec<MonthlySummary> =
        processor.store().monthly_summaries().cloned().collect();

    assert_eq!(facts_before, facts_after);
    assert_eq!(summaries_before, summaries_after);
    assert_eq!(employees_before, processor.store().employees());
    assert_eq!(facts_after.len(), 8);
    assert_eq!(summaries_after.len(), 2);

    let john = processor.store().find_employee_by_name("John Doe")?.unwrap();
    let john_summary = processor.summary_for_month(&john.id, 1, 2024)?;
    // Tuesday counts as leave, Sunday does not
    assert_eq!(john_summary.leaves_used, 1);
    assert_eq!(john_summary.actual_hours, 0.0);

    Ok(())
}

#[test]
fn test_out_of_order_uploads_match_single_upload() -> Result<()> {
    let rows = jane_first_week();
    let (early, late) = rows.split_at(3);

    let mut split = AttendanceProcessor::new(InMemoryStore::new());
    split.ingest(&attendance_bytes(late)?)?;
    split.ingest(&attendance_bytes(early)?)?;

    let mut whole = AttendanceProcessor::new(InMemoryStore::new());
    whole.ingest(&attendance_bytes(&rows)?)?;

    let split_jane = split.store().find_employee_by_name("Jane Smith")?.unwrap();
    let whole_jane = whole.store().find_employee_by_name("Jane Smith")?.unwrap();

    let a = split.summary_for_month(&split_jane.id, 1, 2024)?;
    let b = whole.summary_for_month(&whole_jane.id, 1, 2024)?;
    assert_eq!(a.actual_hours, b.actual_hours);
    assert_eq!(a.leaves_used, b.leaves_used);
    assert_eq!(a.productivity_percentage, b.productivity_percentage);

    Ok(())
}

#[test]
fn test_missing_date_column_touches_nothing() -> Result<()> {
    let bytes = workbook_bytes(
        "Attendance",
        &["Employee Name", "In-Time", "Out-Time"],
        &[vec![Str("Jane Smith"), Str("10:00"), Str("18:30")]],
    )?;

    let mut store = CountingStore::default();
    let err = ingest_workbook(&mut store, &bytes).unwrap_err();

    assert!(matches!(err, AttendanceError::MissingColumns(_)));
    assert!(err.to_string().contains("Date"));
    assert!(err.is_input_error());
    assert_eq!(store.calls.get(), 0);

    Ok(())
}

#[test]
fn test_bad_row_aborts_before_any_write() -> Result<()> {
    let mut rows = jane_first_week();
    rows.push(vec![Str("John Doe"), Str("not a date"), Str("10:00"), Str("18:30")]);
    let bytes = attendance_bytes(&rows)?;

    let mut store = CountingStore::default();
    let err = ingest_workbook(&mut store, &bytes).unwrap_err();

    match &err {
        AttendanceError::InvalidDate { row, value } => {
            assert_eq!(*row, 8);
            assert_eq!(value, "not a date");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(store.calls.get(), 0);

    Ok(())
}

#[test]
fn test_excel_serials_and_typed_cells() -> Result<()> {
    let bytes = attendance_bytes(&[
        vec![Str("Jane Smith"), Num(45292.0), Str("9:5"), Str("18:30")],
        vec![Str("Jane Smith"), Date(2024, 1, 2), Time(0.4375), Time(0.8125)],
        vec![Str("Jane Smith"), Str("2024-01-03"), Str("9:30"), Str("-")],
    ])?;

    let mut processor = AttendanceProcessor::new(InMemoryStore::new());
    processor.ingest(&bytes)?;

    let jane = processor.store().find_employee_by_name("Jane Smith")?.unwrap();
    let days = processor.attendance_for_month(&jane.id, 1, 2024)?;
    assert_eq!(days.len(), 3);

    assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(days[0].in_time, None);
    assert!(days[0].is_leave);
    assert_eq!(days[0].worked_hours, 0.0);

    assert_eq!(days[1].date.day(), 2);
    assert_eq!(days[1].in_time.as_deref(), Some("10:30"));
    assert_eq!(days[1].out_time.as_deref(), Some("19:30"));
    assert_eq!(days[1].worked_hours, 9.0);

    assert_eq!(days[2].in_time.as_deref(), Some("09:30"));
    assert_eq!(days[2].out_time, None);
    assert!(days[2].is_leave);

    let summary = processor.summary_for_month(&jane.id, 1, 2024)?;
    assert_eq!(summary.leaves_used, 2);

    Ok(())
}

#[test]
fn test_store_failure_is_reported_with_cause() -> Result<()> {
    let bytes = attendance_bytes(&jane_first_week())?;
    let mut store = BrokenSummaryStore::default();

    let err = ingest_workbook(&mut store, &bytes).unwrap_err();
    assert!(!err.is_input_error());
    match &err {
        AttendanceError::Storage { operation, source } => {
            assert_eq!(*operation, "upsert monthly summary");
            assert_eq!(source, &StoreError::Backend("connection reset".to_string()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(std::error::Error::source(&err).is_some());

    // Daily facts written before the failure stay behind
    assert_eq!(store.inner.daily_attendance().count(), 6);
    assert_eq!(store.inner.monthly_summaries().count(), 0);

    Ok(())
}

#[test]
fn test_skip_invalid_policy_with_named_sheet() -> Result<()> {
    let bytes = workbook_bytes(
        "March",
        &["employee name", "DATE", "in time", "OUT-TIME"],
        &[
            vec![Str("Jane Smith"), Str("2024-03-04"), Str("10:00"), Str("18:30")],
            vec![Blank, Str("2024-03-05"), Str("10:00"), Str("18:30")],
            vec![Str("Jane Smith"), Str("2024-03-05"), Str("10:00"), Str("18:30")],
        ],
    )?;

    let config = IngestionConfig::from_json_str(
        r#"{"sheet_name": "March", "row_error_policy": "skip_invalid"}"#,
    )?;
    let mut processor = AttendanceProcessor::with_config(InMemoryStore::new(), config);

    let report = processor.ingest(&bytes)?;
    assert_eq!(report.processed_records(), 2);
    assert_eq!(report.rejected_rows.len(), 1);
    assert_eq!(report.rejected_rows[0].row, 3);

    let jane = processor.store().find_employee_by_name("Jane Smith")?.unwrap();
    assert_eq!(processor.summary_for_month(&jane.id, 3, 2024)?.actual_hours, 17.0);

    Ok(())
}

#[test]
fn test_unknown_sheet_and_missing_file() -> Result<()> {
    let bytes = attendance_bytes(&jane_first_week())?;
    let config = IngestionConfig {
        sheet_name: Some("Payroll".to_string()),
        ..Default::default()
    };

    let mut processor = AttendanceProcessor::with_config(InMemoryStore::new(), config);
    assert!(matches!(
        processor.ingest(&bytes),
        Err(AttendanceError::SheetNotFound(name)) if name == "Payroll"
    ));

    let err = processor.ingest(&[]).unwrap_err();
    assert!(err.is_missing_file());
    assert!(processor.store().employees().is_empty());

    Ok(())
}

#[test]
fn test_header_only_sheet_is_empty_input() -> Result<()> {
    let bytes = attendance_bytes(&[])?;
    let err = ingest_workbook(InMemoryStore::new(), &bytes).unwrap_err();
    assert!(matches!(err, AttendanceError::EmptyInput));
    Ok(())
}
