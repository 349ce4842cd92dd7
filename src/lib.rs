//! # Attendance Analyzer
//!
//! A library for turning employee time-clock spreadsheets into per-day attendance facts
//! and per-month productivity summaries.
//!
//! ## Core Concepts
//!
//! - **Daily Attendance**: One employee's in/out times for a calendar day, with worked hours,
//!   expected hours and a leave flag derived from the day of the week
//! - **Monthly Summary**: Actual vs. calendar-expected hours for one employee and month,
//!   always rebuilt from every stored day in that month
//! - **Schedule**: 8.5 hours Monday to Friday, 4 hours on Saturday, nothing on Sunday
//! - **Idempotent Uploads**: Re-uploading a sheet replaces the same facts and summaries
//!   instead of adding to them
//!
//! ## Example
//!
//! ```rust,ignore
//! use attendance_analyzer::*;
//!
//! let bytes = std::fs::read("attendance.xlsx")?;
//! let mut processor = AttendanceProcessor::new(InMemoryStore::new());
//!
//! let report = processor.ingest(&bytes)?;
//! for employee in &report.employees {
//!     println!("{}: {} rows", employee.employee_name, employee.processed_records);
//! }
//!
//! let jane = processor.store().find_employee_by_name("Jane Smith")?.unwrap();
//! let summary = processor.summary_for_month(&jane.id, 1, 2024)?;
//! println!("Productivity: {}%", summary.productivity_percentage);
//! ```

pub mod engine;
pub mod error;
pub mod hours;
pub mod ingestion;
pub mod schema;
pub mod store;
pub mod utils;

pub use engine::{aggregate_month, daily_fact};
pub use error::{AttendanceError, Result, StoreError, StoreResult};
pub use hours::*;
pub use ingestion::{
    normalize_sheet, parse_workbook, read_workbook, CellValue, NormalizedSheet, Sheet, SheetRow,
};
pub use schema::*;
pub use store::{AttendanceStore, InMemoryStore};
pub use utils::*;

use chrono::Datelike;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};

pub struct AttendanceProcessor<S> {
    store: S,
    config: IngestionConfig,
}

impl<S: AttendanceStore> AttendanceProcessor<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, IngestionConfig::default())
    }

    pub fn with_config(store: S, config: IngestionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Parses an uploaded workbook and folds every row into the store.
    ///
    /// Spreadsheet problems are reported before anything is written. A store failure
    /// part-way through leaves the rows already written in place.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<IngestionReport> {
        let normalized = parse_workbook(bytes, &self.config)?;

        info!(
            "Ingesting {} attendance rows ({} rejected)",
            normalized.records.len(),
            normalized.rejected.len()
        );

        let employees = self.ingest_records(&normalized.records)?;

        Ok(IngestionReport {
            success: true,
            employees,
            rejected_rows: normalized.rejected,
        })
    }

    /// Stores already-normalized rows, employee by employee in first-seen order.
    pub fn ingest_records(
        &mut self,
        records: &[AttendanceRecord],
    ) -> Result<Vec<EmployeeIngestResult>> {
        let mut results = Vec::new();

        for (employee_name, rows) in group_by_employee(records) {
            let employee = self.resolve_employee(employee_name)?;

            for record in &rows {
                let fact = daily_fact(&employee.id, record);
                self.store
                    .upsert_daily_attendance(fact)
                    .map_err(AttendanceError::storage("upsert daily attendance"))?;
            }

            let touched: BTreeSet<(i32, u32)> = rows
                .iter()
                .map(|r| (r.date.year(), r.date.month()))
                .collect();

            for (year, month) in touched {
                self.refresh_monthly_summary(&employee.id, month, year)?;
            }

            debug!("Processed {} rows for {}", rows.len(), employee_name);
            results.push(EmployeeIngestResult {
                employee_name: employee_name.to_string(),
                processed_records: rows.len(),
            });
        }

        info!("Ingestion finished for {} employees", results.len());
        Ok(results)
    }

    /// Rebuilds a month's summary from every stored fact in that month and saves it.
    pub fn refresh_monthly_summary(
        &mut self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<MonthlySummary> {
        let (start, end) = month_bounds(year, month)?;
        let facts = self
            .store
            .query_daily_attendance(employee_id, start, end)
            .map_err(AttendanceError::storage("query daily attendance"))?;

        let summary = aggregate_month(employee_id, month, year, &facts)?;
        debug!(
            "Summary {}-{:02} for {}: {:.2}h of {:.2}h, {} leaves",
            year, month, employee_id, summary.actual_hours, summary.expected_hours, summary.leaves_used
        );

        self.store
            .upsert_monthly_summary(summary.clone())
            .map_err(AttendanceError::storage("upsert monthly summary"))?;

        Ok(summary)
    }

    /// Stored days for the month, ascending by date.
    pub fn attendance_for_month(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<Vec<DailyAttendance>> {
        let (start, end) = month_bounds(year, month)?;
        let mut facts = self
            .store
            .query_daily_attendance(employee_id, start, end)
            .map_err(AttendanceError::storage("query daily attendance"))?;
        facts.sort_by_key(|f| f.date);
        Ok(facts)
    }

    /// Stored summary for the month, or an all-zero summary when none exists.
    pub fn summary_for_month(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> Result<MonthlySummary> {
        validate_month(month)?;
        let summary = self
            .store
            .get_monthly_summary(employee_id, month, year)
            .map_err(AttendanceError::storage("get monthly summary"))?;
        Ok(summary.unwrap_or_else(|| MonthlySummary::empty(employee_id, month, year)))
    }

    /// Every known employee, in the order the store created them.
    pub fn employees(&self) -> Result<Vec<Employee>> {
        self.store
            .list_employees()
            .map_err(AttendanceError::storage("list employees"))
    }

    fn resolve_employee(&mut self, name: &str) -> Result<Employee> {
        let existing = self
            .store
            .find_employee_by_name(name)
            .map_err(AttendanceError::storage("find employee"))?;

        if let Some(employee) = existing {
            return Ok(employee);
        }

        let external_code = generate_external_code(name, &mut rand::thread_rng());
        info!("Creating employee {} as {}", name, external_code);

        self.store
            .create_employee(NewEmployee {
                name: name.to_string(),
                external_code,
            })
            .map_err(AttendanceError::storage("create employee"))
    }
}

/// Ingests a workbook into `store` with the default configuration.
pub fn ingest_workbook<S: AttendanceStore>(store: S, bytes: &[u8]) -> Result<IngestionReport> {
    AttendanceProcessor::new(store).ingest(bytes)
}

/// Groups rows by employee name, keeping first-seen name order and input order within a name.
fn group_by_employee(records: &[AttendanceRecord]) -> Vec<(&str, Vec<&AttendanceRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&AttendanceRecord>)> = Vec::new();

    for record in records {
        let name = record.employee_name.as_str();
        match index.get(name) {
            Some(&slot) => groups[slot].1.push(record),
            None => {
                index.insert(name, groups.len());
                groups.push((name, vec![record]));
            }
        }
    }

    groups
}
