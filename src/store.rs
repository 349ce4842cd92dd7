//! Persistence seam. Attendance facts and summaries are addressed by composite keys and
//! written with upsert semantics; the in-memory store is the reference implementation.

use crate::error::{StoreError, StoreResult};
use crate::schema::{DailyAttendance, Employee, MonthlySummary, NewEmployee};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

pub trait AttendanceStore {
    /// Exact, case-sensitive name lookup.
    fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>>;

    fn create_employee(&mut self, employee: NewEmployee) -> StoreResult<Employee>;

    /// Every employee, in creation order.
    fn list_employees(&self) -> StoreResult<Vec<Employee>>;

    /// Inserts or fully replaces the fact keyed by `(employee_id, date)`.
    fn upsert_daily_attendance(&mut self, fact: DailyAttendance) -> StoreResult<()>;

    /// Facts for one employee with `start <= date <= end`, ascending by date.
    fn query_daily_attendance(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyAttendance>>;

    /// Inserts or fully replaces the summary keyed by `(employee_id, month, year)`.
    fn upsert_monthly_summary(&mut self, summary: MonthlySummary) -> StoreResult<()>;

    fn get_monthly_summary(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<MonthlySummary>>;
}

impl<S: AttendanceStore + ?Sized> AttendanceStore for &mut S {
    fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>> {
        (**self).find_employee_by_name(name)
    }

    fn create_employee(&mut self, employee: NewEmployee) -> StoreResult<Employee> {
        (**self).create_employee(employee)
    }

    fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        (**self).list_employees()
    }

    fn upsert_daily_attendance(&mut self, fact: DailyAttendance) -> StoreResult<()> {
        (**self).upsert_daily_attendance(fact)
    }

    fn query_daily_attendance(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyAttendance>> {
        (**self).query_daily_attendance(employee_id, start, end)
    }

    fn upsert_monthly_summary(&mut self, summary: MonthlySummary) -> StoreResult<()> {
        (**self).upsert_monthly_summary(summary)
    }

    fn get_monthly_summary(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<MonthlySummary>> {
        (**self).get_monthly_summary(employee_id, month, year)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    employees: Vec<Employee>,
    daily: BTreeMap<(String, NaiveDate), DailyAttendance>,
    summaries: BTreeMap<(String, i32, u32), MonthlySummary>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Employees in creation order.
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn daily_attendance(&self) -> impl Iterator<Item = &DailyAttendance> {
        self.daily.values()
    }

    pub fn monthly_summaries(&self) -> impl Iterator<Item = &MonthlySummary> {
        self.summaries.values()
    }

    fn ensure_employee(&self, employee_id: &str) -> StoreResult<()> {
        if self.employees.iter().any(|e| e.id == employee_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownEmployee(employee_id.to_string()))
        }
    }
}

impl AttendanceStore for InMemoryStore {
    fn find_employee_by_name(&self, name: &str) -> StoreResult<Option<Employee>> {
        Ok(self.employees.iter().find(|e| e.name == name).cloned())
    }

    fn create_employee(&mut self, employee: NewEmployee) -> StoreResult<Employee> {
        if self.employees.iter().any(|e| e.name == employee.name) {
            return Err(StoreError::DuplicateEmployee(employee.name));
        }

        let created = Employee {
            id: Uuid::new_v4().to_string(),
            name: employee.name,
            external_code: employee.external_code,
        };
        self.employees.push(created.clone());
        Ok(created)
    }

    fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        Ok(self.employees.clone())
    }

    fn upsert_daily_attendance(&mut self, fact: DailyAttendance) -> StoreResult<()> {
        self.ensure_employee(&fact.employee_id)?;
        self.daily
            .insert((fact.employee_id.clone(), fact.date), fact);
        Ok(())
    }

    fn query_daily_attendance(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<DailyAttendance>> {
        if end < start {
            return Ok(Vec::new());
        }

        let key = employee_id.to_string();
        Ok(self
            .daily
            .range((key.clone(), start)..=(key, end))
            .map(|(_, fact)| fact.clone())
            .collect())
    }

    fn upsert_monthly_summary(&mut self, summary: MonthlySummary) -> StoreResult<()> {
        self.ensure_employee(&summary.employee_id)?;
        self.summaries.insert(
            (summary.employee_id.clone(), summary.year, summary.month),
            summary,
        );
        Ok(())
    }

    fn get_monthly_summary(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<MonthlySummary>> {
        Ok(self
            .summaries
            .get(&(employee_id.to_string(), year, month))
            .cloned())
    }
}
