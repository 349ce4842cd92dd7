use chrono::{NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    #[schemars(description = "Monday to Friday. Full working day of 8.5 expected hours.")]
    Weekday,

    #[schemars(description = "Half working day of 4 expected hours.")]
    Saturday,

    #[schemars(description = "Non-working day. Never counted as leave.")]
    Sunday,
}

impl DayType {
    pub fn expected_hours(self) -> f64 {
        match self {
            DayType::Weekday => 8.5,
            DayType::Saturday => 4.0,
            DayType::Sunday => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Saturday => "saturday",
            DayType::Sunday => "sunday",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Employee {
    #[schemars(description = "Store-assigned identifier used as the key for attendance facts and summaries")]
    pub id: String,

    #[schemars(description = "Name exactly as it appears in the uploaded spreadsheet. Case-sensitive join key.")]
    pub name: String,

    #[schemars(description = "Human readable code generated when the employee is first seen (e.g. 'jane-smith-417')")]
    pub external_code: String,
}

/// Payload handed to the store when an unseen name turns up in an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewEmployee {
    pub name: String,
    pub external_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DailyAttendance {
    pub employee_id: String,

    #[schemars(description = "Calendar day in YYYY-MM-DD format, without a time component")]
    pub date: NaiveDate,

    #[schemars(description = "Clock-in time as HH:MM, absent when not recorded")]
    pub in_time: Option<String>,

    #[schemars(description = "Clock-out time as HH:MM, absent when not recorded")]
    pub out_time: Option<String>,

    #[schemars(description = "Hours between in and out time. Negative when out time precedes in time.")]
    pub worked_hours: f64,

    #[schemars(description = "True when a working day is missing either clock time")]
    pub is_leave: bool,

    pub day_type: DayType,

    pub expected_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MonthlySummary {
    pub employee_id: String,

    #[schemars(description = "Calendar month, 1 = January")]
    pub month: u32,

    pub year: i32,

    #[schemars(description = "Calendar-derived expected hours for the whole month")]
    pub expected_hours: f64,

    #[schemars(description = "Sum of worked hours over all recorded days in the month")]
    pub actual_hours: f64,

    pub leaves_used: u32,

    #[schemars(description = "actual / expected * 100 rounded to 2 decimals. Zero when nothing is expected. Not capped at 100.")]
    pub productivity_percentage: f64,
}

impl MonthlySummary {
    /// Zero-valued summary reported for a month nothing has been ingested for.
    pub fn empty(employee_id: &str, month: u32, year: i32) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            month,
            year,
            expected_hours: 0.0,
            actual_hours: 0.0,
            leaves_used: 0,
            productivity_percentage: 0.0,
        }
    }
}

/// One spreadsheet row after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    pub employee_name: String,
    /// May carry a time-of-day when the source cell did; ingestion truncates it.
    pub date: NaiveDateTime,
    pub in_time: Option<String>,
    pub out_time: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    #[default]
    #[schemars(description = "Abort the whole upload on the first row that is missing a name or has an unusable date")]
    FailFast,

    #[schemars(description = "Drop offending rows, ingest the rest, and list the dropped rows in the report")]
    SkipInvalid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
pub struct IngestionConfig {
    #[serde(default)]
    #[schemars(description = "Worksheet to read. The first sheet of the workbook is used when omitted.")]
    pub sheet_name: Option<String>,

    #[serde(default)]
    #[schemars(description = "What to do with rows that lack an employee name or a usable date")]
    pub row_error_policy: RowErrorPolicy,
}

impl IngestionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(IngestionConfig)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowRejection {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeeIngestResult {
    pub employee_name: String,
    pub processed_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionReport {
    pub success: bool,
    pub employees: Vec<EmployeeIngestResult>,
    #[serde(default)]
    pub rejected_rows: Vec<RowRejection>,
}

impl IngestionReport {
    pub fn processed_records(&self) -> usize {
        self.employees.iter().map(|e| e.processed_records).sum()
    }
}
