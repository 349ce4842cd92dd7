use crate::error::{AttendanceError, Result};
use crate::schema::{AttendanceRecord, IngestionConfig, RowErrorPolicy, RowRejection};
use crate::utils::excel_serial_to_datetime;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::io::Cursor;

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{2})$").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// A spreadsheet cell, reduced to the shapes attendance sheets actually contain.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Blank, or the zero value a formula leaves behind when its source cell is empty.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Number(n) => *n == 0.0,
            CellValue::Bool(b) => !b,
            other => other.is_blank(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(n) => CellValue::Number(*n as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
            Data::DateTime(dt) => {
                // Time-only cells are a bare day fraction and stay numeric.
                let serial = dt.as_f64();
                if serial < 1.0 {
                    return CellValue::Number(serial);
                }
                // as_datetime applies the 1904 epoch for workbooks that use it.
                dt.as_datetime()
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Number(serial))
            }
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredColumn {
    EmployeeName,
    Date,
    InTime,
    OutTime,
}

impl RequiredColumn {
    pub const ALL: [RequiredColumn; 4] = [
        RequiredColumn::EmployeeName,
        RequiredColumn::Date,
        RequiredColumn::InTime,
        RequiredColumn::OutTime,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RequiredColumn::EmployeeName => "Employee Name",
            RequiredColumn::Date => "Date",
            RequiredColumn::InTime => "In-Time",
            RequiredColumn::OutTime => "Out-Time",
        }
    }

    /// Accepted header spellings, compared after trimming and lowercasing.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            RequiredColumn::EmployeeName => &["employee name", "employee_name", "employeename"],
            RequiredColumn::Date => &["date"],
            RequiredColumn::InTime => &["in-time", "in time", "in_time", "intime"],
            RequiredColumn::OutTime => &["out-time", "out time", "out_time", "outtime"],
        }
    }

    fn matches(self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        self.aliases().contains(&header.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based position in the worksheet; the header occupies row 1.
    pub row_number: usize,
    pub cells: Vec<CellValue>,
}

impl SheetRow {
    fn cell(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&CellValue::Empty)
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

/// Header row plus the non-blank data rows beneath it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    /// Builds a sheet from in-memory rows, numbering them as if the header sat on row 1.
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(idx, cells)| SheetRow {
                    row_number: idx + 2,
                    cells,
                })
                .filter(|row| !row.is_blank())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub employee_name: usize,
    pub date: usize,
    pub in_time: usize,
    pub out_time: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedSheet {
    pub records: Vec<AttendanceRecord>,
    pub rejected: Vec<RowRejection>,
}

/// Reads the configured worksheet (first sheet by default) out of raw workbook bytes.
pub fn read_workbook(bytes: &[u8], config: &IngestionConfig) -> Result<Sheet> {
    if bytes.is_empty() {
        return Err(AttendanceError::NoFile);
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_name = match &config.sheet_name {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(AttendanceError::EmptyInput)?,
    };

    if !workbook.sheet_names().contains(&sheet_name) {
        return Err(AttendanceError::SheetNotFound(sheet_name));
    }

    let range = workbook.worksheet_range(&sheet_name)?;
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut rows = range.rows().enumerate();
    let headers = match rows.next() {
        Some((_, header_cells)) => header_cells
            .iter()
            .map(|cell| CellValue::from(cell).to_string().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let rows: Vec<SheetRow> = rows
        .map(|(idx, cells)| SheetRow {
            row_number: first_row + idx + 1,
            cells: cells.iter().map(CellValue::from).collect(),
        })
        .filter(|row| !row.is_blank())
        .collect();

    debug!(
        "Read sheet '{}' with {} columns and {} data rows",
        sheet_name,
        headers.len(),
        rows.len()
    );

    Ok(Sheet { headers, rows })
}

/// Checks the sheet has data and resolves every required column against the header row.
pub fn validate_sheet_structure(sheet: &Sheet) -> Result<ColumnMap> {
    if sheet.rows.is_empty() {
        return Err(AttendanceError::EmptyInput);
    }

    let mut resolved = [None; 4];
    let mut missing = Vec::new();

    for (slot, column) in resolved.iter_mut().zip(RequiredColumn::ALL) {
        *slot = sheet.headers.iter().position(|h| column.matches(h));
        if slot.is_none() {
            missing.push(column.label().to_string());
        }
    }

    match resolved {
        [Some(employee_name), Some(date), Some(in_time), Some(out_time)] => Ok(ColumnMap {
            employee_name,
            date,
            in_time,
            out_time,
        }),
        _ => Err(AttendanceError::MissingColumns(missing)),
    }
}

pub fn normalize_sheet(sheet: &Sheet, policy: RowErrorPolicy) -> Result<NormalizedSheet> {
    let columns = validate_sheet_structure(sheet)?;
    let mut normalized = NormalizedSheet {
        records: Vec::with_capacity(sheet.rows.len()),
        rejected: Vec::new(),
    };

    for row in &sheet.rows {
        match normalize_row(row, &columns) {
            Ok(record) => normalized.records.push(record),
            Err(e) if policy == RowErrorPolicy::SkipInvalid => {
                warn!("Skipping row {}: {}", row.row_number, e);
                normalized.rejected.push(RowRejection {
                    row: row.row_number,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(normalized)
}

/// Reads and normalizes a workbook in one step.
pub fn parse_workbook(bytes: &[u8], config: &IngestionConfig) -> Result<NormalizedSheet> {
    let sheet = read_workbook(bytes, config)?;
    normalize_sheet(&sheet, config.row_error_policy)
}

pub fn normalize_row(row: &SheetRow, columns: &ColumnMap) -> Result<AttendanceRecord> {
    let name_cell = row.cell(columns.employee_name);
    let employee_name = name_cell.to_string().trim().to_string();
    if name_cell.is_missing() || employee_name.is_empty() {
        return Err(AttendanceError::MalformedRow {
            row: row.row_number,
            reason: "Missing employee name".to_string(),
        });
    }

    let date_cell = row.cell(columns.date);
    if date_cell.is_missing() {
        return Err(AttendanceError::MalformedRow {
            row: row.row_number,
            reason: "Missing date".to_string(),
        });
    }

    let date = parse_date_cell(date_cell).ok_or_else(|| AttendanceError::InvalidDate {
        row: row.row_number,
        value: date_cell.to_string(),
    })?;

    Ok(AttendanceRecord {
        employee_name,
        date,
        in_time: normalize_time_cell(row.cell(columns.in_time)),
        out_time: normalize_time_cell(row.cell(columns.out_time)),
    })
}

pub fn parse_date_cell(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Number(serial) => excel_serial_to_datetime(*serial),
        CellValue::Text(s) => parse_date_string(s.trim()),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

pub fn parse_date_string(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Canonical `HH:MM` for a time cell, or `None` for anything unrecognised.
pub fn normalize_time_cell(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Text(s) => {
            let cleaned = s.trim();
            if cleaned.is_empty() || cleaned == "-" {
                return None;
            }
            let caps = CLOCK_TIME.captures(cleaned)?;
            Some(format!("{:0>2}:{}", &caps[1], &caps[2]))
        }
        CellValue::Number(fraction) if (0.0..1.0).contains(fraction) => {
            let total_minutes = (fraction * 24.0 * 60.0).round() as u32;
            Some(format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60))
        }
        _ => None,
    }
}
