use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Unable to read spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Sheet not found in workbook: {0}")]
    SheetNotFound(String),

    #[error("Excel file is empty")]
    EmptyInput,

    #[error("Missing required column: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Error parsing row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Error parsing row {row}: Invalid date value: {value}")]
    InvalidDate { row: usize, value: String },

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Ingestion failed during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AttendanceError {
    /// True when the upload itself was absent, as opposed to failing during processing.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::NoFile)
    }

    /// True for faults caused by the spreadsheet contents rather than the backing store.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Workbook(_)
                | Self::SheetNotFound(_)
                | Self::EmptyInput
                | Self::MissingColumns(_)
                | Self::MalformedRow { .. }
                | Self::InvalidDate { .. }
        )
    }

    /// Sheet row (1-based, header is row 1) a row-scoped error points at.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::MalformedRow { row, .. } | Self::InvalidDate { row, .. } => Some(*row),
            _ => None,
        }
    }

    pub(crate) fn storage(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Storage { operation, source }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Employee not found: {0}")]
    UnknownEmployee(String),

    #[error("Employee already exists: {0}")]
    DuplicateEmployee(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
