use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet read failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook write failed: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cannot read source '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source '{source_name}' has no column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Source '{source_name}' has duplicate column '{column}'")]
    DuplicateColumn { source_name: String, column: String },

    #[error("Source '{source_name}' is malformed: {reason}")]
    MalformedSource { source_name: String, reason: String },

    #[error("Source '{source_name}' row {row}: cannot parse '{value}' as a date")]
    InvalidDate {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("Source '{source_name}' row {row}: column '{column}' holds non-numeric value '{value}'")]
    InvalidNumber {
        source_name: String,
        row: usize,
        column: String,
        value: String,
    },
}

impl ConsolidationError {
    /// Coarse failure class, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsolidationError::Io(_)
            | ConsolidationError::Csv(_)
            | ConsolidationError::Spreadsheet(_)
            | ConsolidationError::Workbook(_)
            | ConsolidationError::Unreadable { .. } => "io",
            ConsolidationError::Json(_)
            | ConsolidationError::MissingColumn { .. }
            | ConsolidationError::DuplicateColumn { .. }
            | ConsolidationError::MalformedSource { .. } => "schema",
            ConsolidationError::InvalidDate { .. } | ConsolidationError::InvalidNumber { .. } => "data",
            ConsolidationError::Toml(_) | ConsolidationError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsolidationError>;
