// Extraction: each source is read fully into a RawTable

pub mod csv_source;
pub mod excel_source;
pub mod json_source;

pub use csv_source::read_csv_table;
pub use excel_source::read_excel_table;
pub use json_source::read_json_table;

use crate::error::ConsolidationError;
use std::path::Path;

pub(crate) fn unreadable(path: &Path, reason: impl ToString) -> ConsolidationError {
    ConsolidationError::Unreadable {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
