// Consolidation pipeline: ingestion, processing, and export

pub mod consolidation;
pub mod export;
pub mod ingestion;
pub mod processing;

pub use consolidation::{extract_and_transform, transform, Consolidation, ConsolidationReport};
pub use export::write_summary_workbook;
