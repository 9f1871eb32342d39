pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

pub use pipeline::consolidation::{extract_and_transform, Consolidation, ConsolidationReport};
