//! Metrics for the consolidation job
//!
//! Recording goes through the `metrics` facade. Nothing is exported unless a
//! recorder is installed; the binary installs a Prometheus recorder and
//! writes its exposition to a textfile once the run is over.

use std::fmt;
use std::fs;
use std::path::Path;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{ConsolidationError, Result};

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run
    RunsSuccess,
    RunsError,
    RunDuration,

    // Ingestion
    IngestionRowsRead,
    IngestionDuration,

    // Cleaning
    CleaningRowsDropped,
    CleaningSalesFilled,

    // Merge
    MergeConsolidatedRows,
    MergeUnmatchedProducts,
    MergeDuplicateProducts,

    // Aggregation
    AggregationGroups,

    // Export
    ExportDuration,
    ExportBytes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsSuccess => "consolidation_runs_success_total",
            MetricName::RunsError => "consolidation_runs_error_total",
            MetricName::RunDuration => "consolidation_run_duration_seconds",

            MetricName::IngestionRowsRead => "consolidation_ingestion_rows_read_total",
            MetricName::IngestionDuration => "consolidation_ingestion_duration_seconds",

            MetricName::CleaningRowsDropped => "consolidation_cleaning_rows_dropped_total",
            MetricName::CleaningSalesFilled => "consolidation_cleaning_sales_filled_total",

            MetricName::MergeConsolidatedRows => "consolidation_merge_consolidated_rows_total",
            MetricName::MergeUnmatchedProducts => "consolidation_merge_unmatched_products_total",
            MetricName::MergeDuplicateProducts => "consolidation_merge_duplicate_products_total",

            MetricName::AggregationGroups => "consolidation_aggregation_groups",

            MetricName::ExportDuration => "consolidation_export_duration_seconds",
            MetricName::ExportBytes => "consolidation_export_bytes",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install a global Prometheus recorder and return its handle
pub fn init_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        ConsolidationError::Config(format!("Failed to install Prometheus recorder: {}", e))
    })?;
    info!("Metrics system initialized (textfile export)");
    Ok(handle)
}

/// Render the current metrics and write them to `path`, replacing any
/// previous file
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, handle.render())?;
    info!("Wrote metrics to {}", path.display());
    Ok(())
}

// ============================================================================
// Run Metrics
// ============================================================================

pub mod run {
    use super::MetricName;

    pub fn success(secs: f64) {
        ::metrics::counter!(MetricName::RunsSuccess.as_str()).increment(1);
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }

    pub fn error(kind: &'static str) {
        ::metrics::counter!(MetricName::RunsError.as_str(), "kind" => kind).increment(1);
    }
}

// ============================================================================
// Ingestion Metrics
// ============================================================================

pub mod ingestion {
    use super::MetricName;

    pub fn rows_read(source: &str, rows: usize) {
        ::metrics::counter!(MetricName::IngestionRowsRead.as_str(), "source" => source.to_string())
            .increment(rows as u64);
    }

    pub fn duration(source: &str, secs: f64) {
        ::metrics::histogram!(MetricName::IngestionDuration.as_str(), "source" => source.to_string())
            .record(secs);
    }
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::MetricName;

    pub fn rows_dropped(source: &str, rows: usize) {
        ::metrics::counter!(MetricName::CleaningRowsDropped.as_str(), "source" => source.to_string())
            .increment(rows as u64);
    }

    pub fn sales_filled(source: &str, cells: usize) {
        ::metrics::counter!(MetricName::CleaningSalesFilled.as_str(), "source" => source.to_string())
            .increment(cells as u64);
    }
}

// ============================================================================
// Merge Metrics
// ============================================================================

pub mod merge {
    use super::MetricName;

    pub fn consolidated_rows(rows: usize) {
        ::metrics::counter!(MetricName::MergeConsolidatedRows.as_str()).increment(rows as u64);
    }

    pub fn unmatched_products(rows: usize) {
        ::metrics::counter!(MetricName::MergeUnmatchedProducts.as_str()).increment(rows as u64);
    }

    pub fn duplicate_products(count: usize) {
        ::metrics::counter!(MetricName::MergeDuplicateProducts.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Aggregation / Export Metrics
// ============================================================================

pub mod aggregation {
    use super::MetricName;

    pub fn groups(aggregate: &'static str, count: usize) {
        ::metrics::gauge!(MetricName::AggregationGroups.as_str(), "aggregate" => aggregate)
            .set(count as f64);
    }
}

pub mod export {
    use super::MetricName;

    pub fn written(bytes: usize, secs: f64) {
        ::metrics::histogram!(MetricName::ExportBytes.as_str()).record(bytes as f64);
        ::metrics::histogram!(MetricName::ExportDuration.as_str()).record(secs);
    }
}
