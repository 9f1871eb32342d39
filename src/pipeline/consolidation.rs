use std::path::PathBuf;
use std::time::Instant;

use tracing::{error, info, info_span, instrument};
use uuid::Uuid;

use super::export::write_summary_workbook;
use super::ingestion::{read_csv_table, read_excel_table, read_json_table};
use super::processing::{
    average_sales_by_year, clean_sales_table, concat_sales, left_join_products, lowercase_columns,
    sales_by_category, to_product_records, to_sales_records, CleaningSummary, JoinStats,
};
use crate::config::{ConsolidationConfig, UnmatchedCategoryPolicy};
use crate::constants::{PRODUCTS_SOURCE, SALES_2022_SOURCE, SALES_2023_SOURCE};
use crate::domain::{CategorySales, YearlyAverage};
use crate::error::Result;
use crate::observability::metrics;
use crate::types::RawTable;

/// Outcome of the in-memory part of a run, before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub sources: Vec<CleaningSummary>,
    pub products_loaded: usize,
    pub join: JoinStats,
    pub categories: Vec<CategorySales>,
    pub yearly: Vec<YearlyAverage>,
}

/// Result of a complete consolidation run
#[derive(Debug, Clone)]
pub struct ConsolidationReport {
    pub run_id: Uuid,
    pub sources: Vec<CleaningSummary>,
    pub products_loaded: usize,
    pub join: JoinStats,
    pub categories: Vec<CategorySales>,
    pub yearly: Vec<YearlyAverage>,
    pub output_file: PathBuf,
    pub bytes_written: usize,
    pub duration_secs: f64,
}

/// Runs the sales consolidation job for one configuration
pub struct Consolidation {
    config: ConsolidationConfig,
}

impl Consolidation {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    /// Read the three sources, consolidate them and write the summary workbook.
    /// Any failure aborts the run; the output file is only replaced on success.
    pub fn run(&self) -> Result<ConsolidationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("consolidation", run_id = %run_id);
        let _enter = span.enter();

        let start = Instant::now();
        info!("🚀 Starting sales consolidation");

        match self.execute(run_id, start) {
            Ok(report) => {
                metrics::run::success(report.duration_secs);
                info!(
                    "✅ Consolidation finished in {:.2}s: {} rows, {} categories, {} years",
                    report.duration_secs,
                    report.join.rows,
                    report.categories.len(),
                    report.yearly.len()
                );
                Ok(report)
            }
            Err(e) => {
                metrics::run::error(e.kind());
                error!("❌ Consolidation failed ({}): {}", e.kind(), e);
                Err(e)
            }
        }
    }

    fn execute(&self, run_id: Uuid, start: Instant) -> Result<ConsolidationReport> {
        let sources = &self.config.sources;
        let output = &self.config.output;

        let sales_2022 = read_csv_table(&sources.sales_2022_csv, SALES_2022_SOURCE)?;
        let sales_2023 = read_excel_table(
            &sources.sales_2023_xlsx,
            sources.sales_2023_sheet.as_deref(),
            SALES_2023_SOURCE,
        )?;
        let products = read_json_table(&sources.products_json, PRODUCTS_SOURCE)?;

        let transformed = transform(
            sales_2022,
            sales_2023,
            products,
            &self.config.aggregation.unmatched_category,
        )?;

        let bytes_written = write_summary_workbook(
            &output.path,
            &output.category_sheet,
            &output.year_sheet,
            &transformed.categories,
            &transformed.yearly,
        )?;

        Ok(ConsolidationReport {
            run_id,
            sources: transformed.sources,
            products_loaded: transformed.products_loaded,
            join: transformed.join,
            categories: transformed.categories,
            yearly: transformed.yearly,
            output_file: output.path.clone(),
            bytes_written,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// Clean, normalize, union, join and aggregate already-extracted tables.
///
/// Cleaning sees the labels exactly as read; lower-casing happens after it.
/// 2022 rows come before 2023 rows in the union.
#[instrument(skip_all)]
pub fn transform(
    mut sales_2022: RawTable,
    mut sales_2023: RawTable,
    mut products: RawTable,
    policy: &UnmatchedCategoryPolicy,
) -> Result<Transformed> {
    let summary_2022 = clean_sales_table(&mut sales_2022)?;
    let summary_2023 = clean_sales_table(&mut sales_2023)?;

    lowercase_columns(&mut sales_2022)?;
    lowercase_columns(&mut sales_2023)?;
    lowercase_columns(&mut products)?;

    let sales = concat_sales(
        to_sales_records(&sales_2022)?,
        to_sales_records(&sales_2023)?,
    );
    let catalog = to_product_records(&products)?;

    let (records, join) = left_join_products(sales, &catalog);
    let categories = sales_by_category(&records, policy);
    let yearly = average_sales_by_year(&records);

    Ok(Transformed {
        sources: vec![summary_2022, summary_2023],
        products_loaded: catalog.len(),
        join,
        categories,
        yearly,
    })
}

/// Run the job once with the built-in locations and settings
pub fn extract_and_transform() -> Result<ConsolidationReport> {
    Consolidation::new(ConsolidationConfig::default()).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsolidationError;
    use crate::types::Cell;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn sales_table(source: &str, rows: Vec<Vec<Cell>>) -> RawTable {
        let mut t = RawTable::new(
            source,
            vec![
                "date".into(),
                "product_id".into(),
                "quantity".into(),
                "sales".into(),
            ],
        );
        for row in rows {
            t.push_row(row).unwrap();
        }
        t
    }

    fn products_table() -> RawTable {
        let mut t = RawTable::new("products", vec!["Product_ID".into(), "Category".into()]);
        t.push_row(vec![Cell::Int(1), text("Toys")]).unwrap();
        t.push_row(vec![Cell::Int(2), text("Books")]).unwrap();
        t
    }

    #[test]
    fn test_transform_end_to_end() {
        let sales_2022 = sales_table(
            "sales_2022",
            vec![
                vec![text("2022-01-01"), Cell::Int(1), Cell::Int(2), Cell::Null],
                vec![text("2022-01-02"), Cell::Int(2), Cell::Int(1), Cell::Int(10)],
                vec![Cell::Null, Cell::Int(2), Cell::Int(1), Cell::Int(500)],
            ],
        );
        let sales_2023 = sales_table(
            "sales_2023",
            vec![
                vec![text("2023-05-01"), Cell::Float(1.0), Cell::Int(1), Cell::Float(30.0)],
                vec![text("2023-06-01"), Cell::Int(9), Cell::Int(1), Cell::Float(50.0)],
            ],
        );

        let out = transform(
            sales_2022,
            sales_2023,
            products_table(),
            &UnmatchedCategoryPolicy::Exclude,
        )
        .unwrap();

        assert_eq!(out.sources[0].rows_dropped, 1);
        assert_eq!(out.sources[0].fill_value, Some(10.0));
        assert_eq!(out.products_loaded, 2);
        assert_eq!(out.join.rows, 4);
        assert_eq!(out.join.unmatched_rows, 1);

        assert_eq!(
            out.categories,
            vec![
                CategorySales {
                    category: "Toys".to_string(),
                    total_sales: 40.0
                },
                CategorySales {
                    category: "Books".to_string(),
                    total_sales: 10.0
                },
            ]
        );
        assert_eq!(
            out.yearly,
            vec![
                YearlyAverage {
                    year: 2022,
                    average_sales: Some(10.0)
                },
                YearlyAverage {
                    year: 2023,
                    average_sales: Some(40.0)
                },
            ]
        );
    }

    #[test]
    fn test_transform_groups_unmatched_when_configured() {
        let sales_2022 = sales_table(
            "sales_2022",
            vec![vec![text("2022-01-01"), Cell::Int(7), Cell::Int(1), Cell::Int(3)]],
        );
        let sales_2023 = sales_table("sales_2023", vec![]);

        let out = transform(
            sales_2022,
            sales_2023,
            products_table(),
            &UnmatchedCategoryPolicy::Group("unknown".to_string()),
        )
        .unwrap();

        assert_eq!(out.categories.len(), 1);
        assert_eq!(out.categories[0].category, "unknown");
        assert_eq!(out.categories[0].total_sales, 3.0);
    }

    #[test]
    fn test_capitalized_required_column_is_rejected() {
        let mut sales_2023 = RawTable::new(
            "sales_2023",
            vec![
                "Date".into(),
                "product_id".into(),
                "quantity".into(),
                "sales".into(),
            ],
        );
        sales_2023
            .push_row(vec![text("2023-01-01"), Cell::Int(1), Cell::Int(1), Cell::Int(1)])
            .unwrap();

        let result = transform(
            sales_table("sales_2022", vec![]),
            sales_2023,
            products_table(),
            &UnmatchedCategoryPolicy::Exclude,
        );
        assert!(matches!(
            result,
            Err(ConsolidationError::MissingColumn { ref column, .. }) if column == "date"
        ));
    }

    #[test]
    fn test_run_with_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConsolidationConfig::default();
        config.sources.sales_2022_csv = dir.path().join("absent.csv");
        config.output.path = dir.path().join("out.xlsx");

        let result = Consolidation::new(config).run();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), "io");
        assert!(!dir.path().join("out.xlsx").exists());
    }
}
