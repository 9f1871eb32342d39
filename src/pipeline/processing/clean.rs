use tracing::{debug, info, instrument, warn};

use crate::constants::{REQUIRED_SALES_COLUMNS, SALES_COLUMN};
use crate::error::{ConsolidationError, Result};
use crate::observability::metrics;
use crate::types::{Cell, RawTable};

/// What cleaning did to one yearly source
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningSummary {
    pub source: String,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub sales_filled: usize,
    /// Mean used for the fill; `None` when the source had no sales figures
    pub fill_value: Option<f64>,
}

/// Drop incomplete rows, then fill missing sales with the source mean.
/// Required columns are looked up by their labels as read from the source.
#[instrument(skip(table), fields(source = %table.source))]
pub fn clean_sales_table(table: &mut RawTable) -> Result<CleaningSummary> {
    let rows_read = table.len();
    let rows_dropped = drop_incomplete_rows(table, &REQUIRED_SALES_COLUMNS)?;
    let (sales_filled, fill_value) = fill_missing_with_mean(table, SALES_COLUMN)?;

    info!(
        "🧹 Cleaned {}: {} rows kept, {} dropped, {} sales filled",
        table.source,
        table.len(),
        rows_dropped,
        sales_filled
    );

    Ok(CleaningSummary {
        source: table.source.clone(),
        rows_read,
        rows_dropped,
        sales_filled,
        fill_value,
    })
}

/// Remove every row where any of `required` is null. Returns the number of
/// rows removed.
pub fn drop_incomplete_rows(table: &mut RawTable, required: &[&str]) -> Result<usize> {
    let indices = required
        .iter()
        .map(|name| table.column_index(name))
        .collect::<Result<Vec<_>>>()?;

    let before = table.len();
    table.retain_rows(|row| indices.iter().all(|&idx| !row[idx].is_null()));
    let dropped = before - table.len();

    if dropped > 0 {
        warn!(
            "Dropped {} of {} rows from {} missing one of {:?}",
            dropped, before, table.source, required
        );
    }
    metrics::cleaning::rows_dropped(&table.source, dropped);
    Ok(dropped)
}

/// Replace nulls in `column` with the mean of its non-null values.
/// Returns how many cells were filled and the mean used.
pub fn fill_missing_with_mean(table: &mut RawTable, column: &str) -> Result<(usize, Option<f64>)> {
    let idx = table.column_index(column)?;
    let mean = column_mean(table, idx)?;

    let Some(mean) = mean else {
        let missing = table.column_cells(idx).filter(|c| c.is_null()).count();
        if missing > 0 {
            warn!(
                "No '{}' values in {} to average; {} cells stay empty",
                column, table.source, missing
            );
        }
        return Ok((0, None));
    };

    let mut filled = 0;
    for cell in table.column_cells_mut(idx) {
        if cell.is_null() {
            *cell = Cell::Float(mean);
            filled += 1;
        }
    }

    debug!("Filled {} '{}' cells in {} with {}", filled, column, table.source, mean);
    metrics::cleaning::sales_filled(&table.source, filled);
    Ok((filled, Some(mean)))
}

/// Arithmetic mean of the non-null values in a column
pub fn column_mean(table: &RawTable, idx: usize) -> Result<Option<f64>> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for (row, cell) in table.column_cells(idx).enumerate() {
        let value = cell.as_f64().map_err(|value| ConsolidationError::InvalidNumber {
            source_name: table.source.clone(),
            row: table.row_number(row),
            column: table.columns()[idx].clone(),
            value,
        })?;
        if let Some(v) = value {
            sum += v;
            count += 1;
        }
    }

    Ok(if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_table(rows: Vec<Vec<Cell>>) -> RawTable {
        let mut t = RawTable::new(
            "sales_2022",
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

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_null_sales_filled_with_mean_of_observed() {
        let mut t = sales_table(vec![
            vec![text("2022-01-01"), Cell::Int(1), Cell::Int(2), Cell::Null],
            vec![text("2022-01-02"), Cell::Int(2), Cell::Int(1), Cell::Int(10)],
        ]);

        let summary = clean_sales_table(&mut t).unwrap();
        assert_eq!(summary.rows_dropped, 0);
        assert_eq!(summary.sales_filled, 1);
        assert_eq!(summary.fill_value, Some(10.0));
        assert_eq!(t.rows()[0][3], Cell::Float(10.0));
    }

    #[test]
    fn test_incomplete_rows_dropped_before_mean() {
        let mut t = sales_table(vec![
            // dropped: no date, and its sales must not count toward the mean
            vec![Cell::Null, Cell::Int(1), Cell::Int(1), Cell::Float(1000.0)],
            vec![text("2022-01-02"), Cell::Null, Cell::Int(1), Cell::Float(5.0)],
            vec![text("2022-01-03"), Cell::Int(3), Cell::Null, Cell::Float(5.0)],
            vec![text("2022-01-04"), Cell::Int(4), Cell::Int(1), Cell::Float(4.0)],
            vec![text("2022-01-05"), Cell::Int(5), Cell::Int(1), Cell::Float(8.0)],
            vec![text("2022-01-06"), Cell::Int(6), Cell::Int(1), Cell::Null],
        ]);

        let summary = clean_sales_table(&mut t).unwrap();
        assert_eq!(summary.rows_read, 6);
        assert_eq!(summary.rows_dropped, 3);
        assert_eq!(summary.fill_value, Some(6.0));
        assert_eq!(t.len(), 3);
        assert!(t
            .rows()
            .iter()
            .all(|row| row.iter().take(3).all(|c| !c.is_null())));
        assert!(t.column_cells(3).all(|c| !c.is_null()));
    }

    #[test]
    fn test_all_sales_missing_leaves_nulls() {
        let mut t = sales_table(vec![vec![
            text("2022-01-01"),
            Cell::Int(1),
            Cell::Int(1),
            Cell::Null,
        ]]);

        let summary = clean_sales_table(&mut t).unwrap();
        assert_eq!(summary.fill_value, None);
        assert_eq!(summary.sales_filled, 0);
        assert!(t.rows()[0][3].is_null());
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let mut t = RawTable::new("sales_2023", vec!["Date".into(), "product_id".into()]);
        let result = clean_sales_table(&mut t);
        match result {
            Err(ConsolidationError::MissingColumn { source_name, column }) => {
                assert_eq!(source_name, "sales_2023");
                assert_eq!(column, "date");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_sales_is_data_error() {
        let mut t = sales_table(vec![vec![
            text("2022-01-01"),
            Cell::Int(1),
            Cell::Int(1),
            text("lots"),
        ]]);
        let result = clean_sales_table(&mut t);
        assert!(matches!(result, Err(ConsolidationError::InvalidNumber { row: 1, .. })));
    }

    #[test]
    fn test_bad_sales_reported_at_source_row() {
        let mut t = sales_table(vec![
            vec![Cell::Null, Cell::Int(1), Cell::Int(1), Cell::Int(4)],
            vec![text("2022-01-02"), Cell::Int(2), Cell::Int(1), text("lots")],
        ]);
        let result = clean_sales_table(&mut t);
        assert!(matches!(result, Err(ConsolidationError::InvalidNumber { row: 2, .. })));
    }
}
