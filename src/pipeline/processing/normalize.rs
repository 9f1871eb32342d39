use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::dates::parse_timestamp;
use crate::constants::{
    CATEGORY_COLUMN, DATE_COLUMN, PRODUCT_ID_COLUMN, QUANTITY_COLUMN, SALES_COLUMN,
};
use crate::domain::{ProductKey, ProductRecord, SalesRecord};
use crate::error::{ConsolidationError, Result};
use crate::types::{Cell, RawTable};

/// Lower-case every column label. Two labels that only differ by case
/// are a schema error.
pub fn lowercase_columns(table: &mut RawTable) -> Result<()> {
    table.rename_columns(|c| c.to_lowercase())?;
    debug!("Normalized columns of {}: {:?}", table.source, table.columns());
    Ok(())
}

/// Turn a cleaned, normalized sales table into typed records
#[instrument(skip(table), fields(source = %table.source))]
pub fn to_sales_records(table: &RawTable) -> Result<Vec<SalesRecord>> {
    let date_idx = table.column_index(DATE_COLUMN)?;
    let product_idx = table.column_index(PRODUCT_ID_COLUMN)?;
    let quantity_idx = table.column_index(QUANTITY_COLUMN)?;
    let sales_idx = table.column_index(SALES_COLUMN)?;
    let known = [date_idx, product_idx, quantity_idx, sales_idx];

    let mut records = Vec::with_capacity(table.len());
    for (i, row) in table.rows().iter().enumerate() {
        let row_no = table.row_number(i);

        let date = parse_timestamp(&row[date_idx]).ok_or_else(|| ConsolidationError::InvalidDate {
            source_name: table.source.clone(),
            row: row_no,
            value: row[date_idx].to_string(),
        })?;

        let product_id = ProductKey::from_cell(&row[product_idx])
            .ok_or_else(|| missing_value(table, row_no, PRODUCT_ID_COLUMN))?;

        let quantity = number(table, row_no, QUANTITY_COLUMN, &row[quantity_idx])?
            .ok_or_else(|| missing_value(table, row_no, QUANTITY_COLUMN))?;

        let sales = number(table, row_no, SALES_COLUMN, &row[sales_idx])?;

        let extra = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(idx, _)| !known.contains(idx))
            .map(|(idx, name)| (name.clone(), row[idx].clone()))
            .collect();

        records.push(SalesRecord {
            source: table.source.clone(),
            date,
            product_id,
            quantity,
            sales,
            extra,
        });
    }

    debug!("Built {} sales records", records.len());
    Ok(records)
}

/// Turn the normalized product table into typed records. Rows without a
/// `product_id` can never be joined and are skipped.
#[instrument(skip(table), fields(source = %table.source))]
pub fn to_product_records(table: &RawTable) -> Result<Vec<ProductRecord>> {
    let product_idx = table.column_index(PRODUCT_ID_COLUMN)?;
    let category_idx = table.column_index(CATEGORY_COLUMN)?;

    let mut records = Vec::with_capacity(table.len());
    let mut skipped = 0usize;

    for row in table.rows() {
        let Some(product_id) = ProductKey::from_cell(&row[product_idx]) else {
            skipped += 1;
            continue;
        };

        let category = match &row[category_idx] {
            Cell::Null => None,
            other => Some(other.to_string()),
        };

        let attributes: BTreeMap<String, Cell> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != product_idx && *idx != category_idx)
            .map(|(idx, name)| (name.clone(), row[idx].clone()))
            .collect();

        records.push(ProductRecord {
            product_id,
            category,
            attributes,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} products without product_id", skipped);
    }
    Ok(records)
}

fn number(table: &RawTable, row: usize, column: &str, cell: &Cell) -> Result<Option<f64>> {
    cell.as_f64().map_err(|value| ConsolidationError::InvalidNumber {
        source_name: table.source.clone(),
        row,
        column: column.to_string(),
        value,
    })
}

fn missing_value(table: &RawTable, row: usize, column: &str) -> ConsolidationError {
    ConsolidationError::MalformedSource {
        source_name: table.source.clone(),
        reason: format!("row {} has no '{}'", row, column),
    }
}
