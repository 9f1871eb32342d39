use crate::types::Cell;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical `product_id` used for joining.
///
/// Spreadsheets store integers as floats and JSON catalogs sometimes quote
/// ids, so integral floats and integer text both collapse to `Int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductKey {
    Int(i64),
    Text(String),
}

impl ProductKey {
    /// Key for a cell, `None` for null
    pub fn from_cell(cell: &Cell) -> Option<Self> {
        match cell {
            Cell::Null => None,
            Cell::Int(v) => Some(ProductKey::Int(*v)),
            Cell::Float(v) => {
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Some(ProductKey::Int(*v as i64))
                } else {
                    Some(ProductKey::Text(v.to_string()))
                }
            }
            Cell::Text(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<i64>() {
                    Ok(v) => Some(ProductKey::Int(v)),
                    Err(_) => Some(ProductKey::Text(trimmed.to_string())),
                }
            }
            other => Some(ProductKey::Text(other.to_string())),
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKey::Int(v) => write!(f, "{}", v),
            ProductKey::Text(v) => write!(f, "{}", v),
        }
    }
}

/// One sales line from a yearly source, after cleaning and normalization
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub source: String,
    pub date: NaiveDateTime,
    pub product_id: ProductKey,
    pub quantity: f64,
    /// Null only when the whole source had no sales figure to average
    pub sales: Option<f64>,
    /// Source-specific columns, keyed by lower-case label
    pub extra: BTreeMap<String, Cell>,
}

/// One entry of the product catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub product_id: ProductKey,
    pub category: Option<String>,
    pub attributes: BTreeMap<String, Cell>,
}

/// A sales line joined with its product, if any
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRecord {
    pub sale: SalesRecord,
    pub product: Option<ProductRecord>,
    pub year: i32,
}

impl ConsolidatedRecord {
    pub fn category(&self) -> Option<&str> {
        self.product.as_ref().and_then(|p| p.category.as_deref())
    }

    pub fn is_matched(&self) -> bool {
        self.product.is_some()
    }
}

/// Row of the Sales-by-category aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySales {
    pub category: String,
    pub total_sales: f64,
}

/// Row of the Average-sales-by-year aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyAverage {
    pub year: i32,
    /// `None` when no row of that year carries a sales figure
    pub average_sales: Option<f64>,
}
