use std::collections::HashMap;

use chrono::Datelike;
use tracing::{info, instrument, warn};

use crate::domain::{ConsolidatedRecord, ProductKey, ProductRecord, SalesRecord};
use crate::observability::metrics;

/// Stack the two yearly tables, first before second, keeping every row
pub fn concat_sales(first: Vec<SalesRecord>, second: Vec<SalesRecord>) -> Vec<SalesRecord> {
    let mut sales = first;
    sales.extend(second);
    sales
}

/// Counters from the product join
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinStats {
    pub rows: usize,
    pub unmatched_rows: usize,
    pub duplicate_products: usize,
}

/// Left-join sales with products on `product_id` and derive each row's year.
///
/// Every sales row comes out exactly once, in input order. When the catalog
/// lists a `product_id` more than once, the first entry is used.
#[instrument(skip_all, fields(sales = sales.len(), products = products.len()))]
pub fn left_join_products(
    sales: Vec<SalesRecord>,
    products: &[ProductRecord],
) -> (Vec<ConsolidatedRecord>, JoinStats) {
    let mut index: HashMap<&ProductKey, &ProductRecord> = HashMap::with_capacity(products.len());
    let mut stats = JoinStats::default();

    for product in products {
        if index.contains_key(&product.product_id) {
            warn!(
                "Product {} appears more than once in the catalog; keeping the first entry",
                product.product_id
            );
            stats.duplicate_products += 1;
        } else {
            index.insert(&product.product_id, product);
        }
    }

    let records: Vec<ConsolidatedRecord> = sales
        .into_iter()
        .map(|sale| {
            let product = index.get(&sale.product_id).map(|p| (*p).clone());
            if product.is_none() {
                stats.unmatched_rows += 1;
            }
            ConsolidatedRecord {
                year: sale.date.year(),
                sale,
                product,
            }
        })
        .collect();

    stats.rows = records.len();
    if stats.unmatched_rows > 0 {
        warn!(
            "{} of {} sales rows have no matching product",
            stats.unmatched_rows, stats.rows
        );
    }
    info!("🔗 Joined {} sales rows with {} products", stats.rows, products.len());

    metrics::merge::consolidated_rows(stats.rows);
    metrics::merge::unmatched_products(stats.unmatched_rows);
    metrics::merge::duplicate_products(stats.duplicate_products);

    (records, stats)
}
