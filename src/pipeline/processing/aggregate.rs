use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::UnmatchedCategoryPolicy;
use crate::domain::{CategorySales, ConsolidatedRecord, YearlyAverage};
use crate::observability::metrics;

/// Sum of sales per category, largest first.
///
/// Groups start in ascending category order and are then stably sorted by
/// descending total, so equal totals stay in name order. Null sales add
/// nothing. Rows without a category follow `policy`.
pub fn sales_by_category(
    records: &[ConsolidatedRecord],
    policy: &UnmatchedCategoryPolicy,
) -> Vec<CategorySales> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    let mut excluded = 0usize;

    for record in records {
        let category = match (record.category(), policy) {
            (Some(category), _) => category,
            (None, UnmatchedCategoryPolicy::Group(label)) => label.as_str(),
            (None, UnmatchedCategoryPolicy::Exclude) => {
                excluded += 1;
                continue;
            }
        };
        let total = totals.entry(category).or_insert(0.0);
        if let Some(sales) = record.sale.sales {
            *total += sales;
        }
    }

    if excluded > 0 {
        debug!("Left {} rows without a category out of the category totals", excluded);
    }

    let mut result: Vec<CategorySales> = totals
        .into_iter()
        .map(|(category, total_sales)| CategorySales {
            category: category.to_string(),
            total_sales,
        })
        .collect();
    result.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));

    info!("📊 Aggregated sales into {} categories", result.len());
    metrics::aggregation::groups("sales_by_category", result.len());
    result
}

/// Mean sales per year, ascending by year. A year whose rows carry no
/// sales figure at all has no mean.
pub fn average_sales_by_year(records: &[ConsolidatedRecord]) -> Vec<YearlyAverage> {
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for record in records {
        let (sum, count) = groups.entry(record.year).or_insert((0.0, 0));
        if let Some(sales) = record.sale.sales {
            *sum += sales;
            *count += 1;
        }
    }

    let result: Vec<YearlyAverage> = groups
        .into_iter()
        .map(|(year, (sum, count))| YearlyAverage {
            year,
            average_sales: (count > 0).then(|| sum / count as f64),
        })
        .collect();

    info!("📊 Aggregated average sales for {} years", result.len());
    metrics::aggregation::groups("average_sales_by_year", result.len());
    result
}
