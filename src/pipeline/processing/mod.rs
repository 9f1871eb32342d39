// Transformation stages, run in order: clean, normalize, merge, aggregate

pub mod aggregate;
pub mod clean;
pub mod dates;
pub mod merge;
pub mod normalize;

pub use aggregate::{average_sales_by_year, sales_by_category};
pub use clean::{clean_sales_table, CleaningSummary};
pub use merge::{concat_sales, left_join_products, JoinStats};
pub use normalize::{lowercase_columns, to_product_records, to_sales_records};
