/// Input and output locations used when no configuration file is given
pub const DEFAULT_SALES_2022_CSV: &str = "/opt/airflow/dags/sales_2022.csv";
pub const DEFAULT_SALES_2023_XLSX: &str = "/opt/airflow/dags/sales_2023.xlsx";
pub const DEFAULT_PRODUCTS_JSON: &str = "/opt/airflow/dags/products.json";
pub const DEFAULT_OUTPUT_XLSX: &str = "resul_data.xlsx";

// Output sheet names
pub const CATEGORY_SHEET: &str = "Sales by category";
pub const YEAR_SHEET: &str = "Sales by year";

// Source labels used in logs, metrics and errors
pub const SALES_2022_SOURCE: &str = "sales_2022";
pub const SALES_2023_SOURCE: &str = "sales_2023";
pub const PRODUCTS_SOURCE: &str = "products";

// Column labels
pub const DATE_COLUMN: &str = "date";
pub const PRODUCT_ID_COLUMN: &str = "product_id";
pub const QUANTITY_COLUMN: &str = "quantity";
pub const SALES_COLUMN: &str = "sales";
pub const CATEGORY_COLUMN: &str = "category";
pub const YEAR_COLUMN: &str = "year";

/// Sales rows missing any of these are dropped before anything else happens
pub const REQUIRED_SALES_COLUMNS: [&str; 3] = [DATE_COLUMN, PRODUCT_ID_COLUMN, QUANTITY_COLUMN];

/// Spellings read as null in delimited text
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Excel's limit on worksheet name length
pub const MAX_SHEET_NAME_LEN: usize = 31;
