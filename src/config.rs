use crate::constants::{
    CATEGORY_SHEET, DEFAULT_OUTPUT_XLSX, DEFAULT_PRODUCTS_JSON, DEFAULT_SALES_2022_CSV,
    DEFAULT_SALES_2023_XLSX, MAX_SHEET_NAME_LEN, YEAR_SHEET,
};
use crate::error::{ConsolidationError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Full configuration for one consolidation run. Every field has a default,
/// so an empty TOML file reproduces the built-in job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    pub sources: SourcesConfig,
    pub output: OutputConfig,
    pub aggregation: AggregationConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub sales_2022_csv: PathBuf,
    pub sales_2023_xlsx: PathBuf,
    /// Worksheet to read from the 2023 workbook; the first one when unset
    pub sales_2023_sheet: Option<String>,
    pub products_json: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sales_2022_csv: PathBuf::from(DEFAULT_SALES_2022_CSV),
            sales_2023_xlsx: PathBuf::from(DEFAULT_SALES_2023_XLSX),
            sales_2023_sheet: None,
            products_json: PathBuf::from(DEFAULT_PRODUCTS_JSON),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub category_sheet: String,
    pub year_sheet: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_XLSX),
            category_sheet: CATEGORY_SHEET.to_string(),
            year_sheet: YEAR_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub unmatched_category: UnmatchedCategoryPolicy,
}

/// What Sales-by-category does with rows that carry no category, either
/// because the product is unknown or because its category is null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedCategoryPolicy {
    /// Leave them out of the category aggregate
    #[default]
    Exclude,
    /// Collect them under this label
    Group(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus exposition written here after the run, when set
    pub prometheus_textfile: Option<PathBuf>,
}

impl ConsolidationConfig {
    /// Load from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConsolidationError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ConsolidationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConsolidationError::Config(format!("Failed to render config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        validate_sheet_name(&self.output.category_sheet)?;
        validate_sheet_name(&self.output.year_sheet)?;

        if self
            .output
            .category_sheet
            .eq_ignore_ascii_case(&self.output.year_sheet)
        {
            return Err(ConsolidationError::Config(format!(
                "Output sheets must have distinct names, both are '{}'",
                self.output.year_sheet
            )));
        }

        if let UnmatchedCategoryPolicy::Group(label) = &self.aggregation.unmatched_category {
            if label.trim().is_empty() {
                return Err(ConsolidationError::Config(
                    "Unmatched category group label must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConsolidationError::Config(
            "Sheet name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(ConsolidationError::Config(format!(
            "Sheet name '{}' is longer than {} characters",
            name, MAX_SHEET_NAME_LEN
        )));
    }
    if let Some(c) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        return Err(ConsolidationError::Config(format!(
            "Sheet name '{}' contains forbidden character '{}'",
            name, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ConsolidationConfig::from_toml_str("").unwrap();
        assert_eq!(config, ConsolidationConfig::default());
        assert_eq!(config.output.category_sheet, "Sales by category");
        assert_eq!(config.output.path, PathBuf::from("resul_data.xlsx"));
        assert_eq!(
            config.aggregation.unmatched_category,
            UnmatchedCategoryPolicy::Exclude
        );
    }

    #[test]
    fn test_partial_override() {
        let config = ConsolidationConfig::from_toml_str(
            r#"
            [sources]
            products_json = "data/products.json"
            sales_2023_sheet = "2023"

            [aggregation]
            unmatched_category = { group = "unknown" }
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.products_json, PathBuf::from("data/products.json"));
        assert_eq!(config.sources.sales_2023_sheet.as_deref(), Some("2023"));
        assert_eq!(
            config.sources.sales_2022_csv,
            PathBuf::from(DEFAULT_SALES_2022_CSV)
        );
        assert_eq!(
            config.aggregation.unmatched_category,
            UnmatchedCategoryPolicy::Group("unknown".to_string())
        );
    }

    #[test]
    fn test_rejects_bad_sheet_names() {
        let too_long = ConsolidationConfig::from_toml_str(
            "[output]\ncategory_sheet = \"This sheet name is far too long for Excel\"",
        );
        assert!(matches!(too_long, Err(ConsolidationError::Config(_))));

        let forbidden = ConsolidationConfig::from_toml_str("[output]\nyear_sheet = \"a/b\"");
        assert!(matches!(forbidden, Err(ConsolidationError::Config(_))));

        let same = ConsolidationConfig::from_toml_str(
            "[output]\ncategory_sheet = \"Totals\"\nyear_sheet = \"totals\"",
        );
        assert!(matches!(same, Err(ConsolidationError::Config(_))));
    }

    #[test]
    fn test_rejects_blank_group_label() {
        let result = ConsolidationConfig::from_toml_str(
            "[aggregation]\nunmatched_category = { group = \"  \" }",
        );
        assert!(matches!(result, Err(ConsolidationError::Config(_))));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = ConsolidationConfig::default();
        config.aggregation.unmatched_category = UnmatchedCategoryPolicy::Group("n/a".into());
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(ConsolidationConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = ConsolidationConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConsolidationError::Config(_))));
    }
}
