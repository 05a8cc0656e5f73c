//! Configuration types for the cleaning and analysis pipeline.
//!
//! Everything the pipeline needs to know about a spreadsheet lives here:
//! the rename table, which columns are numeric or categorical, the tokens
//! that mean "missing", and which analyses to run. Configurations are
//! serde-serializable so they can be loaded from a JSON file.

use crate::analysis::correlation::{CorrelationMethod, CorrelationSource};
use crate::analysis::testing::TTestKind;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tokens treated as missing by default (compared trimmed, case-insensitively).
pub const DEFAULT_MISSING_TOKENS: [&str; 6] = ["N/A", "NA", "#N/A", "NULL", "NaN", "None"];

/// What to do when a listed column has no values to derive a fill from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DegenerateColumnPolicy {
    /// Fail the whole pipeline with a degenerate-column error.
    #[default]
    Abort,
    /// Leave the column unimputed (missing values retained) and carry on.
    Exclude,
}

/// A single raw-header to canonical-identifier rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

impl ColumnRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Multiple linear regression of one numeric column against others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSpec {
    pub target: String,
    pub predictors: Vec<String>,
    /// Z-score every predictor before fitting.
    #[serde(default = "default_true")]
    pub standardize: bool,
}

/// Mean/median/count of a numeric column per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummarySpec {
    pub value: String,
    pub by: String,
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
}

/// Compare `value` between rows above and at-or-below the median of `split_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedianSplitSpec {
    pub value: String,
    pub split_on: String,
}

/// Welch ANOVA (and Kruskal-Wallis) of `value` across the categories of `factor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorTestSpec {
    pub value: String,
    pub factor: String,
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_min_group_size() -> usize {
    5
}

/// Which analyses the report runs on the prepared tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Table the correlation matrix is computed on.
    /// Default: Clean (pairwise-complete observations)
    pub correlation_source: CorrelationSource,

    /// Default: Pearson
    pub correlation_method: CorrelationMethod,

    /// Columns for the correlation matrix. Empty means every numeric column.
    pub correlation_columns: Vec<String>,

    /// Default: Welch
    pub t_test_kind: TTestKind,

    /// Number of most frequent categories listed per categorical column.
    /// Default: 10
    pub top_categories: usize,

    pub regression: Option<RegressionSpec>,
    pub group_summaries: Vec<GroupSummarySpec>,
    pub median_splits: Vec<MedianSplitSpec>,
    pub factor_tests: Vec<FactorTestSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            correlation_source: CorrelationSource::default(),
            correlation_method: CorrelationMethod::default(),
            correlation_columns: Vec::new(),
            t_test_kind: TTestKind::default(),
            top_categories: 10,
            regression: None,
            group_summaries: Vec::new(),
            median_splits: Vec::new(),
            factor_tests: Vec::new(),
        }
    }
}

/// Configuration for the pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API, or [`PipelineConfig::ceo_compensation()`] for the
/// built-in CEO pay spreadsheet layout.
///
/// # Example
///
/// ```rust,ignore
/// use exec_comp::config::{DegenerateColumnPolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .rename("Revenue ($M)", "revenue")
///     .numeric_columns(["revenue"])
///     .categorical_columns(["industry"])
///     .missing_token("N/A")
///     .degenerate_policy(DegenerateColumnPolicy::Exclude)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ordered rename table applied by the column normalizer.
    pub renames: Vec<ColumnRename>,

    /// Canonical names of columns sanitized to numbers and median-imputed.
    pub numeric_columns: Vec<String>,

    /// Canonical names of columns mode-imputed.
    pub categorical_columns: Vec<String>,

    /// Cell values treated as missing by the loader, besides empty cells.
    pub missing_tokens: Vec<String>,

    /// Field delimiter of the input file.
    /// Default: ','
    pub delimiter: char,

    /// Default: Abort
    pub degenerate_policy: DegenerateColumnPolicy,

    /// Output directory for reports and table dumps.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Write the clean and imputed tables as CSV next to the report.
    /// Default: false
    pub save_tables: bool,

    pub analysis: AnalysisConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            renames: Vec::new(),
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            missing_tokens: DEFAULT_MISSING_TOKENS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            delimiter: ',',
            degenerate_policy: DegenerateColumnPolicy::default(),
            output_dir: PathBuf::from("output"),
            save_tables: false,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Fields missing from the file take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees an ASCII delimiter
        self.delimiter as u8
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !self.delimiter.is_ascii() || self.delimiter == '"' || self.delimiter == '\n' {
            return Err(ConfigValidationError::InvalidDelimiter(self.delimiter));
        }

        let mut sources = HashSet::new();
        for rename in &self.renames {
            if rename.from.trim().is_empty() || rename.to.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName);
            }
            if !sources.insert(rename.from.as_str()) {
                return Err(ConfigValidationError::DuplicateRename(rename.from.clone()));
            }
        }

        let numeric: HashSet<&str> = self.numeric_columns.iter().map(|s| s.as_str()).collect();
        if let Some(overlap) = self
            .categorical_columns
            .iter()
            .find(|c| numeric.contains(c.as_str()))
        {
            return Err(ConfigValidationError::OverlappingColumnKinds(overlap.clone()));
        }

        if self
            .numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .any(|c| c.trim().is_empty())
        {
            return Err(ConfigValidationError::EmptyColumnName);
        }

        self.analysis.validate()
    }
}

impl AnalysisConfig {
    fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if let Some(regression) = &self.regression
            && regression.predictors.is_empty()
        {
            return Err(ConfigValidationError::EmptyRegression(
                regression.target.clone(),
            ));
        }

        for spec in &self.group_summaries {
            if spec.min_group_size == 0 {
                return Err(ConfigValidationError::InvalidMinGroupSize {
                    field: format!("group_summaries[{} by {}]", spec.value, spec.by),
                    value: spec.min_group_size,
                });
            }
        }

        for spec in &self.factor_tests {
            if spec.min_group_size < 2 {
                return Err(ConfigValidationError::InvalidMinGroupSize {
                    field: format!("factor_tests[{} by {}]", spec.value, spec.factor),
                    value: spec.min_group_size,
                });
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid delimiter {0:?} (must be a single ASCII character other than quote or newline)")]
    InvalidDelimiter(char),

    #[error("Column names in the configuration must not be empty")]
    EmptyColumnName,

    #[error("Header '{0}' appears more than once in the rename table")]
    DuplicateRename(String),

    #[error("Column '{0}' is listed as both numeric and categorical")]
    OverlappingColumnKinds(String),

    #[error("Regression of '{0}' needs at least one predictor")]
    EmptyRegression(String),

    #[error("Invalid minimum group size for '{field}': {value}")]
    InvalidMinGroupSize { field: String, value: usize },
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    renames: Vec<ColumnRename>,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    missing_tokens: Option<Vec<String>>,
    delimiter: Option<char>,
    degenerate_policy: Option<DegenerateColumnPolicy>,
    output_dir: Option<PathBuf>,
    save_tables: Option<bool>,
    analysis: Option<AnalysisConfig>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            renames: config.renames,
            numeric_columns: config.numeric_columns,
            categorical_columns: config.categorical_columns,
            missing_tokens: Some(config.missing_tokens),
            delimiter: Some(config.delimiter),
            degenerate_policy: Some(config.degenerate_policy),
            output_dir: Some(config.output_dir),
            save_tables: Some(config.save_tables),
            analysis: Some(config.analysis),
        }
    }

    /// Append a single rename to the rename table.
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.push(ColumnRename::new(from, to));
        self
    }

    /// Replace the rename table.
    pub fn renames(mut self, renames: Vec<ColumnRename>) -> Self {
        self.renames = renames;
        self
    }

    pub fn numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn categorical_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the missing-token list (the defaults are dropped).
    pub fn missing_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_tokens = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Add one token to the missing-token list (keeps the defaults).
    pub fn missing_token(mut self, token: impl Into<String>) -> Self {
        let tokens = self.missing_tokens.get_or_insert_with(|| {
            DEFAULT_MISSING_TOKENS
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        tokens.push(token.into());
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set how entirely-missing columns are treated during imputation.
    pub fn degenerate_policy(mut self, policy: DegenerateColumnPolicy) -> Self {
        self.degenerate_policy = Some(policy);
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Enable or disable writing the clean and imputed tables as CSV.
    pub fn save_tables(mut self, save: bool) -> Self {
        self.save_tables = Some(save);
        self
    }

    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            renames: self.renames,
            numeric_columns: self.numeric_columns,
            categorical_columns: self.categorical_columns,
            missing_tokens: self.missing_tokens.unwrap_or(defaults.missing_tokens),
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            degenerate_policy: self.degenerate_policy.unwrap_or_default(),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            save_tables: self.save_tables.unwrap_or(false),
            analysis: self.analysis.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.degenerate_policy, DegenerateColumnPolicy::Abort);
        assert!(config.missing_tokens.iter().any(|t| t == "N/A"));
        assert!(!config.save_tables);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .rename("Revenue ($M)", "revenue")
            .numeric_columns(["revenue"])
            .categorical_columns(["industry"])
            .missing_tokens(["-"])
            .delimiter(';')
            .degenerate_policy(DegenerateColumnPolicy::Exclude)
            .build()
            .unwrap();

        assert_eq!(config.renames, vec![ColumnRename::new("Revenue ($M)", "revenue")]);
        assert_eq!(config.missing_tokens, vec!["-".to_string()]);
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.degenerate_policy, DegenerateColumnPolicy::Exclude);
    }

    #[test]
    fn test_missing_token_keeps_defaults() {
        let config = PipelineConfig::builder().missing_token("--").build().unwrap();
        assert!(config.missing_tokens.iter().any(|t| t == "--"));
        assert!(config.missing_tokens.iter().any(|t| t == "N/A"));
    }

    #[test]
    fn test_validation_overlapping_kinds() {
        let result = PipelineConfig::builder()
            .numeric_columns(["revenue"])
            .categorical_columns(["revenue"])
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::OverlappingColumnKinds(col) if col == "revenue"
        ));
    }

    #[test]
    fn test_validation_duplicate_rename() {
        let result = PipelineConfig::builder()
            .rename("Revenue", "revenue")
            .rename("Revenue", "sales")
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateRename(_)
        ));
    }

    #[test]
    fn test_validation_invalid_delimiter() {
        let result = PipelineConfig::builder().delimiter('é').build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDelimiter('é')
        ));
    }

    #[test]
    fn test_validation_empty_regression() {
        let analysis = AnalysisConfig {
            regression: Some(RegressionSpec {
                target: "ceo_pay".to_string(),
                predictors: Vec::new(),
                standardize: true,
            }),
            ..AnalysisConfig::default()
        };
        let result = PipelineConfig::builder().analysis(analysis).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyRegression(_)
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "renames": [{"from": "CEO Pay ($M)", "to": "ceo_pay"}],
            "numeric_columns": ["ceo_pay"],
            "degenerate_policy": "Exclude",
            "analysis": {
                "median_splits": [{"value": "ceo_pay", "split_on": "market_cap"}],
                "group_summaries": [{"value": "ceo_pay", "by": "industry"}]
            }
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.degenerate_policy, DegenerateColumnPolicy::Exclude);
        assert_eq!(config.analysis.group_summaries[0].min_group_size, 5);
        assert_eq!(config.analysis.top_categories, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip_through_builder() {
        let config = PipelineConfig::ceo_compensation();
        let rebuilt = PipelineConfigBuilder::from_config(config.clone())
            .build()
            .unwrap();
        assert_eq!(config, rebuilt);
    }
}
