//! CEO Compensation Analysis Library
//!
//! Cleans a spreadsheet export of company financials and CEO pay, fills
//! its gaps, and runs exploratory statistics over the result.
//!
//! # Overview
//!
//! Data flows one way through four preparation stages and an analysis layer:
//!
//! - **Loading**: delimited text into a string table; empty cells and
//!   missing tokens (`N/A`, `#N/A`, ...) become null
//! - **Column Normalization**: raw headers like `"CEO Pay ($M)"` renamed to
//!   canonical identifiers like `ceo_pay`
//! - **Numeric Sanitization**: `"1,234.50"` becomes `1234.5` and the
//!   accounting negative `"(1,234.50)"` becomes `-1234.5`; anything else
//!   unparseable becomes missing. The result is the *clean table*.
//! - **Imputation**: numeric gaps filled with the column median, categorical
//!   gaps with the most frequent value. The result is the *imputed table*.
//! - **Analysis**: descriptive statistics, pairwise-complete correlation,
//!   group summaries, OLS regression and two-sample / k-sample tests
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use exec_comp::{Pipeline, PipelineConfig};
//! use exec_comp::reporting::print_summary;
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::ceo_compensation())
//!     .build()?;
//!
//! let (prepared, report) = pipeline.run_path("data/ceo_pay.csv")?;
//!
//! println!("{} missing cells filled", prepared.summary.column_summaries
//!     .iter()
//!     .map(|c| c.imputed_count())
//!     .sum::<usize>());
//! print_summary(&report);
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to describe a different spreadsheet layout:
//!
//! ```rust,ignore
//! use exec_comp::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .rename("Revenue ($M)", "revenue")
//!     .rename("Sector", "industry")
//!     .numeric_columns(["revenue"])
//!     .categorical_columns(["industry"])
//!     .missing_token("--")
//!     .degenerate_policy(DegenerateColumnPolicy::Exclude)
//!     .build()?;
//! ```

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{ColumnNormalizer, NumericSanitizer, sanitize_cell};
pub use config::{
    AnalysisConfig, ConfigValidationError, DegenerateColumnPolicy, PipelineConfig,
    PipelineConfigBuilder,
};
pub use error::{AnalysisError, Result, ResultExt};
pub use imputers::StatisticalImputer;
pub use loader::TableLoader;
pub use pipeline::{Pipeline, PipelineBuilder, PreparedData};
pub use reporting::{AnalysisReport, ReportGenerator, print_summary};
pub use types::{
    ActionType, ColumnKind, ColumnSummary, FillValue, PreparationAction, PreparationSummary,
};
