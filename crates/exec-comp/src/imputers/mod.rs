//! Imputation module for handling missing values.
//!
//! Provides median/mode imputation that turns the clean table into the
//! imputed table.

pub mod statistical;

pub use statistical::{ColumnFill, ImputationOutcome, StatisticalImputer};
