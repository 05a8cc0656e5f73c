//! Data cleaning module.
//!
//! This module provides functionality for:
//! - Renaming raw spreadsheet headers to canonical identifiers
//! - Converting accounting-formatted numeric strings to signed floats
//!
//! Both stages are pure: they return a new table and leave their input
//! untouched.

mod normalizer;
mod sanitizers;

pub use normalizer::{ColumnNormalizer, NormalizeOutcome};
pub use sanitizers::{
    CellParse, NumericSanitizer, SanitizeOutcome, SanitizeReport, parse_cell, sanitize_cell,
    sanitize_series,
};
