//! Shared utilities for the cleaning and analysis pipeline.
//!
//! Column extraction helpers, string parsing helpers and the small
//! order-statistics routines used by both the imputer and the analysis
//! layer.

use crate::error::{AnalysisError, Result};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Names of all columns, in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

// =============================================================================
// Column Extraction
// =============================================================================

/// Read a column as optional floats (null stays `None`).
pub fn column_f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))?;
    let casted = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Read a column as optional strings (null stays `None`).
pub fn column_string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))?;
    let casted = column.as_materialized_series().cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Currency symbols tolerated in front of a number.
pub const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];

/// Check if a cell is empty or equals one of the missing tokens.
///
/// Comparison is on the trimmed value and ignores ASCII case, so `"n/a"`
/// matches a configured `"N/A"`.
pub fn is_missing_token(value: &str, tokens: &[String]) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || tokens.iter().any(|t| t.trim().eq_ignore_ascii_case(trimmed))
}

/// Remove thousands separators and one leading currency symbol, which may
/// sit on either side of a sign.
///
/// ```rust,ignore
/// assert_eq!(strip_numeric_formatting("$1,234.50"), "1234.50");
/// assert_eq!(strip_numeric_formatting("-$1,000"), "-1000");
/// ```
pub fn strip_numeric_formatting(value: &str) -> String {
    let trimmed = value.trim();
    let (sign, rest) = match trimmed.strip_prefix(['-', '+']) {
        Some(rest) => (&trimmed[..1], rest.trim_start()),
        None => ("", trimmed),
    };
    let unsigned = rest
        .strip_prefix(|c: char| CURRENCY_SYMBOLS.contains(&c))
        .unwrap_or(rest)
        .trim_start();
    format!("{}{}", sign, unsigned.replace(',', ""))
}

// =============================================================================
// Order Statistics
// =============================================================================

/// Linear-interpolated quantile of already sorted values.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(values[lower]);
    }
    let weight = pos - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

/// Sort a copy of the values (NaN-free input assumed).
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Median of the values; the midpoint of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted_copy(values), 0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance (n - 1 denominator).
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0))
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Most frequent non-missing value; ties go to the value seen first.
///
/// Returns the value and its frequency.
pub fn first_seen_mode<'a, I>(values: I) -> Option<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    // value -> (count, first position)
    let mut counts: HashMap<&'a str, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        if let Some(value) = value {
            counts.entry(value).or_insert((0, position)).0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, (count, _))| (value.to_string(), count))
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let casted = series.cast(&DataType::Float64)?;
    let filled: Vec<Option<f64>> = casted
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let casted = series.cast(&DataType::String)?;
    let filled: Vec<Option<String>> = casted
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Share of non-null cells in the table (1.0 for an empty table).
pub fn completeness(df: &DataFrame) -> f64 {
    let cells = df.height() * df.width();
    if cells == 0 {
        return 1.0;
    }
    let nulls: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
    1.0 - nulls as f64 / cells as f64
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing_token() {
        let tokens = vec!["N/A".to_string(), "#N/A".to_string()];
        assert!(is_missing_token("", &tokens));
        assert!(is_missing_token("   ", &tokens));
        assert!(is_missing_token("n/a", &tokens));
        assert!(is_missing_token(" #N/A ", &tokens));
        assert!(!is_missing_token("0", &tokens));
        assert!(!is_missing_token("NY", &tokens));
    }

    #[test]
    fn test_strip_numeric_formatting() {
        assert_eq!(strip_numeric_formatting("1,234.50"), "1234.50");
        assert_eq!(strip_numeric_formatting(" $1,000 "), "1000");
        assert_eq!(strip_numeric_formatting("-2,500"), "-2500");
        assert_eq!(strip_numeric_formatting("-$1,000"), "-1000");
        assert_eq!(strip_numeric_formatting("+ €12"), "+12");
        assert_eq!(strip_numeric_formatting("abc"), "abc");
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[7.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[1000.0, -500.0, 2500.0, 1000.0]), Some(1000.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quantile_sorted_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(2.0));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(4.0));
        assert_eq!(quantile_sorted(&[1.0, 2.0], 0.25), Some(1.25));
    }

    #[test]
    fn test_sample_std() {
        // mean 3, squared deviations sum 10, / 4 = 2.5
        let std = sample_std(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[5.0]), None);
    }

    #[test]
    fn test_first_seen_mode_breaks_ties_by_position() {
        let values = [Some("B"), Some("A"), None, Some("A"), Some("B")];
        assert_eq!(first_seen_mode(values), Some(("B".to_string(), 2)));

        let values = [Some("A"), Some("B"), Some("A"), None];
        assert_eq!(first_seen_mode(values), Some(("A".to_string(), 2)));

        let values: [Option<&str>; 2] = [None, None];
        assert_eq!(first_seen_mode(values), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.5).unwrap();
        let values: Vec<Option<f64>> = filled.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.0), Some(0.5), Some(3.0)]);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("test".into(), &[Some("CA"), None]);
        let filled = fill_string_nulls(&series, "NY").unwrap();
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.str().unwrap().get(1), Some("NY"));
    }

    #[test]
    fn test_column_values_and_completeness() {
        let df = df![
            "x" => [Some(1.0), None],
            "y" => [Some("a"), Some("b")],
        ]
        .unwrap();

        assert_eq!(column_f64_values(&df, "x").unwrap(), vec![Some(1.0), None]);
        assert_eq!(
            column_string_values(&df, "y").unwrap(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
        assert!(matches!(
            column_f64_values(&df, "z"),
            Err(AnalysisError::ColumnNotFound(_))
        ));
        assert!((completeness(&df) - 0.75).abs() < 1e-12);
    }
}
