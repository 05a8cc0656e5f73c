//! Accounting-format numeric parsing.
//!
//! Spreadsheet exports write thousands separators (`1,234.5`) and show
//! negatives in parentheses (`(1,234.5)`). These helpers turn such cells
//! into signed floats; anything unparseable becomes missing.

use crate::error::{AnalysisError, Result};
use crate::utils::{column_names, is_numeric_dtype, strip_numeric_formatting};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// `(1,234.50)`, `($1,234.50)` or `$(1,234.50)`.
static ACCOUNTING_NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[$€£]?\(\s*[$€£]?\s*((?:\d[\d,]*)?(?:\.\d*)?)\s*\)$")
        .expect("accounting negative pattern is valid")
});

/// How a single cell was interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellParse {
    Missing,
    Value(f64),
    AccountingNegative(f64),
    /// Present but not a number; treated as missing.
    Unparseable,
}

impl CellParse {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) | Self::AccountingNegative(v) => Some(v),
            Self::Missing | Self::Unparseable => None,
        }
    }
}

/// Classify one raw cell.
pub fn parse_cell(raw: Option<&str>) -> CellParse {
    let Some(raw) = raw else {
        return CellParse::Missing;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellParse::Missing;
    }

    if let Some(captures) = ACCOUNTING_NEGATIVE.captures(trimmed) {
        let digits = captures[1].replace(',', "");
        return match digits.parse::<f64>() {
            Ok(v) if v.is_finite() => CellParse::AccountingNegative(-v),
            _ => CellParse::Unparseable,
        };
    }

    match strip_numeric_formatting(trimmed).parse::<f64>() {
        Ok(v) if v.is_finite() => CellParse::Value(v),
        _ => CellParse::Unparseable,
    }
}

/// Convert one raw cell to a signed float, or `None` for missing.
///
/// ```rust,ignore
/// assert_eq!(sanitize_cell(Some("(1,234.50)")), Some(-1234.5));
/// assert_eq!(sanitize_cell(Some("1,234.50")), Some(1234.5));
/// assert_eq!(sanitize_cell(Some("")), None);
/// ```
pub fn sanitize_cell(raw: Option<&str>) -> Option<f64> {
    parse_cell(raw).value()
}

/// Per-column counts from a sanitizer pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    pub column: String,
    /// Cells that became numbers.
    pub parsed: usize,
    /// Cells that were parenthesized negatives.
    pub accounting_negatives: usize,
    /// Present cells that failed to parse and became missing.
    pub degraded: usize,
}

#[derive(Debug)]
pub struct SanitizeOutcome {
    pub table: DataFrame,
    pub reports: Vec<SanitizeReport>,
    /// Listed columns absent from the table.
    pub skipped: Vec<AnalysisError>,
}

/// Converts designated columns to `Float64`.
pub struct NumericSanitizer;

impl NumericSanitizer {
    /// Produce a copy of `df` with each listed column converted to floats.
    ///
    /// Columns that are already numeric are only cast, so running the
    /// sanitizer twice gives the same table.
    pub fn sanitize(&self, df: &DataFrame, numeric_columns: &[String]) -> Result<SanitizeOutcome> {
        let mut table = df.clone();
        let mut reports = Vec::new();
        let mut skipped = Vec::new();
        let present = column_names(df);

        for name in numeric_columns {
            if !present.contains(name) {
                warn!("Numeric column '{}' not found, skipping", name);
                skipped.push(AnalysisError::schema(name, "numeric column not present"));
                continue;
            }

            let series = table.column(name)?.as_materialized_series().clone();
            let (converted, report) = sanitize_series(&series)?;

            if report.degraded > 0 {
                warn!(
                    "'{}': {} cells could not be parsed and are now missing",
                    name, report.degraded
                );
            }
            debug!(
                "'{}': {} parsed, {} accounting negatives",
                name, report.parsed, report.accounting_negatives
            );

            table.replace(name, converted)?;
            reports.push(report);
        }

        Ok(SanitizeOutcome {
            table,
            reports,
            skipped,
        })
    }
}

/// Convert a single series to `Float64`.
pub fn sanitize_series(series: &Series) -> Result<(Series, SanitizeReport)> {
    let mut report = SanitizeReport {
        column: series.name().to_string(),
        ..SanitizeReport::default()
    };

    let values: Vec<Option<f64>> = if is_numeric_dtype(series.dtype()) {
        let casted = series.cast(&DataType::Float64)?;
        casted
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(v) if v.is_finite() => {
                    report.parsed += 1;
                    Some(v)
                }
                Some(_) => {
                    report.degraded += 1;
                    None
                }
                None => None,
            })
            .collect()
    } else {
        let casted = series.cast(&DataType::String)?;
        casted
            .str()?
            .into_iter()
            .map(|raw| {
                let parsed = parse_cell(raw);
                match parsed {
                    CellParse::Value(_) => report.parsed += 1,
                    CellParse::AccountingNegative(_) => {
                        report.parsed += 1;
                        report.accounting_negatives += 1;
                    }
                    CellParse::Unparseable => report.degraded += 1,
                    CellParse::Missing => {}
                }
                parsed.value()
            })
            .collect()
    };

    Ok((Series::new(series.name().clone(), values), report))
}
