//! Statistical imputation: column median for numeric columns, first-seen
//! mode for categorical columns.

use crate::config::DegenerateColumnPolicy;
use crate::error::{AnalysisError, Result};
use crate::types::{ColumnKind, FillValue};
use crate::utils::{column_names, fill_numeric_nulls, fill_string_nulls, first_seen_mode};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One column's imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFill {
    pub column: String,
    pub kind: ColumnKind,
    pub fill_value: FillValue,
    /// Number of missing cells replaced.
    pub filled: usize,
}

#[derive(Debug)]
pub struct ImputationOutcome {
    pub table: DataFrame,
    pub fills: Vec<ColumnFill>,
    /// Entirely-missing columns left as they were.
    pub excluded: Vec<String>,
    /// Listed columns absent from the table.
    pub skipped: Vec<AnalysisError>,
}

/// Fills missing values from statistics of the clean table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalImputer {
    policy: DegenerateColumnPolicy,
}

impl StatisticalImputer {
    pub fn new(policy: DegenerateColumnPolicy) -> Self {
        Self { policy }
    }

    /// Produce the imputed table.
    ///
    /// Numeric columns get the median of their non-missing values, and
    /// categorical columns get their most frequent value (first seen wins a
    /// tie). Unlisted columns pass through with missing values retained.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DegenerateColumn`] for a listed column with
    /// no values at all, unless the policy is
    /// [`DegenerateColumnPolicy::Exclude`].
    pub fn impute(
        &self,
        clean: &DataFrame,
        numeric_columns: &[String],
        categorical_columns: &[String],
    ) -> Result<ImputationOutcome> {
        let mut table = clean.clone();
        let mut fills = Vec::new();
        let mut excluded = Vec::new();
        let mut skipped = Vec::new();
        let present = column_names(clean);

        let listed = numeric_columns
            .iter()
            .map(|c| (c, ColumnKind::Numeric))
            .chain(categorical_columns.iter().map(|c| (c, ColumnKind::Categorical)));

        for (name, kind) in listed {
            if !present.contains(name) {
                warn!("Column '{}' not found, skipping imputation", name);
                skipped.push(AnalysisError::schema(name, "column to impute not present"));
                continue;
            }

            let series = clean.column(name)?.as_materialized_series();
            let missing = series.null_count();

            let imputed = match kind {
                ColumnKind::Numeric => Self::impute_numeric(series),
                _ => Self::impute_categorical(series),
            };

            match imputed {
                Ok((filled_series, fill_value)) => {
                    debug!("Filled {} cells in '{}' with {}", missing, name, fill_value);
                    table.replace(name, filled_series)?;
                    fills.push(ColumnFill {
                        column: name.clone(),
                        kind,
                        fill_value,
                        filled: missing,
                    });
                }
                Err(e @ AnalysisError::DegenerateColumn { .. })
                    if self.policy == DegenerateColumnPolicy::Exclude =>
                {
                    warn!("{}; column left unimputed", e);
                    excluded.push(name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Imputation complete: {} columns filled, {} excluded",
            fills.len(),
            excluded.len()
        );

        Ok(ImputationOutcome {
            table,
            fills,
            excluded,
            skipped,
        })
    }

    /// Median fill for a numeric column.
    pub fn impute_numeric(series: &Series) -> Result<(Series, FillValue)> {
        let casted = series.cast(&DataType::Float64)?;
        let fill = casted.median().ok_or_else(|| AnalysisError::DegenerateColumn {
            column: series.name().to_string(),
            statistic: "median",
        })?;

        Ok((fill_numeric_nulls(series, fill)?, FillValue::Numeric(fill)))
    }

    /// Mode fill for a categorical column.
    pub fn impute_categorical(series: &Series) -> Result<(Series, FillValue)> {
        let casted = series.cast(&DataType::String)?;
        let (mode, _) = first_seen_mode(casted.str()?.into_iter()).ok_or_else(|| {
            AnalysisError::DegenerateColumn {
                column: series.name().to_string(),
                statistic: "mode",
            }
        })?;

        let filled = fill_string_nulls(series, &mode)?;
        Ok((filled, FillValue::Categorical(mode)))
    }
}
