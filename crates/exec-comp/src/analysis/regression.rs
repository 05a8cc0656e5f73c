//! Ordinary least squares regression.
//!
//! Fits `target ~ 1 + predictors` on the rows where the target and every
//! predictor are present. With standardization on, each predictor is
//! z-scored over those rows first so coefficients are comparable; the
//! target keeps its original units.

use super::{f_upper_tail, finite, student_t_two_sided};
use crate::error::{AnalysisError, Result};
use crate::utils::{column_f64_values, mean, sample_std};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Relative pivot size below which X'X is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

pub const INTERCEPT: &str = "(Intercept)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    /// `None` when the standard error is zero (perfect fit).
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
}

/// Centering and scaling applied to a predictor before fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorScaling {
    pub column: String,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    pub target: String,
    pub predictors: Vec<String>,
    pub standardized: bool,
    /// Complete rows used for the fit.
    pub observations: usize,
    /// Intercept first, then one entry per predictor.
    pub coefficients: Vec<Coefficient>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub residual_std_error: f64,
    pub f_statistic: Option<f64>,
    pub f_p_value: Option<f64>,
    pub df_model: usize,
    pub df_residual: usize,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Empty unless `standardized`.
    pub predictor_scaling: Vec<PredictorScaling>,
}

impl RegressionFit {
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }
}

/// Fit an OLS model.
///
/// # Errors
///
/// - [`AnalysisError::InvalidConfig`] with no predictors
/// - [`AnalysisError::ColumnNotFound`] for an unknown column
/// - [`AnalysisError::InsufficientData`] when complete rows do not exceed
///   the number of estimated parameters
/// - [`AnalysisError::Analysis`] for a constant target, a constant
///   predictor under standardization, or collinear predictors
pub fn fit_ols(
    df: &DataFrame,
    target: &str,
    predictors: &[String],
    standardize: bool,
) -> Result<RegressionFit> {
    if predictors.is_empty() {
        return Err(AnalysisError::InvalidConfig(
            "regression needs at least one predictor".to_string(),
        ));
    }

    let y_all = column_f64_values(df, target)?;
    let x_all = predictors
        .iter()
        .map(|p| column_f64_values(df, p))
        .collect::<Result<Vec<_>>>()?;

    // listwise deletion
    let mut y = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); predictors.len()];
    'rows: for (row, target_value) in y_all.iter().enumerate() {
        let Some(target_value) = target_value else {
            continue;
        };
        let mut values = Vec::with_capacity(predictors.len());
        for x in &x_all {
            match x[row] {
                Some(v) => values.push(v),
                None => continue 'rows,
            }
        }
        y.push(*target_value);
        for (column, v) in columns.iter_mut().zip(values) {
            column.push(v);
        }
    }

    let n = y.len();
    let p = predictors.len();
    if n <= p + 1 {
        return Err(AnalysisError::InsufficientData(format!(
            "regression of '{}' on {} predictors needs more than {} complete rows, got {}",
            target,
            p,
            p + 1,
            n
        )));
    }
    debug!("Fitting '{}' on {} predictors with {} rows", target, p, n);

    let y_mean = mean(&y).unwrap_or(0.0);
    let ss_total: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if ss_total <= 0.0 {
        return Err(AnalysisError::Analysis(format!(
            "target '{}' is constant over the complete rows",
            target
        )));
    }

    let mut predictor_scaling = Vec::new();
    if standardize {
        for (name, column) in predictors.iter().zip(columns.iter_mut()) {
            let scaling = standardize_column(name, column)?;
            predictor_scaling.push(scaling);
        }
    }

    // design matrix stored column-major: intercept then predictors
    let mut design = Vec::with_capacity(p + 1);
    design.push(vec![1.0; n]);
    design.extend(columns);

    let xtx: Vec<Vec<f64>> = design
        .iter()
        .map(|a| design.iter().map(|b| dot(a, b)).collect())
        .collect();
    let xty: Vec<f64> = design.iter().map(|a| dot(a, &y)).collect();
    let xtx_inv = invert(&xtx).ok_or_else(|| {
        AnalysisError::Analysis(format!(
            "predictors of '{}' are collinear or constant",
            target
        ))
    })?;

    let beta: Vec<f64> = xtx_inv.iter().map(|row| dot(row, &xty)).collect();

    let fitted: Vec<f64> = (0..n)
        .map(|i| design.iter().zip(&beta).map(|(col, b)| col[i] * b).sum())
        .collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, b)| a - b).collect();
    let ss_residual: f64 = residuals.iter().map(|r| r * r).sum();

    let df_residual = n - p - 1;
    let mse = ss_residual / df_residual as f64;
    let r_squared = 1.0 - ss_residual / ss_total;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_residual as f64;

    let mut terms = Vec::with_capacity(p + 1);
    terms.push(INTERCEPT.to_string());
    terms.extend(predictors.iter().cloned());

    let coefficients = terms
        .into_iter()
        .zip(&beta)
        .enumerate()
        .map(|(i, (term, &estimate))| {
            let std_error = (mse * xtx_inv[i][i]).max(0.0).sqrt();
            let t_statistic = if std_error > 0.0 {
                finite(estimate / std_error)
            } else {
                None
            };
            Coefficient {
                term,
                estimate,
                std_error,
                t_statistic,
                p_value: t_statistic.and_then(|t| student_t_two_sided(t, df_residual as f64)),
            }
        })
        .collect();

    let ss_model = ss_total - ss_residual;
    let f_statistic = if mse > 0.0 {
        finite((ss_model / p as f64) / mse)
    } else {
        None
    };
    let f_p_value = f_statistic.and_then(|f| f_upper_tail(f, p as f64, df_residual as f64));

    Ok(RegressionFit {
        target: target.to_string(),
        predictors: predictors.to_vec(),
        standardized: standardize,
        observations: n,
        coefficients,
        r_squared,
        adj_r_squared,
        residual_std_error: mse.sqrt(),
        f_statistic,
        f_p_value,
        df_model: p,
        df_residual,
        fitted,
        residuals,
        predictor_scaling,
    })
}

fn standardize_column(name: &str, column: &mut [f64]) -> Result<PredictorScaling> {
    let center = mean(column).unwrap_or(0.0);
    let scale = sample_std(column).unwrap_or(0.0);
    if !(scale > 0.0) {
        return Err(AnalysisError::Analysis(format!(
            "predictor '{}' is constant and cannot be standardized",
            name
        )));
    }
    for v in column.iter_mut() {
        *v = (*v - center) / scale;
    }
    Ok(PredictorScaling {
        column: name.to_string(),
        mean: center,
        std_dev: scale,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gauss-Jordan inversion with partial pivoting; `None` when singular.
fn invert(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let scale = (0..n)
        .map(|i| matrix[i][i].abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);

    let mut augmented: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut row = row.clone();
            row.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            row
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| {
                augmented[a][col]
                    .abs()
                    .partial_cmp(&augmented[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
        if augmented[pivot_row][col].abs() < SINGULAR_TOLERANCE * scale {
            return None;
        }
        augmented.swap(col, pivot_row);

        let pivot = augmented[col][col];
        for v in augmented[col].iter_mut() {
            *v /= pivot;
        }

        let pivot_values = augmented[col].clone();
        for (row, values) in augmented.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = values[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in values.iter_mut().zip(&pivot_values) {
                *v -= factor * p;
            }
        }
    }

    Some(augmented.into_iter().map(|row| row[n..].to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> DataFrame {
        df![
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "y" => [2.1, 3.9, 6.2, 7.8, 10.1],
        ]
        .unwrap()
    }

    #[test]
    fn test_simple_regression() {
        let fit = fit_ols(&sample(), "y", &names(&["x"]), false).unwrap();

        let slope = fit.coefficient("x").unwrap();
        let intercept = fit.coefficient(INTERCEPT).unwrap();
        assert!((slope.estimate - 1.99).abs() < 1e-9);
        assert!((intercept.estimate - 0.05).abs() < 1e-9);
        assert!(fit.r_squared > 0.99);
        assert_eq!(fit.df_residual, 3);
        assert!(slope.p_value.unwrap() < 0.001);
        assert!(fit.f_p_value.unwrap() < 0.001);
        assert!(fit.predictor_scaling.is_empty());
    }

    #[test]
    fn test_standardized_predictors() {
        let fit = fit_ols(&sample(), "y", &names(&["x"]), true).unwrap();

        let sd_x = 2.5f64.sqrt();
        assert!((fit.coefficient("x").unwrap().estimate - 1.99 * sd_x).abs() < 1e-9);
        // centered predictors put the intercept at the mean of the target
        assert!((fit.coefficient(INTERCEPT).unwrap().estimate - 6.02).abs() < 1e-9);
        assert_eq!(fit.predictor_scaling[0].mean, 3.0);

        let raw = fit_ols(&sample(), "y", &names(&["x"]), false).unwrap();
        assert!((fit.r_squared - raw.r_squared).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_fit_has_no_t_statistic() {
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [3.0, 5.0, 7.0, 9.0],
        ]
        .unwrap();

        let fit = fit_ols(&df, "y", &names(&["x"]), false).unwrap();
        assert!((fit.coefficient("x").unwrap().estimate - 2.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_listwise_deletion() {
        let df = df![
            "x" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)],
            "y" => [Some(1.0), Some(2.5), Some(3.0), None, Some(5.5), Some(5.0)],
        ]
        .unwrap();

        let fit = fit_ols(&df, "y", &names(&["x"]), false).unwrap();
        assert_eq!(fit.observations, 4);
        assert_eq!(fit.residuals.len(), 4);
    }

    #[test]
    fn test_insufficient_rows() {
        let df = df![
            "x" => [1.0, 2.0],
            "y" => [1.0, 3.0],
        ]
        .unwrap();
        let err = fit_ols(&df, "y", &names(&["x"]), false).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_collinear_predictors() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [2.0, 4.0, 6.0, 8.0, 10.0],
            "y" => [1.0, 3.0, 2.0, 5.0, 4.0],
        ]
        .unwrap();
        let err = fit_ols(&df, "y", &names(&["a", "b"]), false).unwrap_err();
        assert_eq!(err.error_code(), "ANALYSIS_FAILED");
    }

    #[test]
    fn test_constant_predictor_cannot_be_standardized() {
        let df = df![
            "x" => [1.0, 1.0, 1.0, 1.0],
            "y" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();
        let err = fit_ols(&df, "y", &names(&["x"]), true).unwrap_err();
        assert_eq!(err.error_code(), "ANALYSIS_FAILED");
    }

    #[test]
    fn test_constant_target() {
        let df = df![
            "x" => [1.0, 2.0, 3.0, 4.0],
            "y" => [2.0, 2.0, 2.0, 2.0],
        ]
        .unwrap();
        assert!(fit_ols(&df, "y", &names(&["x"]), false).is_err());
    }

    #[test]
    fn test_requires_predictors() {
        let err = fit_ols(&sample(), "y", &[], false).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
