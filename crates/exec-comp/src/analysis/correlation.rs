//! Pairwise-complete correlation matrices.
//!
//! Each pair of columns uses only the rows where both values are present,
//! so the clean table can be analysed without imputation bias.

use super::finite;
use crate::error::{AnalysisError, Result};
use crate::utils::column_f64_values;
use anofox_statistics::correlation::{pearson, spearman};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fewest paired observations a coefficient is reported for.
pub const MIN_PAIRED_OBSERVATIONS: usize = 3;

/// Number of off-diagonal pairs kept in [`CorrelationMatrix::strongest_pairs`].
const STRONGEST_PAIRS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    /// Rank correlation, robust to the skew of pay and size measures.
    Spearman,
}

/// Table a correlation matrix is computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CorrelationSource {
    #[default]
    Clean,
    Imputed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub column_x: String,
    pub column_y: String,
    pub estimate: f64,
    pub p_value: Option<f64>,
    pub observations: usize,
}

/// Symmetric matrix indexed like `columns`.
///
/// A cell is `None` when the pair has fewer than three complete rows or
/// either side is constant over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub p_values: Vec<Vec<Option<f64>>>,
    pub observations: Vec<Vec<usize>>,
    /// Off-diagonal pairs ordered by absolute coefficient, strongest first.
    pub strongest_pairs: Vec<CorrelationPair>,
}

impl CorrelationMatrix {
    pub fn get(&self, x: &str, y: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == x)?;
        let j = self.columns.iter().position(|c| c == y)?;
        self.values[i][j]
    }
}

pub fn correlation_matrix(
    df: &DataFrame,
    columns: &[String],
    method: CorrelationMethod,
) -> Result<CorrelationMatrix> {
    if columns.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "correlation needs at least two columns, got {}",
            columns.len()
        )));
    }

    let data = columns
        .iter()
        .map(|name| column_f64_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let k = columns.len();
    let mut values = vec![vec![None; k]; k];
    let mut p_values = vec![vec![None; k]; k];
    let mut observations = vec![vec![0; k]; k];
    let mut pairs = Vec::new();

    for i in 0..k {
        let present = data[i].iter().flatten().count();
        observations[i][i] = present;
        if present >= MIN_PAIRED_OBSERVATIONS {
            values[i][i] = Some(1.0);
            p_values[i][i] = Some(0.0);
        }

        for j in (i + 1)..k {
            let (x, y) = pairwise_complete(&data[i], &data[j]);
            let n = x.len();
            observations[i][j] = n;
            observations[j][i] = n;

            let Some((r, p)) = correlate(&x, &y, method) else {
                debug!(
                    "No correlation for '{}' x '{}' ({} paired rows)",
                    columns[i], columns[j], n
                );
                continue;
            };

            values[i][j] = Some(r);
            values[j][i] = Some(r);
            p_values[i][j] = p;
            p_values[j][i] = p;
            pairs.push(CorrelationPair {
                column_x: columns[i].clone(),
                column_y: columns[j].clone(),
                estimate: r,
                p_value: p,
                observations: n,
            });
        }
    }

    pairs.sort_by(|a, b| {
        b.estimate
            .abs()
            .partial_cmp(&a.estimate.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(STRONGEST_PAIRS);

    Ok(CorrelationMatrix {
        method,
        columns: columns.to_vec(),
        values,
        p_values,
        observations,
        strongest_pairs: pairs,
    })
}

/// Rows where both sides are present.
pub fn pairwise_complete(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip()
}

/// Coefficient and two-sided p-value for complete pairs, `None` below the
/// observation floor or when either side has no variance.
pub fn correlate(x: &[f64], y: &[f64], method: CorrelationMethod) -> Option<(f64, Option<f64>)> {
    if x.len() < MIN_PAIRED_OBSERVATIONS || x.len() != y.len() || is_constant(x) || is_constant(y)
    {
        return None;
    }

    let (estimate, p_value) = match method {
        CorrelationMethod::Pearson => pearson(x, y, None)
            .ok()
            .map(|result| (result.estimate, result.p_value))?,
        CorrelationMethod::Spearman => spearman(x, y, None)
            .ok()
            .map(|result| (result.estimate, result.p_value))?,
    };

    let estimate = finite(estimate)?.clamp(-1.0, 1.0);
    let p_value = if estimate.abs() >= 1.0 {
        Some(0.0)
    } else {
        finite(p_value)
    };
    Some((estimate, p_value))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}
