//! Descriptive statistics for numeric and categorical columns.

use crate::error::Result;
use crate::utils::{
    column_f64_values, column_string_values, mean, quantile_sorted, sample_std, sorted_copy,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Summary of one numeric column. Statistics are `None` when the column
/// has no values (standard deviation also needs two).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
    /// Share of non-missing cells, in percent.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub distinct: usize,
    /// Most frequent categories, ties in order of first appearance.
    pub top: Vec<CategoryCount>,
}

pub fn describe_numeric(df: &DataFrame, columns: &[String]) -> Result<Vec<NumericSummary>> {
    columns
        .iter()
        .map(|name| Ok(summarize_values(name, &column_f64_values(df, name)?)))
        .collect()
}

pub fn summarize_values(column: &str, values: &[Option<f64>]) -> NumericSummary {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let sorted = sorted_copy(&present);

    NumericSummary {
        column: column.to_string(),
        count: present.len(),
        missing: values.len() - present.len(),
        mean: mean(&present),
        std_dev: sample_std(&present),
        min: sorted.first().copied(),
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

pub fn describe_categorical(
    df: &DataFrame,
    columns: &[String],
    top_n: usize,
) -> Result<Vec<CategoricalSummary>> {
    columns
        .iter()
        .map(|name| {
            let values = column_string_values(df, name)?;
            Ok(summarize_categories(name, &values, top_n))
        })
        .collect()
}

pub fn summarize_categories(
    column: &str,
    values: &[Option<String>],
    top_n: usize,
) -> CategoricalSummary {
    // value -> index into `counts`
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values.iter().flatten() {
        match index.get(value.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let distinct = counts.len();
    // stable sort keeps first-appearance order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    CategoricalSummary {
        column: column.to_string(),
        count: total,
        missing: values.len() - total,
        distinct,
        top: counts
            .into_iter()
            .take(top_n)
            .map(|(value, count)| CategoryCount {
                value: value.to_string(),
                count,
                percentage: count as f64 / total as f64 * 100.0,
            })
            .collect(),
    }
}
