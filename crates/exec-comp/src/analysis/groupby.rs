//! Numeric summaries per category.

use crate::error::Result;
use crate::utils::{column_f64_values, column_string_values, mean, median, sample_std};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub group: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// `None` for a group of one.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub value: String,
    pub by: String,
    pub min_group_size: usize,
    /// Groups with at least `min_group_size` rows, highest mean first.
    pub groups: Vec<GroupStats>,
    /// Groups below the size threshold.
    pub dropped_groups: Vec<String>,
    /// Rows with a missing value or a missing category.
    pub ignored_rows: usize,
}

/// Values of `value` keyed by the category in `by`, groups in order of
/// first appearance. Rows missing either side are counted, not grouped.
pub(crate) fn collect_groups(
    df: &DataFrame,
    value: &str,
    by: &str,
) -> Result<(Vec<(String, Vec<f64>)>, usize)> {
    let values = column_f64_values(df, value)?;
    let keys = column_string_values(df, by)?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    let mut ignored = 0;

    for (v, key) in values.into_iter().zip(keys) {
        let (Some(v), Some(key)) = (v, key) else {
            ignored += 1;
            continue;
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(v);
    }

    Ok((groups, ignored))
}

pub fn group_summary(
    df: &DataFrame,
    value: &str,
    by: &str,
    min_group_size: usize,
) -> Result<GroupSummary> {
    let (groups, ignored_rows) = collect_groups(df, value, by)?;

    let mut kept = Vec::new();
    let mut dropped_groups = Vec::new();
    for (group, values) in groups {
        if values.len() < min_group_size.max(1) {
            dropped_groups.push(group);
            continue;
        }
        kept.push(group_stats(group, &values));
    }

    kept.sort_by(|a, b| {
        b.mean
            .partial_cmp(&a.mean)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(GroupSummary {
        value: value.to_string(),
        by: by.to_string(),
        min_group_size,
        groups: kept,
        dropped_groups,
        ignored_rows,
    })
}

fn group_stats(group: String, values: &[f64]) -> GroupStats {
    GroupStats {
        group,
        count: values.len(),
        mean: mean(values).unwrap_or(f64::NAN),
        median: median(values).unwrap_or(f64::NAN),
        std_dev: sample_std(values),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}
