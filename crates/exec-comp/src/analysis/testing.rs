//! Two-sample and k-sample hypothesis tests.
//!
//! Parametric tests come paired with a rank-based counterpart: Welch or
//! Student t-test with Wilcoxon rank-sum, Welch ANOVA with Kruskal-Wallis.
//! Pay data is heavily skewed, so reports show both.

use super::finite;
use super::groupby::collect_groups;
use crate::error::{AnalysisError, Result};
use crate::utils::{column_f64_values, mean, median, sample_variance};
use anofox_statistics::nonparametric::kruskal::kruskal_wallis as kruskal_h;
use anofox_statistics::nonparametric::wilcoxon::mann_whitney_u;
use anofox_statistics::parametric::anova::{AnovaKind, one_way_anova as anova_f};
use anofox_statistics::parametric::ttest::{Alternative, TTestKind as VarianceModel, t_test as two_sample_t};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TTestKind {
    /// Unequal variances, Welch-Satterthwaite degrees of freedom.
    #[default]
    Welch,
    /// Pooled variance.
    Student,
}

impl TTestKind {
    fn variance_model(self) -> VarianceModel {
        match self {
            TTestKind::Welch => VarianceModel::Welch,
            TTestKind::Student => VarianceModel::Student,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test: String,
    pub statistic: f64,
    pub p_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df: Option<f64>,
    /// Denominator degrees of freedom of an F test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df_denominator: Option<f64>,
    /// Cohen's d, probability of superiority, or eta squared, per test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<f64>,
}

impl TestResult {
    fn new(test: impl Into<String>, statistic: f64, p_value: Option<f64>) -> Self {
        Self {
            test: test.into(),
            statistic,
            p_value,
            df: None,
            df_denominator: None,
            effect_size: None,
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value.is_some_and(|p| p < alpha)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

impl SampleStats {
    fn of(values: &[f64]) -> Self {
        Self {
            count: values.len(),
            mean: mean(values).unwrap_or(f64::NAN),
            median: median(values).unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianSplitComparison {
    pub value: String,
    pub split_on: String,
    /// Median of `split_on`; rows strictly above it form the upper half.
    pub threshold: f64,
    pub above: SampleStats,
    pub below: SampleStats,
    pub t_test: TestResult,
    pub rank_sum: TestResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorComparison {
    pub value: String,
    pub factor: String,
    /// Groups that met the size threshold, in order of first appearance.
    pub groups: Vec<(String, SampleStats)>,
    pub dropped_groups: Vec<String>,
    pub anova: TestResult,
    pub kruskal: TestResult,
}

fn require_sizes(test: &str, a: &[f64], b: &[f64], min: usize) -> Result<()> {
    if a.len() < min || b.len() < min {
        return Err(AnalysisError::InsufficientData(format!(
            "{} needs at least {} observations per sample, got {} and {}",
            test,
            min,
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn library_error(test: &str, error: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Analysis(format!("{} failed: {}", test, error))
}

/// Two-sample t-test of `mean(a) - mean(b)`, with Cohen's d on the pooled
/// standard deviation as effect size.
pub fn t_test(a: &[f64], b: &[f64], kind: TTestKind) -> Result<TestResult> {
    require_sizes("t-test", a, b, 2)?;

    let (v1, v2) = (
        sample_variance(a).unwrap_or(0.0),
        sample_variance(b).unwrap_or(0.0),
    );
    if !(v1 + v2 > 0.0) {
        return Err(AnalysisError::Analysis(
            "t-test samples have no variance".to_string(),
        ));
    }

    let name = match kind {
        TTestKind::Welch => "Welch two-sample t-test",
        TTestKind::Student => "Student two-sample t-test",
    };
    let outcome = two_sample_t(
        a,
        b,
        kind.variance_model(),
        Alternative::TwoSided,
        0.0,
        Some(0.95),
    )
    .map_err(|e| library_error(name, e))?;

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0);
    let difference = mean(a).unwrap_or(0.0) - mean(b).unwrap_or(0.0);

    let mut result = TestResult::new(name, outcome.statistic, finite(outcome.p_value));
    result.df = finite(outcome.df);
    result.effect_size = finite(difference / pooled.sqrt());
    Ok(result)
}

/// Wilcoxon rank-sum (Mann-Whitney) test, continuity corrected.
///
/// The statistic is `W = R1 - n1(n1 + 1)/2`, where `R1` is the rank sum of
/// `a` in the pooled sample. Effect size is `W / (n1 n2)`, the probability
/// that a draw from `a` exceeds one from `b`.
pub fn rank_sum_test(a: &[f64], b: &[f64]) -> Result<TestResult> {
    require_sizes("rank-sum test", a, b, 1)?;

    let first = a[0];
    if a.iter().chain(b).all(|v| *v == first) {
        return Err(AnalysisError::Analysis(
            "rank-sum test samples are all tied".to_string(),
        ));
    }

    let outcome = mann_whitney_u(a, b, Alternative::TwoSided, true, false, None, None)
        .map_err(|e| library_error("Wilcoxon rank-sum test", e))?;

    let pairs = (a.len() * b.len()) as f64;
    let mut result = TestResult::new(
        "Wilcoxon rank-sum test",
        outcome.statistic,
        finite(outcome.p_value).map(|p| p.min(1.0)),
    );
    result.effect_size = finite(outcome.statistic / pairs);
    Ok(result)
}

fn require_groups(test: &str, groups: &[Vec<f64>]) -> Result<usize> {
    let total: usize = groups.iter().map(Vec::len).sum();
    if groups.len() < 2 || groups.iter().any(Vec::is_empty) || total <= groups.len() {
        return Err(AnalysisError::InsufficientData(format!(
            "{} needs at least two non-empty groups and more observations than groups",
            test
        )));
    }
    Ok(total)
}

/// Welch one-way ANOVA across groups, with eta squared as effect size.
///
/// Group variances are not assumed equal, so every group needs at least
/// two observations that are not all the same.
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<TestResult> {
    require_groups("ANOVA", groups)?;
    if groups.iter().any(|g| g.len() < 2) {
        return Err(AnalysisError::InsufficientData(
            "Welch ANOVA needs at least two observations per group".to_string(),
        ));
    }
    if groups
        .iter()
        .any(|g| !(sample_variance(g).unwrap_or(0.0) > 0.0))
    {
        return Err(AnalysisError::Analysis(
            "ANOVA groups have no within-group variance".to_string(),
        ));
    }

    let samples: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let outcome =
        anova_f(&samples, AnovaKind::Welch).map_err(|e| library_error("Welch ANOVA", e))?;

    let mut result = TestResult::new(
        "Welch one-way ANOVA",
        outcome.statistic,
        finite(outcome.p_value),
    );
    result.df = finite(outcome.df_between);
    result.df_denominator = finite(outcome.df_within);
    result.effect_size = outcome
        .ss_between
        .zip(outcome.ss_total)
        .and_then(|(between, total)| finite(between / total));
    Ok(result)
}

/// Kruskal-Wallis H test with tie correction.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> Result<TestResult> {
    require_groups("Kruskal-Wallis test", groups)?;

    let first = groups[0][0];
    if groups.iter().flatten().all(|v| *v == first) {
        return Err(AnalysisError::Analysis(
            "Kruskal-Wallis observations are all tied".to_string(),
        ));
    }

    let samples: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let outcome = kruskal_h(&samples).map_err(|e| library_error("Kruskal-Wallis test", e))?;

    let mut result = TestResult::new(
        "Kruskal-Wallis test",
        outcome.statistic,
        finite(outcome.p_value),
    );
    result.df = finite(outcome.df);
    Ok(result)
}

/// Compare `value` between rows whose `split_on` lies strictly above its
/// median and the rest. Only rows with both columns present take part.
pub fn median_split_comparison(
    df: &DataFrame,
    value: &str,
    split_on: &str,
    kind: TTestKind,
) -> Result<MedianSplitComparison> {
    let values = column_f64_values(df, value)?;
    let splits = column_f64_values(df, split_on)?;

    let pairs: Vec<(f64, f64)> = values
        .into_iter()
        .zip(splits)
        .filter_map(|(v, s)| Some((v?, s?)))
        .collect();

    let split_values: Vec<f64> = pairs.iter().map(|(_, s)| *s).collect();
    let threshold = median(&split_values).ok_or_else(|| {
        AnalysisError::InsufficientData(format!(
            "no rows with both '{}' and '{}' present",
            value, split_on
        ))
    })?;

    let (above, below): (Vec<(f64, f64)>, Vec<(f64, f64)>) =
        pairs.into_iter().partition(|(_, s)| *s > threshold);
    let above: Vec<f64> = above.into_iter().map(|(v, _)| v).collect();
    let below: Vec<f64> = below.into_iter().map(|(v, _)| v).collect();
    debug!(
        "Median split of '{}' on '{}' at {}: {} above, {} below",
        value,
        split_on,
        threshold,
        above.len(),
        below.len()
    );

    Ok(MedianSplitComparison {
        value: value.to_string(),
        split_on: split_on.to_string(),
        threshold,
        t_test: t_test(&above, &below, kind)?,
        rank_sum: rank_sum_test(&above, &below)?,
        above: SampleStats::of(&above),
        below: SampleStats::of(&below),
    })
}

/// ANOVA and Kruskal-Wallis of `value` across the categories of `factor`,
/// keeping categories with at least `min_group_size` observations.
pub fn factor_comparison(
    df: &DataFrame,
    value: &str,
    factor: &str,
    min_group_size: usize,
) -> Result<FactorComparison> {
    let (all_groups, _) = collect_groups(df, value, factor)?;

    let mut dropped_groups = Vec::new();
    let mut kept: Vec<(String, Vec<f64>)> = Vec::new();
    for (name, values) in all_groups {
        if values.len() < min_group_size.max(1) {
            dropped_groups.push(name);
        } else {
            kept.push((name, values));
        }
    }

    if kept.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "'{}' has {} categories with at least {} observations of '{}'",
            factor,
            kept.len(),
            min_group_size,
            value
        )));
    }

    let samples: Vec<Vec<f64>> = kept.iter().map(|(_, v)| v.clone()).collect();
    Ok(FactorComparison {
        value: value.to_string(),
        factor: factor.to_string(),
        anova: one_way_anova(&samples)?,
        kruskal: kruskal_wallis(&samples)?,
        groups: kept
            .into_iter()
            .map(|(name, values)| (name, SampleStats::of(&values)))
            .collect(),
        dropped_groups,
    })
}
