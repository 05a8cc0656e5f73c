//! Analysis layer.
//!
//! Consumes the clean and imputed tables and produces serializable result
//! structs:
//!
//! - [`descriptive`]: per-column summary statistics and category counts
//! - [`correlation`]: pairwise-complete Pearson/Spearman matrices
//! - [`groupby`]: numeric summaries per category
//! - [`regression`]: ordinary least squares with optional standardization
//! - [`testing`]: t-test, Wilcoxon rank-sum, Welch ANOVA, Kruskal-Wallis
//!
//! Tests and correlation coefficients come from `anofox_statistics`;
//! regression inference takes its distribution tails from `statrs`.

pub mod correlation;
pub mod descriptive;
pub mod groupby;
pub mod regression;
pub mod testing;

pub use correlation::{
    CorrelationMatrix, CorrelationMethod, CorrelationPair, CorrelationSource, correlation_matrix,
};
pub use descriptive::{
    CategoricalSummary, CategoryCount, NumericSummary, describe_categorical, describe_numeric,
};
pub use groupby::{GroupStats, GroupSummary, group_summary};
pub use regression::{Coefficient, PredictorScaling, RegressionFit, fit_ols};
pub use testing::{
    FactorComparison, MedianSplitComparison, SampleStats, TTestKind, TestResult,
    factor_comparison, kruskal_wallis, median_split_comparison, one_way_anova, rank_sum_test,
    t_test,
};

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Two-sided p-value of a t statistic.
pub(crate) fn student_t_two_sided(t: f64, df: f64) -> Option<f64> {
    if !t.is_finite() || !(df > 0.0) {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    finite((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Upper-tail p-value of an F statistic.
pub(crate) fn f_upper_tail(f: f64, df1: f64, df2: f64) -> Option<f64> {
    if !f.is_finite() || f < 0.0 {
        return None;
    }
    let dist = FisherSnedecor::new(df1, df2).ok()?;
    finite(dist.sf(f))
}

pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
