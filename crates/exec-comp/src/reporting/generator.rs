use crate::analysis::{
    CategoricalSummary, CorrelationMatrix, CorrelationSource, FactorComparison, GroupSummary,
    MedianSplitComparison, NumericSummary, RegressionFit, TestResult, correlation_matrix,
    describe_categorical, describe_numeric, factor_comparison, fit_ols, group_summary,
    median_split_comparison,
};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::PreparedData;
use crate::types::{ActionType, PreparationSummary};
use crate::utils::has_column;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Report Types
// ============================================================================

/// Everything the analysis layer produced for one input file.
///
/// Use this for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub input_file: String,
    pub preparation: PreparationSummary,

    /// Computed on the clean table, so missing counts are meaningful.
    pub numeric_summaries: Vec<NumericSummary>,
    /// Computed on the clean table.
    pub categorical_summaries: Vec<CategoricalSummary>,

    pub correlation_source: CorrelationSource,
    pub correlation: Option<CorrelationMatrix>,

    // Imputed-table analyses
    pub regression: Option<RegressionFit>,
    pub group_summaries: Vec<GroupSummary>,
    pub median_splits: Vec<MedianSplitComparison>,
    pub factor_comparisons: Vec<FactorComparison>,

    /// Analyses that could not be computed.
    pub warnings: Vec<String>,
}

/// Writes reports and table dumps into an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Log a failed analysis and keep going.
fn attempt<T>(warnings: &mut Vec<String>, label: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} skipped: {}", label, e);
            warnings.push(format!("{}: {}", label, e));
            None
        }
    }
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run every configured analysis on the prepared tables.
    ///
    /// A failing analysis is recorded in `warnings` and does not stop the
    /// others.
    pub fn build(
        prepared: &PreparedData,
        config: &PipelineConfig,
        input_file: &str,
    ) -> AnalysisReport {
        let analysis = &config.analysis;
        let clean = &prepared.clean;
        let imputed = &prepared.imputed;
        let mut warnings = Vec::new();

        let numeric: Vec<String> = config
            .numeric_columns
            .iter()
            .filter(|c| has_column(clean, c))
            .cloned()
            .collect();
        let categorical: Vec<String> = config
            .categorical_columns
            .iter()
            .filter(|c| has_column(clean, c))
            .cloned()
            .collect();

        info!("Computing descriptive statistics...");
        let numeric_summaries = attempt(
            &mut warnings,
            "Numeric summaries",
            describe_numeric(clean, &numeric),
        )
        .unwrap_or_default();
        let categorical_summaries = attempt(
            &mut warnings,
            "Categorical summaries",
            describe_categorical(clean, &categorical, analysis.top_categories),
        )
        .unwrap_or_default();

        info!("Computing correlations...");
        let correlation_table = match analysis.correlation_source {
            CorrelationSource::Clean => clean,
            CorrelationSource::Imputed => imputed,
        };
        let correlation_columns = if analysis.correlation_columns.is_empty() {
            numeric.clone()
        } else {
            analysis.correlation_columns.clone()
        };
        let correlation = attempt(
            &mut warnings,
            "Correlation matrix",
            correlation_matrix(
                correlation_table,
                &correlation_columns,
                analysis.correlation_method,
            ),
        );

        let regression = analysis.regression.as_ref().and_then(|spec| {
            info!("Fitting regression of '{}'...", spec.target);
            attempt(
                &mut warnings,
                &format!("Regression of '{}'", spec.target),
                fit_ols(imputed, &spec.target, &spec.predictors, spec.standardize),
            )
        });

        let group_summaries = analysis
            .group_summaries
            .iter()
            .filter_map(|spec| {
                attempt(
                    &mut warnings,
                    &format!("Group summary of '{}' by '{}'", spec.value, spec.by),
                    group_summary(imputed, &spec.value, &spec.by, spec.min_group_size),
                )
            })
            .collect();

        let median_splits = analysis
            .median_splits
            .iter()
            .filter_map(|spec| {
                attempt(
                    &mut warnings,
                    &format!("Median split of '{}' on '{}'", spec.value, spec.split_on),
                    median_split_comparison(
                        imputed,
                        &spec.value,
                        &spec.split_on,
                        analysis.t_test_kind,
                    ),
                )
            })
            .collect();

        let factor_comparisons = analysis
            .factor_tests
            .iter()
            .filter_map(|spec| {
                attempt(
                    &mut warnings,
                    &format!("Comparison of '{}' across '{}'", spec.value, spec.factor),
                    factor_comparison(imputed, &spec.value, &spec.factor, spec.min_group_size),
                )
            })
            .collect();

        AnalysisReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            preparation: prepared.summary.clone(),
            numeric_summaries,
            categorical_summaries,
            correlation_source: analysis.correlation_source,
            correlation,
            regression,
            group_summaries,
            median_splits,
            factor_comparisons,
            warnings,
        }
    }

    /// Write a report to `<stem>_report.json` in the output directory.
    pub fn write_json(&self, report: &AnalysisReport, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", stem));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    /// Write the clean and imputed tables to `<stem>_clean.csv` and
    /// `<stem>_imputed.csv`.
    pub fn write_tables(&self, prepared: &PreparedData, stem: &str) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.output_dir)?;

        let clean_path = self.output_dir.join(format!("{}_clean.csv", stem));
        let imputed_path = self.output_dir.join(format!("{}_imputed.csv", stem));
        write_csv(&mut prepared.clean.clone(), &clean_path)?;
        write_csv(&mut prepared.imputed.clone(), &imputed_path)?;

        info!(
            "Tables saved: {}, {}",
            clean_path.display(),
            imputed_path.display()
        );
        Ok((clean_path, imputed_path))
    }
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .context(format!("Writing {}", path.display()))
}

// ============================================================================
// Plain-text summary
// ============================================================================

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

fn fmt_p(value: Option<f64>) -> String {
    match value {
        Some(p) if p < 0.0001 => "<0.0001".to_string(),
        Some(p) => format!("{:.4}", p),
        None => "-".to_string(),
    }
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_test(label: &str, test: &TestResult) {
    println!(
        "    {:<14} stat = {:>10.3}  p = {}{}",
        label,
        test.statistic,
        fmt_p(test.p_value),
        test.df.map(|df| format!("  df = {:.1}", df)).unwrap_or_default()
    );
}

/// Print a human-readable summary of a report to stdout.
///
/// Uses `println!` so the summary shows regardless of log level.
pub fn print_summary(report: &AnalysisReport) {
    let prep = &report.preparation;

    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input: {} ({} rows x {} columns)",
        report.input_file, prep.rows, prep.columns
    );
    println!("Generated: {}", report.generated_at);
    println!();

    println!("Preparation:");
    println!("  Duration: {}ms", prep.duration_ms);
    println!(
        "  Completeness: {:.1}% -> {:.1}%",
        prep.completeness_before * 100.0,
        prep.completeness_after * 100.0
    );
    for action in prep
        .actions
        .iter()
        .filter(|a| a.action_type != ActionType::ColumnRenamed)
    {
        println!(
            "  - [{}] {}: {}",
            action.action_type.display_name(),
            action.target,
            action.description
        );
    }
    println!();

    if !report.numeric_summaries.is_empty() {
        println!("NUMERIC COLUMNS");
        println!("{}", "-".repeat(40));
        println!(
            "{:<20} {:>6} {:>6} {:>12} {:>12} {:>12} {:>12}",
            "Column", "N", "Miss", "Mean", "Median", "Min", "Max"
        );
        for s in &report.numeric_summaries {
            println!(
                "{:<20} {:>6} {:>6} {:>12} {:>12} {:>12} {:>12}",
                truncate_str(&s.column, 19),
                s.count,
                s.missing,
                fmt_opt(s.mean),
                fmt_opt(s.median),
                fmt_opt(s.min),
                fmt_opt(s.max)
            );
        }
        println!();
    }

    for s in &report.categorical_summaries {
        println!("{} ({} distinct, {} missing)", s.column, s.distinct, s.missing);
        for c in &s.top {
            println!(
                "  {:<30} {:>5} ({:.1}%)",
                truncate_str(&c.value, 29),
                c.count,
                c.percentage
            );
        }
    }
    if !report.categorical_summaries.is_empty() {
        println!();
    }

    if let Some(matrix) = &report.correlation {
        println!(
            "STRONGEST CORRELATIONS ({:?}, {:?} table)",
            matrix.method, report.correlation_source
        );
        println!("{}", "-".repeat(40));
        for pair in &matrix.strongest_pairs {
            println!(
                "  {:<20} x {:<20} r = {:>7.3}  p = {}  n = {}",
                truncate_str(&pair.column_x, 20),
                truncate_str(&pair.column_y, 20),
                pair.estimate,
                fmt_p(pair.p_value),
                pair.observations
            );
        }
        println!();
    }

    if let Some(fit) = &report.regression {
        println!(
            "REGRESSION: {} ({} rows{})",
            fit.target,
            fit.observations,
            if fit.standardized { ", standardized predictors" } else { "" }
        );
        println!("{}", "-".repeat(40));
        for c in &fit.coefficients {
            println!(
                "  {:<22} {:>12.4} (se {:>10.4})  p = {}",
                truncate_str(&c.term, 22),
                c.estimate,
                c.std_error,
                fmt_p(c.p_value)
            );
        }
        println!(
            "  R² = {:.4}, adjusted R² = {:.4}, F p = {}",
            fit.r_squared,
            fit.adj_r_squared,
            fmt_p(fit.f_p_value)
        );
        println!();
    }

    for group in &report.group_summaries {
        println!("{} BY {}", group.value.to_uppercase(), group.by.to_uppercase());
        println!("{}", "-".repeat(40));
        for g in &group.groups {
            println!(
                "  {:<30} n = {:>4}  mean = {:>10.3}  median = {:>10.3}",
                truncate_str(&g.group, 29),
                g.count,
                g.mean,
                g.median
            );
        }
        if !group.dropped_groups.is_empty() {
            println!(
                "  ({} groups under {} rows omitted)",
                group.dropped_groups.len(),
                group.min_group_size
            );
        }
        println!();
    }

    for split in &report.median_splits {
        println!(
            "{} ABOVE vs AT-OR-BELOW MEDIAN {} ({:.3})",
            split.value.to_uppercase(),
            split.split_on.to_uppercase(),
            split.threshold
        );
        println!(
            "    above: n = {}, mean = {:.3}, median = {:.3}",
            split.above.count, split.above.mean, split.above.median
        );
        println!(
            "    below: n = {}, mean = {:.3}, median = {:.3}",
            split.below.count, split.below.mean, split.below.median
        );
        print_test("t-test", &split.t_test);
        print_test("rank-sum", &split.rank_sum);
        println!();
    }

    for factor in &report.factor_comparisons {
        println!(
            "{} ACROSS {} ({} groups)",
            factor.value.to_uppercase(),
            factor.factor.to_uppercase(),
            factor.groups.len()
        );
        print_test("ANOVA", &factor.anova);
        print_test("Kruskal", &factor.kruskal);
        println!();
    }

    let warnings = prep.warnings.iter().chain(&report.warnings);
    let mut any = false;
    for warning in warnings {
        if !any {
            println!("Warnings:");
            any = true;
        }
        println!("  - {}", warning);
    }

    println!("{}", "=".repeat(80));
}
