//! Main preparation pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating load, rename, sanitize and impute.

use crate::cleaner::{ColumnNormalizer, NumericSanitizer, SanitizeReport};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{AnalysisError, Result};
use crate::imputers::{ImputationOutcome, StatisticalImputer};
use crate::loader::TableLoader;
use crate::reporting::{AnalysisReport, ReportGenerator};
use crate::types::{
    ActionType, ColumnKind, ColumnSummary, PreparationAction, PreparationSummary,
};
use crate::utils::completeness;
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// The raw, clean and imputed views of one input file.
///
/// All three tables have the same rows in the same order. `raw` carries
/// the headers as loaded; `clean` and `imputed` use canonical names.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub raw: DataFrame,
    pub clean: DataFrame,
    pub imputed: DataFrame,
    pub summary: PreparationSummary,
}

/// The main preparation pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use exec_comp::{Pipeline, PipelineConfig};
///
/// let prepared = Pipeline::builder()
///     .config(PipelineConfig::ceo_compensation())
///     .build()?
///     .prepare_path("data/ceo_pay.csv")?;
///
/// println!("{} rows, {:.1}% complete", prepared.summary.rows,
///     prepared.summary.completeness_before * 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    loader: TableLoader,
    imputer: StatisticalImputer,
}

// Prepared tables are handed to analysis code that may run on other threads
static_assertions::assert_impl_all!(Pipeline: Send, Sync);
static_assertions::assert_impl_all!(PreparedData: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a file and prepare its tables.
    pub fn prepare_path(&self, path: impl AsRef<Path>) -> Result<PreparedData> {
        let raw = self.loader.load_path(path)?;
        self.prepare_frame(raw)
    }

    /// Load delimited text from a reader and prepare its tables.
    pub fn prepare_reader<R: Read>(&self, reader: R) -> Result<PreparedData> {
        let raw = self.loader.load_reader(reader)?;
        self.prepare_frame(raw)
    }

    /// Prepare an already-loaded table.
    ///
    /// # Errors
    ///
    /// Fails on a degenerate column under the default policy, or if a stage
    /// breaks the row-count or no-missing invariants.
    pub fn prepare_frame(&self, raw: DataFrame) -> Result<PreparedData> {
        match self.prepare_internal(raw) {
            Ok(prepared) => Ok(prepared),
            Err(e) => {
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Prepare a file and run every configured analysis on it.
    pub fn run_path(&self, path: impl AsRef<Path>) -> Result<(PreparedData, AnalysisReport)> {
        let path = path.as_ref();
        let prepared = self.prepare_path(path)?;
        let report = ReportGenerator::build(&prepared, &self.config, &path.display().to_string());
        Ok((prepared, report))
    }

    fn prepare_internal(&self, raw: DataFrame) -> Result<PreparedData> {
        let start_time = Instant::now();
        info!(
            "Starting preparation of {} rows x {} columns",
            raw.height(),
            raw.width()
        );

        let mut summary = PreparationSummary::new();
        summary.rows = raw.height();

        // Step 1: canonical headers
        info!("Step 1: Normalizing column names...");
        let normalized = ColumnNormalizer::new(&self.config.renames).normalize(&raw)?;
        for (from, to) in &normalized.renamed {
            summary.add_action(PreparationAction::new(
                ActionType::ColumnRenamed,
                to,
                format!("Renamed '{}' to '{}'", from, to),
            ));
        }
        for skipped in &normalized.skipped {
            let target = skipped_column(skipped).unwrap_or("dataset");
            summary.add_action(PreparationAction::new(
                ActionType::RenameSkipped,
                target,
                skipped.to_string(),
            ));
            summary.add_warning(skipped.to_string());
        }

        // Step 2: numeric sanitization
        info!("Step 2: Sanitizing numeric columns...");
        let sanitized = NumericSanitizer.sanitize(&normalized.table, &self.config.numeric_columns)?;
        for report in &sanitized.reports {
            summary.add_action(
                PreparationAction::new(
                    ActionType::ValueCleaned,
                    &report.column,
                    format!("Converted {} cells to numbers", report.parsed),
                )
                .with_details(format!(
                    "{} accounting negatives, {} unparseable cells set to missing",
                    report.accounting_negatives, report.degraded
                )),
            );
            if report.degraded > 0 {
                summary.add_warning(format!(
                    "'{}': {} cells could not be parsed and are missing",
                    report.column, report.degraded
                ));
            }
        }
        // Columns the sanitizer already reported absent
        let mut absent: HashSet<&str> = HashSet::new();
        for skipped in &sanitized.skipped {
            absent.extend(skipped_column(skipped));
            summary.add_warning(skipped.to_string());
        }
        let clean = sanitized.table;

        // Step 3: imputation
        info!("Step 3: Imputing missing values...");
        let imputation = self.imputer.impute(
            &clean,
            &self.config.numeric_columns,
            &self.config.categorical_columns,
        )?;
        for fill in &imputation.fills {
            let statistic = match fill.kind {
                ColumnKind::Numeric => "median",
                _ => "mode",
            };
            summary.add_action(PreparationAction::new(
                ActionType::ValueImputed,
                &fill.column,
                format!(
                    "Filled {} cells with {} {}",
                    fill.filled, statistic, fill.fill_value
                ),
            ));
        }
        for column in &imputation.excluded {
            summary.add_action(PreparationAction::new(
                ActionType::ColumnExcluded,
                column,
                "No values to impute from; missing values retained",
            ));
            summary.add_warning(format!("'{}' is entirely missing and was not imputed", column));
        }
        for skipped in &imputation.skipped {
            match skipped_column(skipped) {
                Some(column) if absent.contains(column) => {}
                _ => summary.add_warning(skipped.to_string()),
            }
        }

        self.check_invariants(&raw, &clean, &imputation)?;

        summary.columns = clean.width();
        summary.completeness_before = completeness(&clean);
        summary.completeness_after = completeness(&imputation.table);
        summary.column_summaries = self.column_summaries(
            &normalized.table,
            &clean,
            &imputation,
            &sanitized.reports,
        );
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Preparation complete in {}ms: completeness {:.1}% -> {:.1}%",
            summary.duration_ms,
            summary.completeness_before * 100.0,
            summary.completeness_after * 100.0
        );

        Ok(PreparedData {
            raw,
            clean,
            imputed: imputation.table,
            summary,
        })
    }

    fn check_invariants(
        &self,
        raw: &DataFrame,
        clean: &DataFrame,
        imputation: &ImputationOutcome,
    ) -> Result<()> {
        let imputed = &imputation.table;
        if raw.height() != clean.height() || clean.height() != imputed.height() {
            return Err(AnalysisError::Analysis(format!(
                "row count changed during preparation: {} loaded, {} clean, {} imputed",
                raw.height(),
                clean.height(),
                imputed.height()
            )));
        }

        for fill in &imputation.fills {
            let remaining = imputed.column(&fill.column)?.null_count();
            if remaining > 0 {
                return Err(AnalysisError::Analysis(format!(
                    "'{}' still has {} missing cells after imputation",
                    fill.column, remaining
                )));
            }
        }
        Ok(())
    }

    fn column_summaries(
        &self,
        normalized: &DataFrame,
        clean: &DataFrame,
        imputation: &ImputationOutcome,
        reports: &[SanitizeReport],
    ) -> Vec<ColumnSummary> {
        let mut summaries = Vec::with_capacity(clean.width());

        for column in clean.get_columns() {
            let name = column.name().as_str();
            let kind = if self.config.numeric_columns.iter().any(|c| c == name) {
                ColumnKind::Numeric
            } else if self.config.categorical_columns.iter().any(|c| c == name) {
                ColumnKind::Categorical
            } else {
                ColumnKind::Passthrough
            };

            let mut col_summary = ColumnSummary::new(name, kind);
            col_summary.missing_loaded = normalized
                .column(name)
                .map(|c| c.null_count())
                .unwrap_or(0);
            col_summary.missing_clean = column.null_count();
            col_summary.missing_imputed = imputation
                .table
                .column(name)
                .map(|c| c.null_count())
                .unwrap_or(0);
            col_summary.values_degraded = reports
                .iter()
                .find(|r| r.column == name)
                .map(|r| r.degraded)
                .unwrap_or(0);
            col_summary.fill_value = imputation
                .fills
                .iter()
                .find(|f| f.column == name)
                .map(|f| f.fill_value.clone());
            col_summary.excluded = imputation.excluded.iter().any(|c| c == name);

            summaries.push(col_summary);
        }

        summaries
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            loader: TableLoader::from_config(&config),
            imputer: StatisticalImputer::new(config.degenerate_policy),
            config,
        })
    }
}

/// Column named by a skipped-column error.
fn skipped_column(error: &AnalysisError) -> Option<&str> {
    match error {
        AnalysisError::Schema { column, .. } => Some(column.as_str()),
        _ => None,
    }
}
