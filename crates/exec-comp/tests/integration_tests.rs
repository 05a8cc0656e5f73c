//! Integration tests for the cleaning and analysis pipeline.
//!
//! These tests run the pipeline end to end on the CSV files in
//! `tests/fixtures`.

use exec_comp::config::{DegenerateColumnPolicy, PipelineConfig};
use exec_comp::schema::columns::*;
use exec_comp::utils::{column_f64_values, column_names, column_string_values};
use exec_comp::{
    ActionType, AnalysisError, ColumnKind, ColumnNormalizer, FillValue, NumericSanitizer,
    Pipeline, ReportGenerator, TableLoader,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn ceo_pipeline() -> Pipeline {
    Pipeline::builder()
        .config(PipelineConfig::ceo_compensation())
        .build()
        .unwrap()
}

fn accounting_config() -> PipelineConfig {
    PipelineConfig::builder()
        .rename("Company Name", "company")
        .rename("Revenue ($M)", "revenue")
        .rename("HQ Location", "hq_state")
        .numeric_columns(["revenue"])
        .categorical_columns(["hq_state"])
        .build()
        .unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// Full Pipeline Tests with the CEO Sample
// ============================================================================

#[test]
fn test_ceo_sample_row_counts_preserved() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    assert_eq!(prepared.raw.height(), 21);
    assert_eq!(prepared.clean.height(), 21);
    assert_eq!(prepared.imputed.height(), 21);
    assert_eq!(prepared.summary.rows, 21);
    assert_eq!(prepared.summary.columns, 15);
}

#[test]
fn test_ceo_sample_headers_canonical() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let names = column_names(&prepared.clean);
    assert_eq!(names[0], COMPANY);
    assert_eq!(names[4], REVENUE);
    assert_eq!(names[14], PAY_RATIO);
    assert_eq!(prepared.summary.actions_of(ActionType::ColumnRenamed).count(), 15);
    assert_eq!(prepared.summary.actions_of(ActionType::RenameSkipped).count(), 0);
}

#[test]
fn test_ceo_sample_no_missing_after_imputation() {
    let config = PipelineConfig::ceo_compensation();
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    for name in config
        .numeric_columns
        .iter()
        .chain(config.categorical_columns.iter())
    {
        let column = prepared.imputed.column(name).unwrap();
        assert_eq!(column.null_count(), 0, "'{}' still has gaps", name);
    }
    assert_close(prepared.summary.completeness_after, 1.0);
    assert!(prepared.summary.completeness_before < 1.0);
}

#[test]
fn test_ceo_sample_accounting_negatives() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let net_income = column_f64_values(&prepared.clean, NET_INCOME).unwrap();
    let margin = column_f64_values(&prepared.clean, PROFIT_MARGIN).unwrap();
    let tsr = column_f64_values(&prepared.clean, SHAREHOLDER_RETURN).unwrap();

    assert_eq!(net_income[1], Some(-733.0));
    assert_eq!(margin[1], Some(-1.8));
    assert_eq!(tsr[1], Some(-18.9));
}

#[test]
fn test_ceo_sample_thousands_separators() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let employees = column_f64_values(&prepared.clean, EMPLOYEES).unwrap();
    assert_eq!(employees[0], Some(59011.0));

    let revenue = column_f64_values(&prepared.clean, REVENUE).unwrap();
    assert_eq!(revenue[0], Some(30497.3));
}

#[test]
fn test_ceo_sample_missing_tokens_become_null() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let ceo_pay = column_f64_values(&prepared.clean, CEO_PAY).unwrap();
    let revenue = column_f64_values(&prepared.clean, REVENUE).unwrap();
    let worker_pay = column_f64_values(&prepared.clean, MEDIAN_WORKER_PAY).unwrap();
    let state = column_string_values(&prepared.clean, HQ_STATE).unwrap();

    assert_eq!(ceo_pay[2], None);
    assert_eq!(revenue[8], None);
    assert_eq!(worker_pay[19], None);
    assert_eq!(state[17], None);
}

#[test]
fn test_ceo_sample_median_fill() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let ceo_pay = column_f64_values(&prepared.imputed, CEO_PAY).unwrap();
    assert_close(ceo_pay[2].unwrap(), 22.52);

    let market_cap = column_f64_values(&prepared.imputed, MARKET_CAP).unwrap();
    assert_close(market_cap[5].unwrap(), 144214.65);

    let summary = prepared.summary.column(CEO_PAY).unwrap();
    assert_eq!(summary.kind, ColumnKind::Numeric);
    assert_eq!(summary.missing_clean, 1);
    assert_eq!(summary.imputed_count(), 1);
    match summary.fill_value {
        Some(FillValue::Numeric(v)) => assert_close(v, 22.52),
        ref other => panic!("expected numeric fill, got {other:?}"),
    }
}

#[test]
fn test_ceo_sample_mode_fill_prefers_first_seen() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let industry = column_string_values(&prepared.imputed, INDUSTRY).unwrap();
    let state = column_string_values(&prepared.imputed, HQ_STATE).unwrap();

    // Technology and Financials tie; Technology appears first
    assert_eq!(industry[14].as_deref(), Some("Technology"));
    // CA and NY tie; CA appears first
    assert_eq!(state[17].as_deref(), Some("CA"));
}

#[test]
fn test_ceo_sample_unparseable_cell_degraded() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let margin = prepared.summary.column(PROFIT_MARGIN).unwrap();
    assert_eq!(margin.missing_loaded, 0);
    assert_eq!(margin.values_degraded, 1);
    assert_eq!(margin.missing_clean, 1);
    assert_eq!(margin.missing_imputed, 0);

    let clean = column_f64_values(&prepared.clean, PROFIT_MARGIN).unwrap();
    assert_eq!(clean[11], None);
}

#[test]
fn test_ceo_sample_company_passes_through() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let company = prepared.summary.column(COMPANY).unwrap();
    assert_eq!(company.kind, ColumnKind::Passthrough);
    assert_eq!(company.fill_value, None);
    assert_eq!(
        column_string_values(&prepared.imputed, COMPANY).unwrap(),
        column_string_values(&prepared.raw, "Company Name").unwrap()
    );
}

#[test]
fn test_ceo_sample_full_report() {
    let (_, report) = ceo_pipeline()
        .run_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.numeric_summaries.len(), 11);
    assert_eq!(report.categorical_summaries.len(), 3);

    let correlation = report.correlation.as_ref().unwrap();
    assert_eq!(correlation.columns.len(), 11);
    assert_eq!(correlation.get(CEO_PAY, CEO_PAY), Some(1.0));

    let regression = report.regression.as_ref().unwrap();
    assert_eq!(regression.observations, 21);
    assert_eq!(regression.coefficients.len(), 6);
    assert!(regression.r_squared >= 0.0 && regression.r_squared <= 1.0);

    assert_eq!(report.group_summaries.len(), 2);
    let by_industry = &report.group_summaries[0];
    assert_eq!(by_industry.groups.len(), 3);
    let counts: usize = by_industry.groups.iter().map(|g| g.count).sum();
    assert_eq!(counts, 21);

    assert_eq!(report.median_splits.len(), 2);
    let split = &report.median_splits[0];
    assert_eq!(split.above.count + split.below.count, 21);

    assert_eq!(report.factor_comparisons.len(), 1);
    let factor = &report.factor_comparisons[0];
    assert_eq!(factor.groups.len(), 3);
    assert_eq!(factor.anova.df, Some(2.0));
}

#[test]
fn test_ceo_sample_descriptives_use_clean_table() {
    let (_, report) = ceo_pipeline()
        .run_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let ceo_pay = report
        .numeric_summaries
        .iter()
        .find(|s| s.column == CEO_PAY)
        .unwrap();
    assert_eq!(ceo_pay.count, 20);
    assert_eq!(ceo_pay.missing, 1);
}

// ============================================================================
// Accounting Sample
// ============================================================================

#[test]
fn test_accounting_sample_end_to_end() {
    let prepared = Pipeline::builder()
        .config(accounting_config())
        .build()
        .unwrap()
        .prepare_path(fixtures_path().join("accounting_sample.csv"))
        .unwrap();

    assert_eq!(
        column_f64_values(&prepared.clean, "revenue").unwrap(),
        vec![Some(1000.0), Some(-500.0), None, Some(2500.0), Some(1000.0)]
    );
    assert_eq!(
        column_f64_values(&prepared.imputed, "revenue").unwrap(),
        vec![
            Some(1000.0),
            Some(-500.0),
            Some(1000.0),
            Some(2500.0),
            Some(1000.0)
        ]
    );
    assert_eq!(
        column_string_values(&prepared.imputed, "hq_state").unwrap(),
        vec![
            Some("CA".to_string()),
            Some("CA".to_string()),
            Some("NY".to_string()),
            Some("CA".to_string()),
            Some("NY".to_string())
        ]
    );
    assert_eq!(prepared.summary.actions_of(ActionType::ValueImputed).count(), 2);
}

#[test]
fn test_semicolon_delimiter() {
    let config = PipelineConfig::builder()
        .rename("Revenue ($M)", "revenue")
        .numeric_columns(["revenue"])
        .delimiter(';')
        .build()
        .unwrap();

    let prepared = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .prepare_path(fixtures_path().join("semicolon.csv"))
        .unwrap();

    assert_eq!(
        column_f64_values(&prepared.clean, "revenue").unwrap(),
        vec![Some(1000.5), Some(-500.0)]
    );
}

// ============================================================================
// Failure and Edge Cases
// ============================================================================

#[test]
fn test_ragged_file_is_format_error() {
    let err = ceo_pipeline()
        .prepare_path(fixtures_path().join("ragged.csv"))
        .unwrap_err();

    assert_eq!(err.error_code(), "FORMAT_ERROR");
    assert!(err.to_string().contains("line 3"), "{err}");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = ceo_pipeline()
        .prepare_path(fixtures_path().join("does_not_exist.csv"))
        .unwrap_err();

    match err {
        AnalysisError::WithContext { source, .. } => {
            assert!(matches!(*source, AnalysisError::Io(_)))
        }
        other => panic!("expected IO error with context, got {other:?}"),
    }
}

#[test]
fn test_all_missing_column_aborts_by_default() {
    let err = ceo_pipeline()
        .prepare_path(fixtures_path().join("all_missing.csv"))
        .unwrap_err();

    assert_eq!(err.error_code(), "DEGENERATE_COLUMN");
    assert!(err.to_string().contains(CEO_PAY), "{err}");
}

#[test]
fn test_all_missing_column_excluded_on_request() {
    let config = PipelineConfig::builder()
        .rename("Revenue ($M)", REVENUE)
        .rename("CEO Pay ($M)", CEO_PAY)
        .rename("HQ Location", HQ_STATE)
        .numeric_columns([REVENUE, CEO_PAY])
        .categorical_columns([HQ_STATE])
        .degenerate_policy(DegenerateColumnPolicy::Exclude)
        .build()
        .unwrap();

    let prepared = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .prepare_path(fixtures_path().join("all_missing.csv"))
        .unwrap();

    let ceo_pay = prepared.summary.column(CEO_PAY).unwrap();
    assert!(ceo_pay.excluded);
    assert_eq!(ceo_pay.fill_value, None);
    assert_eq!(prepared.imputed.column(CEO_PAY).unwrap().null_count(), 3);
    assert_eq!(prepared.imputed.column(REVENUE).unwrap().null_count(), 0);
    assert_eq!(
        prepared.summary.actions_of(ActionType::ColumnExcluded).count(),
        1
    );
}

#[test]
fn test_header_only_file_loads_empty() {
    let loader = TableLoader::from_config(&PipelineConfig::ceo_compensation());
    let df = loader
        .load_path(fixtures_path().join("header_only.csv"))
        .unwrap();

    assert_eq!(df.height(), 0);
    assert_eq!(
        column_names(&df),
        vec!["Company Name", "Revenue ($M)", "HQ Location"]
    );
}

#[test]
fn test_unknown_headers_are_skipped_not_fatal() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("accounting_sample.csv"))
        .unwrap();

    assert_eq!(prepared.summary.actions_of(ActionType::ColumnRenamed).count(), 3);
    assert_eq!(prepared.summary.actions_of(ActionType::RenameSkipped).count(), 12);
    assert!(!prepared.summary.warnings.is_empty());
    assert_eq!(prepared.imputed.column(REVENUE).unwrap().null_count(), 0);
    assert_eq!(prepared.imputed.column(HQ_STATE).unwrap().null_count(), 0);
}

// ============================================================================
// Stage Properties
// ============================================================================

#[test]
fn test_normalizer_is_a_fixed_point() {
    let config = PipelineConfig::ceo_compensation();
    let loader = TableLoader::from_config(&config);
    let raw = loader
        .load_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let normalizer = ColumnNormalizer::new(&config.renames);
    let once = normalizer.normalize(&raw).unwrap();
    let twice = normalizer.normalize(&once.table).unwrap();

    assert_eq!(column_names(&once.table), column_names(&twice.table));
    assert!(twice.renamed.is_empty());
    assert!(twice.skipped.is_empty());
    assert!(once.table.equals_missing(&twice.table));
}

#[test]
fn test_sanitizer_is_idempotent() {
    let prepared = ceo_pipeline()
        .prepare_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();
    let numeric = PipelineConfig::ceo_compensation().numeric_columns;

    let again = NumericSanitizer.sanitize(&prepared.clean, &numeric).unwrap();

    assert!(prepared.clean.equals_missing(&again.table));
    assert!(again.reports.iter().all(|r| r.accounting_negatives == 0));
    assert!(again.reports.iter().all(|r| r.degraded == 0));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.json");

    let config = PipelineConfig::ceo_compensation();
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_config_json_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.json");
    std::fs::write(
        &path,
        r#"{
            "renames": [{ "from": "Revenue ($M)", "to": "revenue" }],
            "numeric_columns": ["revenue"],
            "degenerate_policy": "Exclude"
        }"#,
    )
    .unwrap();

    let loaded = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.degenerate_policy, DegenerateColumnPolicy::Exclude);
    assert_eq!(loaded.delimiter, ',');
    assert!(loaded.missing_tokens.contains(&"#N/A".to_string()));
    assert!(loaded.analysis.regression.is_none());
}

// ============================================================================
// Output Files
// ============================================================================

#[test]
fn test_write_report_and_tables() {
    let dir = TempDir::new().unwrap();
    let (prepared, report) = ceo_pipeline()
        .run_path(fixtures_path().join("ceo_sample.csv"))
        .unwrap();

    let generator = ReportGenerator::new(dir.path().join("out"));
    let report_path = generator.write_json(&report, "ceo_sample").unwrap();
    let (clean_path, imputed_path) = generator.write_tables(&prepared, "ceo_sample").unwrap();

    assert!(report_path.ends_with("ceo_sample_report.json"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["preparation"]["rows"], 21);
    assert!(json["regression"]["coefficients"].is_array());

    let clean = std::fs::read_to_string(&clean_path).unwrap();
    let imputed = std::fs::read_to_string(&imputed_path).unwrap();
    assert!(clean.starts_with("company,ceo_name,hq_state,industry,revenue"));
    assert_eq!(clean.lines().count(), 22);
    assert_eq!(imputed.lines().count(), 22);
}
