//! CLI entry point for the CEO compensation pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use exec_comp::{
    DegenerateColumnPolicy, Pipeline, PipelineConfig, PipelineConfigBuilder, PreparedData,
    ReportGenerator, print_summary,
};
use std::path::Path;
use tracing::{error, info};

/// CLI-compatible degenerate column policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDegeneratePolicy {
    /// Stop with an error when a column has no values to impute from
    Abort,
    /// Leave such a column unimputed and continue
    Exclude,
}

impl From<CliDegeneratePolicy> for DegenerateColumnPolicy {
    fn from(cli: CliDegeneratePolicy) -> Self {
        match cli {
            CliDegeneratePolicy::Abort => DegenerateColumnPolicy::Abort,
            CliDegeneratePolicy::Exclude => DegenerateColumnPolicy::Exclude,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "CEO compensation cleaning and analysis",
    long_about = "Cleans a CEO compensation spreadsheet export (accounting negatives, \
                  thousands separators, missing tokens), imputes gaps with medians and \
                  modes, and reports descriptive statistics, correlations, a pay \
                  regression and group comparisons.\n\n\
                  EXAMPLES:\n  \
                  # Built-in CEO spreadsheet layout\n  \
                  exec-comp -i ceo_pay.csv\n\n  \
                  # Custom layout, keep going past empty columns\n  \
                  exec-comp -i data.csv -c layout.json --on-degenerate exclude\n\n  \
                  # Machine-readable output\n  \
                  exec-comp -i ceo_pay.csv --json | jq .regression"
)]
struct Args {
    /// Path to the delimited file to process
    #[arg(short, long)]
    input: String,

    /// JSON configuration file
    ///
    /// If not specified, the built-in CEO compensation layout is used
    #[arg(short, long)]
    config: Option<String>,

    /// Output directory for reports and tables (overrides the configuration)
    #[arg(short, long)]
    output: Option<String>,

    /// Extra cell value to treat as missing (repeatable)
    #[arg(long = "missing-token", value_name = "TOKEN")]
    missing_tokens: Vec<String>,

    /// What to do with a column that has no values at all
    #[arg(long, value_enum)]
    on_degenerate: Option<CliDegeneratePolicy>,

    /// Fit the regression on raw predictor units instead of z-scores
    #[arg(long)]
    no_standardize: bool,

    /// Stop after cleaning and imputation; skip the analyses
    #[arg(long)]
    prepare_only: bool,

    /// Write the clean and imputed tables as CSV to the output directory
    #[arg(long)]
    save_tables: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;
    let pipeline = Pipeline::builder().config(config).build()?;

    let result = if args.prepare_only {
        run_prepare_only(&pipeline, &args)
    } else {
        run_analysis(&pipeline, &args)
    };

    if let Err(ref e) = result {
        error!("Pipeline failed: {}", e);
    }
    result
}

/// Start from the configuration file (or the built-in preset) and apply
/// command line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::ceo_compensation(),
    };

    let mut analysis = base.analysis.clone();
    if args.no_standardize
        && let Some(regression) = analysis.regression.as_mut()
    {
        regression.standardize = false;
    }

    let mut builder = PipelineConfigBuilder::from_config(base).analysis(analysis);

    if let Some(ref output) = args.output {
        builder = builder.output_dir(output);
    }
    for token in &args.missing_tokens {
        builder = builder.missing_token(token);
    }
    if let Some(policy) = args.on_degenerate {
        builder = builder.degenerate_policy(policy.into());
    }
    if args.save_tables {
        builder = builder.save_tables(true);
    }

    Ok(builder.build()?)
}

fn run_prepare_only(pipeline: &Pipeline, args: &Args) -> Result<()> {
    let prepared = pipeline.prepare_path(&args.input)?;
    save_tables_if_requested(pipeline, &prepared, args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prepared.summary)?);
        return Ok(());
    }

    print_preparation_summary(&prepared, args);
    Ok(())
}

fn run_analysis(pipeline: &Pipeline, args: &Args) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting cleaning and analysis...");
    info!("{}", "=".repeat(80));

    let (prepared, report) = pipeline.run_path(&args.input)?;
    save_tables_if_requested(pipeline, &prepared, args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let generator = ReportGenerator::new(&pipeline.config().output_dir);
        let report_path = generator.write_json(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    print_summary(&report);
    Ok(())
}

fn save_tables_if_requested(
    pipeline: &Pipeline,
    prepared: &PreparedData,
    args: &Args,
) -> Result<()> {
    if !pipeline.config().save_tables {
        return Ok(());
    }
    let generator = ReportGenerator::new(&pipeline.config().output_dir);
    let (clean, imputed) = generator.write_tables(prepared, &extract_file_stem(&args.input))?;
    info!("Tables written to: {}, {}", clean.display(), imputed.display());
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print the preparation summary for `--prepare-only`.
///
/// Uses `println!` intentionally for user-facing CLI output.
fn print_preparation_summary(prepared: &PreparedData, args: &Args) {
    let summary = &prepared.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("PREPARATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input: {} ({} rows x {} columns)",
        args.input, summary.rows, summary.columns
    );
    println!("Duration: {}ms", summary.duration_ms);
    println!(
        "Completeness: {:.1}% -> {:.1}%",
        summary.completeness_before * 100.0,
        summary.completeness_after * 100.0
    );
    println!();

    println!(
        "{:<22} {:<12} {:>8} {:>8} {:>8} {:>10}  {}",
        "Column", "Kind", "Loaded", "Clean", "Imputed", "Degraded", "Fill"
    );
    println!("{}", "-".repeat(80));
    for col in &summary.column_summaries {
        let fill = match (&col.fill_value, col.excluded) {
            (Some(value), _) => value.to_string(),
            (None, true) => "excluded".to_string(),
            (None, false) => "-".to_string(),
        };
        println!(
            "{:<22} {:<12} {:>8} {:>8} {:>8} {:>10}  {}",
            col.name,
            format!("{:?}", col.kind),
            col.missing_loaded,
            col.missing_clean,
            col.missing_imputed,
            col.values_degraded,
            fill
        );
    }

    if !summary.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }
    println!("{}", "=".repeat(80));
}
