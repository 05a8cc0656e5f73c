//! Report generation module.
//!
//! Runs the configured analyses over the prepared tables and renders the
//! result as JSON (`--json`, `--emit-report`) or a plain-text summary.
//! Also writes the clean and imputed tables as CSV on request.
//!
//! # Example
//!
//! ```rust,ignore
//! use exec_comp::reporting::{ReportGenerator, print_summary};
//!
//! let report = ReportGenerator::build(&prepared, &config, "data/ceo_pay.csv");
//! print_summary(&report);
//!
//! let generator = ReportGenerator::new("output");
//! generator.write_json(&report, "ceo_pay")?;
//! ```

mod generator;

pub use generator::{AnalysisReport, ReportGenerator, print_summary};
