//! Pipeline module.
//!
//! This module provides the preparation pipeline that turns an input file
//! into its clean and imputed tables.

mod builder;

pub use builder::{Pipeline, PipelineBuilder, PreparedData};
