//! Header renaming from raw spreadsheet text to canonical identifiers.

use crate::config::ColumnRename;
use crate::error::{AnalysisError, Result};
use crate::utils::has_column;
use polars::prelude::*;
use tracing::{debug, warn};

/// Result of applying the rename table.
#[derive(Debug)]
pub struct NormalizeOutcome {
    pub table: DataFrame,
    /// `(from, to)` pairs that were applied, in table order.
    pub renamed: Vec<(String, String)>,
    /// Renames that could not be applied; each is a recoverable schema error.
    pub skipped: Vec<AnalysisError>,
}

/// Applies an explicit rename table to a table's headers.
pub struct ColumnNormalizer<'a> {
    renames: &'a [ColumnRename],
}

impl<'a> ColumnNormalizer<'a> {
    pub fn new(renames: &'a [ColumnRename]) -> Self {
        Self { renames }
    }

    /// Produce a renamed copy of `df`.
    ///
    /// Columns not in the rename table keep their name and position. A
    /// header that is already canonical is left alone, so normalizing twice
    /// gives the same table.
    pub fn normalize(&self, df: &DataFrame) -> Result<NormalizeOutcome> {
        let mut table = df.clone();
        let mut renamed = Vec::new();
        let mut skipped = Vec::new();

        for rename in self.renames {
            let (from, to) = (rename.from.as_str(), rename.to.as_str());
            if from == to {
                continue;
            }

            match (has_column(&table, from), has_column(&table, to)) {
                (true, false) => {
                    table.rename(from, to.into())?;
                    debug!("Renamed '{}' -> '{}'", from, to);
                    renamed.push((from.to_string(), to.to_string()));
                }
                (false, true) => {
                    debug!("'{}' already canonical", to);
                }
                (false, false) => {
                    warn!("Column '{}' not found, skipping rename to '{}'", from, to);
                    skipped.push(AnalysisError::schema(
                        from,
                        format!("not present, cannot rename to '{}'", to),
                    ));
                }
                (true, true) => {
                    warn!(
                        "Both '{}' and '{}' present, skipping rename to avoid a duplicate",
                        from, to
                    );
                    skipped.push(AnalysisError::schema(
                        from,
                        format!("target name '{}' already exists", to),
                    ));
                }
            }
        }

        Ok(NormalizeOutcome {
            table,
            renamed,
            skipped,
        })
    }
}
