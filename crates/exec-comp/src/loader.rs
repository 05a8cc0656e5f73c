//! Delimited-text loader.
//!
//! Reads a header row plus one row per company into a [`DataFrame`] whose
//! columns are all strings. Empty cells and configured missing tokens are
//! stored as null, which is the missing marker for every later stage.

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use crate::utils::is_missing_token;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Loads delimited text files into string-typed tables.
#[derive(Debug, Clone)]
pub struct TableLoader {
    delimiter: u8,
    missing_tokens: Vec<String>,
}

impl TableLoader {
    pub fn new(delimiter: u8, missing_tokens: Vec<String>) -> Self {
        Self {
            delimiter,
            missing_tokens,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.delimiter_byte(), config.missing_tokens.clone())
    }

    /// Load a file from disk.
    ///
    /// The file handle lives only for the duration of this call.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        info!("Loading table from: {}", path.display());
        let file = File::open(path)
            .map_err(|e| AnalysisError::Io(e).with_context(format!("Opening {}", path.display())))?;
        self.load_reader(file)
    }

    /// Load from any reader producing delimited text.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Format`] when the header row is missing,
    /// blank or duplicated, or when a row's width differs from the header.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<DataFrame> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(map_csv_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        validate_headers(&headers)?;

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut missing = 0usize;

        for record in csv_reader.records() {
            let record = record.map_err(map_csv_error)?;
            for (column, value) in cells.iter_mut().zip(record.iter()) {
                if is_missing_token(value, &self.missing_tokens) {
                    missing += 1;
                    column.push(None);
                } else {
                    column.push(Some(value.to_string()));
                }
            }
        }

        let columns: Vec<Column> = headers
            .iter()
            .zip(cells)
            .map(|(name, values)| Column::from(Series::new(name.as_str().into(), values)))
            .collect();
        let df = DataFrame::new(columns)?;

        info!("Table loaded: {} rows x {} columns", df.height(), df.width());
        debug!("{} cells marked missing on load", missing);
        Ok(df)
    }
}

fn validate_headers(headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(AnalysisError::Format("header row is absent".to_string()));
    }

    if let Some(position) = headers.iter().position(|h| h.is_empty()) {
        return Err(AnalysisError::Format(format!(
            "header cell {} is blank",
            position + 1
        )));
    }

    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header.as_str()) {
            return Err(AnalysisError::Format(format!(
                "header '{}' appears more than once",
                header
            )));
        }
    }

    Ok(())
}

fn map_csv_error(error: csv::Error) -> AnalysisError {
    match error.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => {
            let line = pos
                .as_ref()
                .map(|p| format!("line {}", p.line()))
                .unwrap_or_else(|| "a row".to_string());
            AnalysisError::Format(format!(
                "{} has {} fields, expected {}",
                line, len, expected_len
            ))
        }
        _ => AnalysisError::Csv(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_string_values;

    fn loader() -> TableLoader {
        TableLoader::new(b',', vec!["N/A".to_string()])
    }

    #[test]
    fn test_load_marks_empty_and_tokens_missing() {
        let data = "name,revenue\nAcme,\"1,000\"\nGlobex,\nInitech,N/A\n";
        let df = loader().load_reader(data.as_bytes()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(
            column_string_values(&df, "revenue").unwrap(),
            vec![Some("1,000".to_string()), None, None]
        );
    }

    #[test]
    fn test_all_columns_are_strings() {
        let data = "a,b\n1,x\n2,y\n";
        let df = loader().load_reader(data.as_bytes()).unwrap();
        for column in df.get_columns() {
            assert_eq!(column.dtype(), &DataType::String);
        }
    }

    #[test]
    fn test_header_only_gives_empty_table() {
        let df = loader().load_reader("a,b\n".as_bytes()).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_empty_input_is_format_error() {
        let result = loader().load_reader("".as_bytes());
        assert!(matches!(result, Err(AnalysisError::Format(_))));
    }

    #[test]
    fn test_ragged_row_is_format_error() {
        let data = "a,b\n1,2\n3\n";
        let err = loader().load_reader(data.as_bytes()).unwrap_err();
        match err {
            AnalysisError::Format(message) => {
                assert!(message.contains("line 3"), "{message}");
                assert!(message.contains("expected 2"), "{message}");
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_header_is_format_error() {
        let result = loader().load_reader("a,a\n1,2\n".as_bytes());
        assert!(matches!(result, Err(AnalysisError::Format(_))));
    }

    #[test]
    fn test_custom_delimiter() {
        let loader = TableLoader::new(b';', Vec::new());
        let df = loader.load_reader("a;b\n1,5;x\n".as_bytes()).unwrap();
        assert_eq!(
            column_string_values(&df, "a").unwrap(),
            vec![Some("1,5".to_string())]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = loader().load_path("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
