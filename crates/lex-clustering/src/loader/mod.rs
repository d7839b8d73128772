//! Dataset loading.
//!
//! Turns raw upload bytes into a [`DataFrame`] whose columns are all text.
//! Decoding walks [`TextEncoding::FALLBACK_ORDER`]; parsing tries the
//! standard quoted dialect first and a quote-less dialect second, since some
//! survey tools emit stray unbalanced quotes.

mod encoding;

pub use encoding::{TextEncoding, decode_text, decode_with};

use crate::error::{PipelineError, Result, ResultExt};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// A decoded, parsed table together with the encoding that decoded it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub df: DataFrame,
    pub encoding: TextEncoding,
}

/// Loads delimited text tables from bytes or files.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Decode and parse a CSV byte buffer.
    pub fn load_bytes(bytes: &[u8]) -> Result<LoadedTable> {
        let (text, encoding) = decode_text(bytes)?;
        debug!("Decoded {} bytes as {}", bytes.len(), encoding);

        let df = Self::parse_csv(&text)?;
        info!(
            "Loaded table with {} rows x {} columns ({})",
            df.height(),
            df.width(),
            encoding
        );

        Ok(LoadedTable { df, encoding })
    }

    /// Read a CSV file from disk and load it.
    pub fn load_path(path: impl AsRef<Path>) -> Result<LoadedTable> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(PipelineError::from)
            .context(format!("Failed to read {}", path.display()))?;
        Self::load_bytes(&bytes)
    }

    /// Parse decoded text into a DataFrame with every column read as text.
    fn parse_csv(text: &str) -> Result<DataFrame> {
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        // Strategy 1: Standard loading with quote handling
        match Self::read_with_quote(text, Some(b'"')) {
            Ok(df) => return Ok(df),
            Err(e) => {
                debug!("Standard loading failed: {}", e);
            }
        }

        // Strategy 2: Without quote handling
        Self::read_with_quote(text, None).context("Failed to parse CSV")
    }

    fn read_with_quote(text: &str, quote_char: Option<u8>) -> PolarsResult<DataFrame> {
        let cursor = Cursor::new(text.as_bytes().to_vec());

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(
                CsvParseOptions::default()
                    .with_quote_char(quote_char)
                    .with_truncate_ragged_lines(true),
            )
            .into_reader_with_file_handle(cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{column_names, string_cells};

    #[test]
    fn test_load_reads_all_columns_as_text() {
        let csv = "name,screen_time\nAsha,12\nRavi,\n";
        let loaded = DatasetLoader::load_bytes(csv.as_bytes()).unwrap();

        assert_eq!(loaded.encoding, TextEncoding::Utf8);
        assert_eq!(loaded.df.height(), 2);
        assert_eq!(column_names(&loaded.df), vec!["name", "screen_time"]);
        assert_eq!(
            loaded.df.column("screen_time").unwrap().dtype(),
            &DataType::String
        );
        let cells = string_cells(&loaded.df, "screen_time").unwrap();
        assert_eq!(cells[0].as_deref(), Some("12"));
        assert!(cells[1].is_none());
    }

    #[test]
    fn test_load_keeps_quoted_multiline_header() {
        let csv = "name,\"Screen Time\nin hours per week\"\nAsha,4\n";
        let loaded = DatasetLoader::load_bytes(csv.as_bytes()).unwrap();
        assert_eq!(loaded.df.width(), 2);
        assert!(column_names(&loaded.df)[1].contains('\n'));
    }

    #[test]
    fn test_load_latin1_bytes() {
        let bytes = b"name,ott\nJos\xE9,Netflix\nAna,Prime\n";
        let loaded = DatasetLoader::load_bytes(bytes).unwrap();
        assert_eq!(loaded.encoding, TextEncoding::Latin1);
        let names = string_cells(&loaded.df, "name").unwrap();
        assert_eq!(names[0].as_deref(), Some("José"));
    }

    #[test]
    fn test_load_empty_input() {
        let err = DatasetLoader::load_bytes(b"  \n").unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DatasetLoader::load_path("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
