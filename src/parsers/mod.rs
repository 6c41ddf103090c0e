//! Format-specific parsers producing a [`TabularDataset`].

pub mod csv;
pub mod json;
pub mod xml;

use crate::dataset::TabularDataset;
use crate::{Result, StoreScoutError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported input formats. Closed set: parser selection is a match, not a
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
    Xml,
}

impl DataFormat {
    /// Detect the format from the filename: extension first, then filename
    /// keywords as a fallback.
    pub fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => return Ok(DataFormat::Csv),
            "json" | "jsonl" => return Ok(DataFormat::Json),
            "xml" | "xsd" => return Ok(DataFormat::Xml),
            _ => {}
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_ascii_lowercase())
            .unwrap_or_default();

        if filename.contains("csv") || filename.contains("data") {
            Ok(DataFormat::Csv)
        } else if filename.contains("json") {
            Ok(DataFormat::Json)
        } else if filename.contains("xml") {
            Ok(DataFormat::Xml)
        } else {
            Err(StoreScoutError::UnsupportedFormat(format!(
                "cannot detect file format for: {}",
                path.display()
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Json => "json",
            DataFormat::Xml => "xml",
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a parser materialized the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    /// Entire file loaded.
    Full,
    /// Chunked reads accumulated up to the sample cap.
    Chunked,
    /// Event-based read discarding consumed nodes.
    Streaming,
}

/// Parser output: the dataset plus how it was obtained.
#[derive(Debug)]
pub struct ParseOutput {
    pub dataset: TabularDataset,
    pub strategy: ParseStrategy,
    /// Structure tag for formats that distinguish extraction paths
    /// (e.g. `cadastral` vs `generic` for tree markup).
    pub structure: Option<&'static str>,
}

/// Parse a file with the parser for `format`.
pub fn parse(path: &Path, format: DataFormat) -> Result<ParseOutput> {
    match format {
        DataFormat::Csv => csv::CsvParser::new().parse(path),
        DataFormat::Json => json::JsonParser::new().parse(path),
        DataFormat::Xml => xml::XmlParser::new().parse(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection_by_extension() {
        assert_eq!(
            DataFormat::detect(Path::new("sales.csv")).unwrap(),
            DataFormat::Csv
        );
        assert_eq!(
            DataFormat::detect(Path::new("export.jsonl")).unwrap(),
            DataFormat::Json
        );
        assert_eq!(
            DataFormat::detect(Path::new("records.XSD")).unwrap(),
            DataFormat::Xml
        );
    }

    #[test]
    fn test_format_detection_by_filename_keyword() {
        assert_eq!(
            DataFormat::detect(Path::new("json_dump.bak")).unwrap(),
            DataFormat::Json
        );
        assert_eq!(
            DataFormat::detect(Path::new("data_2024.bin")).unwrap(),
            DataFormat::Csv
        );
    }

    #[test]
    fn test_format_detection_failure() {
        assert!(DataFormat::detect(Path::new("mystery.parquet")).is_err());
    }
}
