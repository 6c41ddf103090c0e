//! Delimited-text parser with separator and encoding auto-detection.

use super::{ParseOutput, ParseStrategy};
use crate::dataset::{Column, TabularDataset};
use crate::{Result, StoreScoutError};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251, WINDOWS_1252};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// File size above which the chunked strategy is used.
const LARGE_FILE_BYTES: u64 = 100 * 1024 * 1024;
/// Maximum rows materialized for analysis.
const MAX_SAMPLE_ROWS: usize = 50_000;

/// Separators tried in order before falling back to a first-line scan.
const SEPARATORS: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Encodings tried in order. The last two cannot fail to decode.
const ENCODINGS: [&Encoding; 3] = [UTF_8, WINDOWS_1251, WINDOWS_1252];

pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<ParseOutput> {
        let file_size = fs::metadata(path)?.len();

        let (bytes, strategy) = if file_size > LARGE_FILE_BYTES {
            debug!(file_size, "large delimited file, sampling by chunks");
            (read_line_capped(path, MAX_SAMPLE_ROWS + 1)?, ParseStrategy::Chunked)
        } else {
            (fs::read(path)?, ParseStrategy::Full)
        };

        let text = decode(&bytes);
        let dataset = parse_text(&text)?;

        Ok(ParseOutput {
            dataset,
            strategy,
            structure: None,
        })
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Read at most `max_lines` lines of raw bytes, bounding memory on large
/// inputs. The cap includes the header line.
fn read_line_capped(path: &Path, max_lines: usize) -> Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    let mut line = Vec::new();
    for _ in 0..max_lines {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&line);
    }
    Ok(bytes)
}

/// Decode with the first encoding that accepts the input; the trailing
/// single-byte encodings always succeed, so this never fails outright.
fn decode(bytes: &[u8]) -> String {
    for encoding in ENCODINGS {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return text.into_owned();
        }
    }
    // Unreachable in practice; tolerate with replacement characters.
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_text(text: &str) -> Result<TabularDataset> {
    for separator in SEPARATORS {
        if let Some(dataset) = try_separator(text, separator, false)? {
            return Ok(dataset);
        }
    }

    // Fall back to scanning the first line for a known separator, parsing
    // tolerantly with the result (ragged rows padded/truncated).
    let first_line = text.lines().next().unwrap_or_default();
    let separator = if first_line.contains(';') {
        b';'
    } else if first_line.contains(',') {
        b','
    } else if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    };

    if let Some(dataset) = try_separator(text, separator, true)? {
        return Ok(dataset);
    }

    Err(StoreScoutError::parse(
        "csv",
        "no separator produced at least one row with more than one column",
    ))
}

/// Attempt one separator. Returns `Ok(None)` when the separator does not
/// split the data into more than one column or the rows are malformed for
/// strict parsing.
fn try_separator(
    text: &str,
    separator: u8,
    tolerant: bool,
) -> Result<Option<TabularDataset>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .flexible(tolerant)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|s| s.trim().to_string()).collect(),
        Err(_) => return Ok(None),
    };
    if headers.len() <= 1 {
        return Ok(None);
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut rows = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) if tolerant => continue,
            Err(_) => return Ok(None),
        };
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(normalize_cell(record.get(i)));
        }
        rows += 1;
        if rows >= MAX_SAMPLE_ROWS {
            break;
        }
    }

    if rows == 0 {
        return Ok(None);
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::from_strings(name, values))
        .collect();

    Ok(Some(TabularDataset::new(columns)?))
}

fn normalize_cell(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    match value {
        "" | "null" | "NULL" | "NaN" | "NA" => None,
        _ => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_comma_separated() {
        let file = write_file(b"id,name,price\n1,widget,9.99\n2,gadget,19.99\n");
        let output = CsvParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.row_count(), 2);
        assert_eq!(output.dataset.field_count(), 3);
        assert_eq!(output.strategy, ParseStrategy::Full);
        assert_eq!(output.dataset.column("id").unwrap().dtype, DType::Int64);
        assert_eq!(
            output.dataset.column("price").unwrap().dtype,
            DType::Float64
        );
    }

    #[test]
    fn test_semicolon_detected() {
        let file = write_file(b"id;name\n1;alpha\n2;beta\n");
        let output = CsvParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.field_count(), 2);
        assert_eq!(output.dataset.row_count(), 2);
    }

    #[test]
    fn test_tab_and_pipe_detected() {
        let file = write_file(b"a\tb\n1\t2\n");
        assert_eq!(
            CsvParser::new()
                .parse(file.path())
                .unwrap()
                .dataset
                .field_count(),
            2
        );

        let file = write_file(b"a|b\n1|2\n");
        assert_eq!(
            CsvParser::new()
                .parse(file.path())
                .unwrap()
                .dataset
                .field_count(),
            2
        );
    }

    #[test]
    fn test_windows_1251_encoding() {
        // "город" (city) in windows-1251, invalid as UTF-8.
        let mut contents = b"id;".to_vec();
        contents.extend_from_slice(&[0xE3, 0xEE, 0xF0, 0xEE, 0xE4]);
        contents.extend_from_slice(b"\n1;Moscow\n");
        let file = write_file(&contents);
        let output = CsvParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.field_count(), 2);
        assert_eq!(output.dataset.columns()[1].name, "город");
    }

    #[test]
    fn test_single_column_rejected() {
        let file = write_file(b"lonely\nvalue1\nvalue2\n");
        let err = CsvParser::new().parse(file.path()).unwrap_err();
        assert!(matches!(err, StoreScoutError::Parse { .. }));
    }

    #[test]
    fn test_zero_rows_rejected() {
        let file = write_file(b"a,b,c\n");
        assert!(CsvParser::new().parse(file.path()).is_err());
    }

    #[test]
    fn test_empty_cells_become_null() {
        let file = write_file(b"id,score\n1,\n2,5\n");
        let output = CsvParser::new().parse(file.path()).unwrap();
        assert_eq!(output.dataset.column("score").unwrap().null_count(), 1);
    }
}
