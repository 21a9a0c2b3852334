//! # Delimited text sources
//!
//! Opening a catalogue export goes through three steps:
//!
//! 1. [`sniffer`]: detect the encoding and decode the whole file, then pick the delimiter,
//! 2. [`header`]: normalize the header line and make its column names unique,
//! 3. [`CsvSource::rows`]: stream the data rows as [`RawRow`]s keyed by column name.
//!
//! [`row`] then maps a [`RawRow`] onto the typed catalogue records.
//!
//! ## Header policy
//! -----------------
//! A header that does not expose the required columns (after trying every candidate
//! delimiter) is rejected with [`LoaderError::UnrecognizedHeader`], unless the caller opts
//! in to [`HeaderPolicy::AssumeDefault`]: the built-in merged layout
//! [`DEFAULT_MERGED_HEADER`] is then applied and the first line is read as data.
pub mod header;
pub mod row;
pub mod sniffer;

use std::sync::Arc;

use ahash::AHashMap;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::constants::DEFAULT_MERGED_HEADER;
use crate::csv_source::header::{ensure_unique_header_fields, missing_columns, split_header};
use crate::csv_source::sniffer::{first_non_blank_line, read_text, sniff_delimiter, TextEncoding};
use crate::loader_errors::LoaderError;

/// What to do with a header that lacks the required columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Fail with [`LoaderError::UnrecognizedHeader`]
    #[default]
    Require,
    /// Apply [`DEFAULT_MERGED_HEADER`] and treat the first line as data
    AssumeDefault,
    /// Take the first non-blank line as the header whatever it contains
    FirstLine,
}

/// How to open a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    /// Columns whose presence identifies a valid header (and drives delimiter detection)
    pub required: Vec<String>,
    pub header_policy: HeaderPolicy,
    /// Skip delimiter detection
    pub delimiter: Option<u8>,
}

impl SourceOptions {
    pub fn new(required: &[&str], header_policy: HeaderPolicy) -> Self {
        SourceOptions {
            required: required.iter().map(|c| c.to_string()).collect(),
            header_policy,
            delimiter: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

/// Resolved layout of an opened source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub encoding: TextEncoding,
    pub delimiter: u8,
    /// Normalized, unique column names
    pub header: Arc<[String]>,
    /// `false` when the built-in layout was assumed and the first line is data
    pub header_in_file: bool,
}

/// One data row, values keyed by normalized column name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Physical line number in the file (1-based)
    pub line: u64,
    /// Number of fields actually present on the line
    pub width: usize,
    values: AHashMap<String, String>,
    raw: String,
}

impl RawRow {
    fn new(line: u64, header: &[String], record: &csv::StringRecord, delimiter: u8) -> Self {
        let values = header
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect();
        RawRow {
            line,
            width: record.len(),
            values,
            raw: record.iter().collect::<Vec<_>>().join(&(delimiter as char).to_string()),
        }
    }

    /// Build a row from explicit column/value pairs
    pub fn from_pairs<'a>(line: u64, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values: AHashMap<String, String> = pairs
            .into_iter()
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        let raw = values.values().cloned().collect::<Vec<_>>().join(",");
        RawRow {
            line,
            width: values.len(),
            values,
            raw,
        }
    }

    /// Raw value of a column, `None` when the column is absent from the row
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Value of the first column of `columns` present with a non-blank value
    pub fn first_of(&self, columns: &[&str]) -> Option<&str> {
        columns
            .iter()
            .filter_map(|column| self.get(column))
            .find(|value| !crate::conversion::is_null_token(value))
    }

    /// The row as read, fields joined with the file delimiter
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A decoded delimited file ready to be iterated
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: Utf8PathBuf,
    text: String,
    /// Byte offset where data rows start
    body_start: usize,
    /// Physical lines before `body_start`
    body_line_offset: u64,
    layout: SourceLayout,
}

impl CsvSource {
    /// Open and sniff a file.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: the file to read
    /// * `options`: required columns, header policy and optional forced delimiter
    ///
    /// Return
    /// ----------
    /// * The opened source, or:
    ///   - [`LoaderError::IoError`] when the file cannot be read,
    ///   - [`LoaderError::EmptyCsv`] when it holds no non-blank line,
    ///   - [`LoaderError::UnrecognizedHeader`] when the header lacks a required column and
    ///     the policy is [`HeaderPolicy::Require`].
    pub fn open(path: &Utf8Path, options: &SourceOptions) -> Result<Self, LoaderError> {
        let (text, encoding) = read_text(path)?;
        Self::from_text(path, text, encoding, options)
    }

    /// Same as [`CsvSource::open`] on already decoded text
    pub fn from_text(
        path: &Utf8Path,
        text: String,
        encoding: TextEncoding,
        options: &SourceOptions,
    ) -> Result<Self, LoaderError> {
        let required: Vec<&str> = options.required.iter().map(String::as_str).collect();

        let (header_idx, header_line) = first_non_blank_line(&text)
            .ok_or_else(|| LoaderError::EmptyCsv(path.to_string()))?;
        let header_line = header_line.to_string();

        let (delimiter, recognized) = match options.delimiter {
            Some(delimiter) => {
                let header = split_header(&header_line, delimiter);
                (delimiter, missing_columns(&header, &required).is_empty())
            }
            None => sniff_delimiter(&text, &required)?,
        };

        let header_in_file = recognized || options.header_policy != HeaderPolicy::AssumeDefault;
        let header: Vec<String> = if header_in_file {
            ensure_unique_header_fields(split_header(&header_line, delimiter))
        } else {
            DEFAULT_MERGED_HEADER.iter().map(|c| c.to_string()).collect()
        };

        if !recognized {
            match options.header_policy {
                HeaderPolicy::Require => {
                    return Err(LoaderError::UnrecognizedHeader {
                        missing: missing_columns(&header, &required),
                        first_line: header_line,
                    });
                }
                HeaderPolicy::AssumeDefault => warn!(
                    file = %path,
                    first_line = %header_line,
                    "header not recognized, assuming the built-in merged layout"
                ),
                HeaderPolicy::FirstLine => {}
            }
        }

        let skipped_lines = if header_in_file { header_idx + 1 } else { header_idx };
        let body_start = line_start(&text, skipped_lines);

        debug!(
            file = %path,
            delimiter = %(delimiter as char).escape_default(),
            columns = header.len(),
            ?encoding,
            "opened delimited source"
        );

        Ok(CsvSource {
            path: path.to_path_buf(),
            text,
            body_start,
            body_line_offset: skipped_lines as u64,
            layout: SourceLayout {
                encoding,
                delimiter,
                header: header.into(),
                header_in_file,
            },
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    pub fn header(&self) -> &[String] {
        &self.layout.header
    }

    /// Iterate over the data rows.
    ///
    /// Blank lines are skipped. A row read as a single field containing the delimiter (a
    /// whole line wrapped in quotes) is split again. Malformed rows yield an error item and
    /// iteration continues.
    pub fn rows(&self) -> impl Iterator<Item = Result<RawRow, LoaderError>> + '_ {
        let delimiter = self.layout.delimiter;
        let header = self.layout.header.clone();
        let offset = self.body_line_offset;

        csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(self.text[self.body_start..].as_bytes())
            .into_records()
            .map(move |result| {
                let record = result.map_err(|source| LoaderError::MalformedRow {
                    line: source.position().map_or(0, |pos| pos.line() + offset),
                    source,
                })?;
                let line = record.position().map_or(0, |pos| pos.line()) + offset;
                let record = unwrap_single_field(record, delimiter, header.len())
                    .map_err(|source| LoaderError::MalformedRow { line, source })?;
                Ok(RawRow::new(line, &header, &record, delimiter))
            })
    }
}

/// Byte offset of the start of line `line_idx` (0-based)
fn line_start(text: &str, line_idx: usize) -> usize {
    if line_idx == 0 {
        return 0;
    }
    text.match_indices('\n')
        .nth(line_idx - 1)
        .map_or(text.len(), |(idx, _)| idx + 1)
}

fn unwrap_single_field(
    record: csv::StringRecord,
    delimiter: u8,
    expected: usize,
) -> Result<csv::StringRecord, csv::Error> {
    if expected <= 1 || record.len() != 1 || !record[0].contains(delimiter as char) {
        return Ok(record);
    }
    let mut inner = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(record[0].as_bytes());
    match inner.records().next() {
        Some(parsed) => parsed,
        None => Ok(record),
    }
}

#[cfg(test)]
mod csv_source_test {
    use super::*;

    fn source(text: &str, policy: HeaderPolicy) -> Result<CsvSource, LoaderError> {
        CsvSource::from_text(
            Utf8Path::new("test.csv"),
            text.to_string(),
            TextEncoding::Utf8,
            &SourceOptions::new(&["id", "spkid"], policy),
        )
    }

    #[test]
    fn test_rows_are_keyed_by_normalized_header() {
        let src = source("\nID;SpkId;Name\n\na1;42;Eros\n", HeaderPolicy::Require).unwrap();
        assert_eq!(src.layout().delimiter, b';');

        let rows: Vec<RawRow> = src.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some("a1"));
        assert_eq!(rows[0].get("spkid"), Some("42"));
        assert_eq!(rows[0].get("name"), Some("Eros"));
        assert_eq!(rows[0].line, 4);
        assert_eq!(rows[0].raw(), "a1;42;Eros");
    }

    #[test]
    fn test_unrecognized_header_fails_by_default() {
        let err = source("name,diameter\nEros,16.8\n", HeaderPolicy::Require).unwrap_err();
        assert_eq!(
            err,
            LoaderError::UnrecognizedHeader {
                missing: vec!["id".to_string(), "spkid".to_string()],
                first_line: "name,diameter".to_string(),
            }
        );
    }

    #[test]
    fn test_assume_default_reads_first_line_as_data() {
        let src = source("a1;2000433;433 Eros\n", HeaderPolicy::AssumeDefault).unwrap();
        assert!(!src.layout().header_in_file);
        let rows: Vec<RawRow> = src.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some("a1"));
        assert_eq!(rows[0].get("full_name"), Some("433 Eros"));
        assert_eq!(rows[0].get("pdes"), None);
    }

    #[test]
    fn test_quoted_line_is_split_again() {
        let src = source("id,spkid,name\n\"a1,42,Eros\"\n", HeaderPolicy::Require).unwrap();
        let rows: Vec<RawRow> = src.rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0].width, 3);
        assert_eq!(rows[0].get("name"), Some("Eros"));
    }

    #[test]
    fn test_first_of_skips_blank_values() {
        let row = RawRow::from_pairs(2, [("h", ""), ("abs_mag", "17.5")]);
        assert_eq!(row.first_of(&["h", "abs_mag"]), Some("17.5"));
        assert_eq!(row.first_of(&["missing"]), None);
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(
            source("\n  \n", HeaderPolicy::Require),
            Err(LoaderError::EmptyCsv(_))
        ));
    }
}
