//! # Encoding and delimiter detection
//!
//! Catalogue exports come from spreadsheets, database dumps and scripts, so neither the text
//! encoding nor the field delimiter can be assumed.
//!
//! ## Encoding
//! -----------------
//! The first [`SNIFF_BYTES`] bytes decide:
//!
//! | Leading bytes | Encoding |
//! |---------------|----------|
//! | `FF FE`       | UTF-16 little endian |
//! | `FE FF`       | UTF-16 big endian |
//! | `EF BB BF`    | UTF-8 with BOM |
//! | any `00`      | UTF-16 (little endian assumed) |
//! | otherwise     | UTF-8 |
//!
//! Decoding is lossy: invalid sequences become U+FFFD instead of failing the import.
//!
//! ## Delimiter
//! -----------------
//! The header line is split on each of [`CANDIDATE_DELIMITERS`] in turn; the first split that
//! exposes all required columns wins. When none does, a frequency heuristic over the first
//! [`SNIFF_LINES`] non-blank lines picks the delimiter.
use std::io::Read;

use camino::Utf8Path;
use itertools::Itertools;

use crate::constants::{CANDIDATE_DELIMITERS, SNIFF_BYTES, SNIFF_LINES};
use crate::csv_source::header::{missing_columns, split_header};
use crate::loader_errors::LoaderError;

/// Text encoding of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

/// Guess the encoding from the leading bytes of a file
pub fn detect_encoding(head: &[u8]) -> TextEncoding {
    let head = &head[..head.len().min(SNIFF_BYTES)];
    if head.starts_with(&[0xFF, 0xFE]) {
        TextEncoding::Utf16Le
    } else if head.starts_with(&[0xFE, 0xFF]) {
        TextEncoding::Utf16Be
    } else if head.starts_with(&[0xEF, 0xBB, 0xBF]) {
        TextEncoding::Utf8Bom
    } else if head.contains(&0) {
        TextEncoding::Utf16Le
    } else {
        TextEncoding::Utf8
    }
}

/// Decode a whole file content, dropping any byte-order mark.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    let text = match encoding {
        TextEncoding::Utf8 | TextEncoding::Utf8Bom => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| match encoding {
                    TextEncoding::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
                    _ => u16::from_le_bytes([pair[0], pair[1]]),
                })
                .collect();
            String::from_utf16_lossy(&units)
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Read and decode a text file with encoding detection.
///
/// Return
/// ----------
/// * The decoded text and the detected encoding, or [`LoaderError::IoError`] when the file
///   cannot be read.
pub fn read_text(path: &Utf8Path) -> Result<(String, TextEncoding), LoaderError> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    let encoding = detect_encoding(&bytes);
    Ok((decode(&bytes, encoding), encoding))
}

/// Delimiter whose split of `header_line` contains every `required` column.
///
/// Candidates are tried in the order tab, `;`, `,`, `|`.
pub fn delimiter_from_header(header_line: &str, required: &[&str]) -> Option<u8> {
    CANDIDATE_DELIMITERS.into_iter().find(|&delimiter| {
        let header = split_header(header_line, delimiter);
        missing_columns(&header, required).is_empty()
    })
}

/// Frequency heuristic used when the header does not reveal the delimiter.
///
/// Over the first [`SNIFF_LINES`] non-blank lines:
/// 1. `;` if the first line contains one and it is at least as frequent there as `,`
/// 2. otherwise tab if the first line contains one
/// 3. otherwise `,` if the first line contains one
/// 4. otherwise the most frequent candidate over all sampled lines
/// 5. `;` when nothing matches at all
pub fn guess_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let Some(first) = sample.first() else {
        return b';';
    };
    let count = |line: &str, delimiter: u8| line.bytes().filter(|&b| b == delimiter).count();

    let semicolons = count(first, b';');
    let commas = count(first, b',');
    if semicolons > 0 && semicolons >= commas {
        return b';';
    }
    if count(first, b'\t') > 0 {
        return b'\t';
    }
    if commas > 0 {
        return b',';
    }

    CANDIDATE_DELIMITERS
        .into_iter()
        .map(|delimiter| {
            let total: usize = sample.iter().map(|line| count(line, delimiter)).sum();
            (delimiter, total)
        })
        .filter(|(_, total)| *total > 0)
        .max_set_by_key(|(_, total)| *total)
        .first()
        .map(|(delimiter, _)| *delimiter)
        .unwrap_or(b';')
}

/// First non-blank line of a text with its zero-based line index
pub fn first_non_blank_line(text: &str) -> Option<(usize, &str)> {
    text.lines()
        .enumerate()
        .find(|(_, line)| !line.trim().is_empty())
}

/// Detect the delimiter of a decoded text whose first non-blank line is a header.
///
/// Return
/// ----------
/// * The delimiter and whether the header exposed every required column with it.
pub fn sniff_delimiter(text: &str, required: &[&str]) -> Result<(u8, bool), LoaderError> {
    let (_, header_line) =
        first_non_blank_line(text).ok_or_else(|| LoaderError::EmptyCsv("no non-blank line".into()))?;
    Ok(match delimiter_from_header(header_line, required) {
        Some(delimiter) => (delimiter, true),
        None => (guess_delimiter(text), false),
    })
}

#[cfg(test)]
mod sniffer_test {
    use super::*;

    #[test]
    fn test_detect_encoding() {
        assert_eq!(detect_encoding(&[0xFF, 0xFE, b'i', 0]), TextEncoding::Utf16Le);
        assert_eq!(detect_encoding(&[0xFE, 0xFF, 0, b'i']), TextEncoding::Utf16Be);
        assert_eq!(detect_encoding(&[0xEF, 0xBB, 0xBF, b'i']), TextEncoding::Utf8Bom);
        assert_eq!(detect_encoding(b"i\0d\0"), TextEncoding::Utf16Le);
        assert_eq!(detect_encoding(b"id;spkid"), TextEncoding::Utf8);
    }

    #[test]
    fn test_decode_strips_bom() {
        let utf16: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("id,spkid".encode_utf16().flat_map(|u| u.to_le_bytes()))
            .collect();
        assert_eq!(decode(&utf16, TextEncoding::Utf16Le), "id,spkid");

        let utf16be: Vec<u8> = "ab".encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        assert_eq!(decode(&utf16be, TextEncoding::Utf16Be), "ab");

        assert_eq!(decode(b"\xEF\xBB\xBFid", TextEncoding::Utf8Bom), "id");
    }

    #[test]
    fn test_delimiter_from_header() {
        let required = ["id", "spkid"];
        assert_eq!(delimiter_from_header("id\tspkid\tname", &required), Some(b'\t'));
        assert_eq!(delimiter_from_header("ID;SPKID", &required), Some(b';'));
        assert_eq!(delimiter_from_header("id,spkid,full_name", &required), Some(b','));
        assert_eq!(delimiter_from_header("id|spkid", &required), Some(b'|'));
        assert_eq!(delimiter_from_header("name,diameter", &required), None);
    }

    #[test]
    fn test_guess_delimiter() {
        assert_eq!(guess_delimiter("a;b,c\n1;2,3"), b';');
        assert_eq!(guess_delimiter("a,b,c;d\n1,2,3;4"), b',');
        assert_eq!(guess_delimiter("a\tb\n1\t2"), b'\t');
        assert_eq!(guess_delimiter("ab\nc|d|e"), b'|');
        assert_eq!(guess_delimiter("abc\ndef"), b';');
        assert_eq!(guess_delimiter(""), b';');
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(
            sniff_delimiter("\n\nid,spkid\n1,2", &["id", "spkid"]),
            Ok((b',', true))
        );
        assert_eq!(
            sniff_delimiter("name;diameter\nEros;16.8", &["id", "spkid"]),
            Ok((b';', false))
        );
        assert!(matches!(
            sniff_delimiter(" \n", &["id"]),
            Err(LoaderError::EmptyCsv(_))
        ));
    }
}
