//! Header normalization: case folding, BOM stripping and duplicate renaming.
use ahash::AHashMap;
use ahash::AHashSet;

/// Byte-order mark as it appears once decoded
const BOM: char = '\u{feff}';

/// Normalize one column name: BOM stripped, trimmed, lower-cased.
pub fn normalize_column(name: &str) -> String {
    name.trim_start_matches(BOM).trim().to_lowercase()
}

/// Split a header line on `delimiter` and normalize every column.
///
/// Quoted columns are unquoted through the `csv` reader so that `"id";"spkid"` behaves like
/// `id;spkid`.
pub fn split_header(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(normalize_column).collect(),
        _ => line
            .split(delimiter as char)
            .map(normalize_column)
            .collect(),
    }
}

/// Make every column name unique.
///
/// The first repeat of `epoch` becomes `epoch_mpc` (the merged NEO + MPCORB export carries two
/// epoch columns). Any other repeat `x` becomes `x_dup<k>`, `k` being the occurrence count,
/// bumped further if that name is itself taken. The output has the same length as the input.
pub fn ensure_unique_header_fields(fields: Vec<String>) -> Vec<String> {
    let mut occurrences: AHashMap<String, usize> = AHashMap::new();
    let mut taken: AHashSet<String> = fields.iter().cloned().collect();
    let mut seen: AHashSet<String> = AHashSet::new();

    fields
        .into_iter()
        .map(|field| {
            let count = occurrences.entry(field.clone()).or_insert(0);
            *count += 1;
            if seen.insert(field.clone()) {
                return field;
            }

            if field == "epoch" && !taken.contains("epoch_mpc") {
                taken.insert("epoch_mpc".to_string());
                return "epoch_mpc".to_string();
            }

            let mut k = *count;
            let mut candidate = format!("{field}_dup{k}");
            while taken.contains(&candidate) {
                k += 1;
                candidate = format!("{field}_dup{k}");
            }
            taken.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Columns of `required` absent from `header`
pub fn missing_columns(header: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|col| !header.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect()
}

#[cfg(test)]
mod header_test {
    use super::*;

    fn owned(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_normalize_column() {
        assert_eq!(normalize_column("\u{feff}ID "), "id");
        assert_eq!(normalize_column("  Full_Name"), "full_name");
    }

    #[test]
    fn test_split_header() {
        assert_eq!(split_header("ID;SpkId;Name", b';'), owned(&["id", "spkid", "name"]));
        assert_eq!(
            split_header("\"id\",\"spkid\"", b','),
            owned(&["id", "spkid"])
        );
    }

    #[test]
    fn test_duplicate_epoch_and_others() {
        let header = ensure_unique_header_fields(owned(&[
            "id", "epoch", "a", "epoch", "a", "a",
        ]));
        assert_eq!(
            header,
            owned(&["id", "epoch", "a", "epoch_mpc", "a_dup2", "a_dup3"])
        );
    }

    #[test]
    fn test_unique_even_with_colliding_names() {
        let header = ensure_unique_header_fields(owned(&[
            "epoch", "epoch_mpc", "epoch", "x", "x_dup2", "x", "epoch",
        ]));
        assert_eq!(header.len(), 7);
        let unique: AHashSet<&String> = header.iter().collect();
        assert_eq!(unique.len(), 7);
        assert_eq!(header[2], "epoch_dup2");
        assert_eq!(header[5], "x_dup3");
        assert_eq!(header[6], "epoch_dup3");
    }

    #[test]
    fn test_missing_columns() {
        let header = owned(&["id", "name"]);
        assert_eq!(missing_columns(&header, &["id", "spkid"]), owned(&["spkid"]));
        assert!(missing_columns(&header, &["id"]).is_empty());
    }
}
