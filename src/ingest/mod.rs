//! # Catalogue ingestion
//!
//! Entry points turning catalogue exports into catalogue entities:
//!
//! * [`neo_csv::load_neo_mpcorb_csv`]: merged NEO + MPCORB export into the database,
//! * [`mpcorb::load_mpcorb`]: MPCORB-only orbits linked to existing asteroids,
//! * [`catalog_builder::build_data_from_csv`]: the same merge performed in memory,
//! * [`sql_script`]: rendering of an in-memory catalogue as a T-SQL insert script.
//!
//! Database importers never abort on a bad row: the failure is counted, sampled, aggregated
//! by message in the [`ImportReport`] and, when the `Load_Error` table exists, logged there.
pub mod catalog_builder;
pub mod mpcorb;
pub mod neo_csv;
mod progress;
pub mod sql_script;

use std::fmt;

use ahash::AHashMap;
use camino::Utf8PathBuf;
use itertools::Itertools;

use crate::catalog::MissingElements;
use crate::constants::{COMMIT_EVERY, MAX_ERROR_SAMPLES, MAX_TOP_ERRORS};
use crate::csv_source::HeaderPolicy;

/// Knobs of a database import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub header_policy: HeaderPolicy,
    pub missing_elements: MissingElements,
    /// Rows processed between two commits
    pub commit_every: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            header_policy: HeaderPolicy::Require,
            missing_elements: MissingElements::KeepNull,
            commit_every: COMMIT_EVERY,
        }
    }
}

/// First failures of a run, with the keys of the offending row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSample {
    pub line: u64,
    pub neo_id: Option<String>,
    pub spkid: Option<String>,
    pub orbit_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ErrorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "line {}: id={} spkid={} orbit_id={}: {}",
            self.line,
            show(&self.neo_id),
            show(&self.spkid),
            show(&self.orbit_id),
            self.message
        )
    }
}

/// Failure bookkeeping shared by the importers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTally {
    pub count: u64,
    pub samples: Vec<ErrorSample>,
    by_message: AHashMap<String, u64>,
}

impl ErrorTally {
    pub fn record(&mut self, sample: ErrorSample) {
        self.count += 1;
        *self.by_message.entry(sample.message.clone()).or_insert(0) += 1;
        if self.samples.len() < MAX_ERROR_SAMPLES {
            self.samples.push(sample);
        }
    }

    /// The most frequent messages, most frequent first (ties in message order)
    pub fn top_messages(&self) -> Vec<(String, u64)> {
        self.by_message
            .iter()
            .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
            .take(MAX_TOP_ERRORS)
            .map(|(message, count)| (message.clone(), *count))
            .collect()
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  errors: {}", self.count)?;
        if !self.samples.is_empty() {
            writeln!(f, "  first errors:")?;
            for sample in &self.samples {
                writeln!(f, "    {sample}")?;
            }
            writeln!(f, "  most frequent errors:")?;
            for (message, count) in self.top_messages() {
                writeln!(f, "    {count} x {message}")?;
            }
        }
        Ok(())
    }
}

/// Outcome of [`neo_csv::load_neo_mpcorb_csv`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub source: Utf8PathBuf,
    pub rows_read: u64,
    pub asteroids_inserted: u64,
    pub asteroids_updated: u64,
    pub orbits_inserted: u64,
    pub orbits_merged: u64,
    /// Orbits left untouched because another asteroid owns them
    pub orbits_skipped: u64,
    pub classes_created: u64,
    /// Rows carrying neither `id` nor `spkid`
    pub missing_keys: u64,
    /// Rows that could not be attached to any asteroid
    pub unattached_rows: u64,
    pub errors: ErrorTally,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Import of {} finished", self.source)?;
        writeln!(f, "  rows read: {}", self.rows_read)?;
        writeln!(
            f,
            "  asteroids: {} inserted, {} updated",
            self.asteroids_inserted, self.asteroids_updated
        )?;
        writeln!(
            f,
            "  orbits: {} inserted, {} merged, {} skipped (owned by another asteroid)",
            self.orbits_inserted, self.orbits_merged, self.orbits_skipped
        )?;
        writeln!(f, "  classes created: {}", self.classes_created)?;
        writeln!(f, "  rows without id/spkid: {}", self.missing_keys)?;
        writeln!(f, "  rows without any asteroid key: {}", self.unattached_rows)?;
        self.errors.write_summary(f)
    }
}

#[cfg(test)]
mod ingest_test {
    use super::*;

    fn sample(line: u64, message: &str) -> ErrorSample {
        ErrorSample {
            line,
            neo_id: None,
            spkid: None,
            orbit_id: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_error_tally_samples_and_top_messages() {
        let mut tally = ErrorTally::default();
        for line in 0..8 {
            tally.record(sample(line, if line % 3 == 0 { "a" } else { "b" }));
        }
        tally.record(sample(9, "c"));

        assert_eq!(tally.count, 9);
        assert_eq!(tally.samples.len(), 5);
        assert_eq!(tally.samples[0].line, 0);
        assert_eq!(
            tally.top_messages(),
            vec![
                ("b".to_string(), 5),
                ("a".to_string(), 3),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_report_display() {
        let mut report = ImportReport {
            source: Utf8PathBuf::from("neo.csv"),
            rows_read: 2,
            asteroids_inserted: 1,
            ..Default::default()
        };
        report.errors.record(sample(3, "UNIQUE constraint failed"));
        let text = report.to_string();
        assert!(text.contains("Import of neo.csv finished"));
        assert!(text.contains("asteroids: 1 inserted, 0 updated"));
        assert!(text.contains("line 3: id=- spkid=- orbit_id=-: UNIQUE constraint failed"));
        assert!(text.contains("1 x UNIQUE constraint failed"));
    }
}
