//! # MPCORB-only orbit loader
//!
//! Loads the orbits of a comma-separated MPCORB extract (`designation`, packed `epoch`,
//! `mean_anomaly`, `arg_perihelion`, `long_asc_node`, `inclination`, `eccentricity`,
//! `mean_motion`, `semi_major_axis`, `rms_residual`, `uncertainty`, `orbit_type`, ...) and
//! links each one to an asteroid already in the catalogue.
//!
//! ## Linking
//! -----------------
//! MPCORB has no JPL identifiers, so the only link is the principal designation. The
//! designation is tried verbatim (`"00433"`) then in integer form (`"433"`). Because this
//! rule can attach an orbit to the wrong body for provisional designations, the loader is
//! disabled unless [`MpcorbOptions::allow_link`] is set.
//!
//! Orbit identifiers are `MPC:<designation>`; an orbit already stored is left untouched.
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::catalog::{
    MissingElements, NeoDatabase, OrbitClass, OrbitOutcome,
};
use crate::csv_source::row::{class_from_row, orbit_from_row};
use crate::csv_source::{CsvSource, HeaderPolicy, RawRow, SourceOptions};
use crate::ingest::progress::RowProgress;
use crate::ingest::{ErrorSample, ErrorTally};
use crate::loader_errors::LoaderError;
use crate::orb_elem::{complete_epoch, derive_missing_elements};

/// Class given to MPCORB orbits without `orbit_type`
pub const UNKNOWN_CLASS: &str = "UNK";

/// Knobs of [`load_mpcorb`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpcorbOptions {
    /// Accept linking orbits to asteroids by principal designation
    pub allow_link: bool,
    pub missing_elements: MissingElements,
    /// Inserted orbits between two commits
    pub commit_every: u64,
}

impl Default for MpcorbOptions {
    fn default() -> Self {
        MpcorbOptions {
            allow_link: false,
            missing_elements: MissingElements::ZeroFill,
            commit_every: 20_000,
        }
    }
}

/// Outcome of [`load_mpcorb`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MpcorbReport {
    pub source: Utf8PathBuf,
    /// `false` when the run was refused because linking was not allowed
    pub enabled: bool,
    pub processed: u64,
    pub inserted: u64,
    pub skipped_exists: u64,
    pub skipped_no_asteroid: u64,
    pub skipped_bad_row: u64,
    pub errors: ErrorTally,
}

impl fmt::Display for MpcorbReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return writeln!(f, "MPCORB load of {} disabled (linking not allowed)", self.source);
        }
        writeln!(f, "MPCORB load of {} finished", self.source)?;
        writeln!(f, "  rows processed: {}", self.processed)?;
        writeln!(f, "  orbits inserted: {}", self.inserted)?;
        writeln!(f, "  skipped (orbit exists): {}", self.skipped_exists)?;
        writeln!(f, "  skipped (no asteroid): {}", self.skipped_no_asteroid)?;
        writeln!(f, "  skipped (bad row): {}", self.skipped_bad_row)?;
        self.errors.write_summary(f)
    }
}

/// Candidate `pdes` values for an MPCORB designation: verbatim, then as an integer
pub fn pdes_candidates(designation: &str) -> Vec<String> {
    let mut candidates = vec![designation.to_string()];
    if let Ok(number) = designation.parse::<u64>() {
        let plain = number.to_string();
        if plain != designation {
            candidates.push(plain);
        }
    }
    candidates
}

enum RowOutcome {
    Inserted,
    Exists,
    NoAsteroid,
    BadRow,
}

/// Load an MPCORB extract.
///
/// Arguments
/// -----------------
/// * `db`: the catalogue database
/// * `path`: the comma-separated MPCORB file
/// * `options`: linking switch, missing-element policy and commit interval
///
/// Return
/// ----------
/// * The run summary. When linking is not allowed nothing is read and the report has
///   `enabled == false`.
pub fn load_mpcorb(
    db: &NeoDatabase,
    path: &Utf8Path,
    options: &MpcorbOptions,
) -> Result<MpcorbReport, LoaderError> {
    let mut report = MpcorbReport {
        source: path.to_path_buf(),
        ..Default::default()
    };
    if !options.allow_link {
        warn!(file = %path, "MPCORB load disabled: no reliable rule to link orbits to asteroids");
        return Ok(report);
    }
    report.enabled = true;

    let source = CsvSource::open(
        path,
        &SourceOptions::new(&["designation"], HeaderPolicy::FirstLine).with_delimiter(b','),
    )?;
    let width = source.header().len();
    info!(file = %path, columns = width, "loading MPCORB orbits");

    let progress = RowProgress::start("mpcorb");
    db.begin()?;
    for row in source.rows() {
        let row = match row {
            Ok(row) if row.width == width => row,
            _ => {
                report.skipped_bad_row += 1;
                continue;
            }
        };
        report.processed += 1;

        match load_row(db, &row, options) {
            Ok(RowOutcome::Inserted) => {
                report.inserted += 1;
                if options.commit_every > 0 && report.inserted % options.commit_every == 0 {
                    db.commit()?;
                    db.begin()?;
                }
            }
            Ok(RowOutcome::Exists) => report.skipped_exists += 1,
            Ok(RowOutcome::NoAsteroid) => report.skipped_no_asteroid += 1,
            Ok(RowOutcome::BadRow) => report.skipped_bad_row += 1,
            Err(err) => {
                warn!(line = row.line, error = %err, designation = ?row.get("designation"), "MPCORB row failed");
                report.errors.record(ErrorSample {
                    line: row.line,
                    neo_id: None,
                    spkid: None,
                    orbit_id: row.get("designation").map(|d| format!("MPC:{}", d.trim())),
                    message: err.to_string(),
                });
            }
        }
        progress.row_done(report.errors.count);
    }
    db.commit()?;
    progress.finish();

    info!(
        processed = report.processed,
        inserted = report.inserted,
        errors = report.errors.count,
        "MPCORB load finished"
    );
    Ok(report)
}

fn load_row(
    db: &NeoDatabase,
    row: &RawRow,
    options: &MpcorbOptions,
) -> Result<RowOutcome, LoaderError> {
    let Some(designation) = row.get("designation").map(str::trim).filter(|d| !d.is_empty())
    else {
        return Ok(RowOutcome::BadRow);
    };

    let orbit_id = format!("MPC:{designation}");
    if db.orbit_exists(&orbit_id)? {
        return Ok(RowOutcome::Exists);
    }

    let mut owner = None;
    for pdes in pdes_candidates(designation) {
        owner = db.asteroid_id_by_pdes(&pdes)?;
        if owner.is_some() {
            break;
        }
    }
    let Some(owner) = owner else {
        return Ok(RowOutcome::NoAsteroid);
    };

    let class = class_from_row(row).unwrap_or_else(|| OrbitClass {
        code: UNKNOWN_CLASS.to_string(),
        description: UNKNOWN_CLASS.to_string(),
    });
    db.ensure_class(&class)?;

    let mut orbit = orbit_from_row(row, orbit_id);
    // MPCORB carries the epoch packed in the `epoch` column
    orbit.epoch = None;
    complete_epoch(&mut orbit, row.get("epoch"));
    orbit.id_internal = Some(owner);
    orbit.class = Some(class.code);
    derive_missing_elements(&mut orbit);

    match db.upsert_orbit(orbit, options.missing_elements)? {
        OrbitOutcome::Inserted => Ok(RowOutcome::Inserted),
        OrbitOutcome::Merged | OrbitOutcome::SkippedForeignOwner { .. } => Ok(RowOutcome::Exists),
    }
}
