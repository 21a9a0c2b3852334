//! # Merged NEO + MPCORB importer
//!
//! [`load_neo_mpcorb_csv`] runs the complete ingestion pipeline on one file:
//!
//! 1. open the file (encoding, delimiter and header detection),
//! 2. seed the identity resolver and the synthetic orbit sequence from the database,
//! 3. for every row: register its orbital class, resolve and upsert its asteroid, then
//!    complete, derive and upsert its orbit,
//! 4. commit every [`ImportOptions::commit_every`] rows and at the end of the file.
//!
//! Per-row failures are recorded and never stop the run. Rows already written when a later
//! statement of the same row fails stay written.
//!
//! ## Orbits
//! -----------------
//! A row only produces an orbit when it has an `orbit_id` or carries orbital content
//! (an epoch or at least one element). Rows with content but no identifier get the next
//! `MPC<n>` identifier, the sequence continuing after the highest one already stored.
use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::catalog::{
    IdentityResolver, LoadErrorEntry, NeoDatabase, OrbitOutcome, Resolution, UpsertAction,
};
use crate::constants::{IdInternal, SYNTHETIC_ORBIT_PREFIX};
use crate::csv_source::row::{
    asteroid_from_row, class_from_row, orbit_from_row, packed_epoch, PdesFallback, RowKeys,
};
use crate::csv_source::{CsvSource, RawRow, SourceOptions};
use crate::ingest::progress::RowProgress;
use crate::ingest::{ErrorSample, ImportOptions, ImportReport};
use crate::loader_errors::LoaderError;
use crate::orb_elem::{complete_epoch, derive_missing_elements};

/// Columns identifying a merged NEO export
pub const NEO_KEY_COLUMNS: [&str; 2] = ["id", "spkid"];

/// Import a merged NEO + MPCORB CSV file into the catalogue.
///
/// Arguments
/// -----------------
/// * `db`: the catalogue database
/// * `path`: the CSV file
/// * `options`: header policy, missing-element policy and commit interval
///
/// Return
/// ----------
/// * The run summary, or a fatal error: unreadable or empty file
///   ([`LoaderError::IoError`], [`LoaderError::EmptyCsv`]), unrecognized header
///   ([`LoaderError::UnrecognizedHeader`]) or a failed commit.
pub fn load_neo_mpcorb_csv(
    db: &NeoDatabase,
    path: &Utf8Path,
    options: &ImportOptions,
) -> Result<ImportReport, LoaderError> {
    let source = CsvSource::open(
        path,
        &SourceOptions::new(&NEO_KEY_COLUMNS, options.header_policy),
    )?;
    info!(
        file = %path,
        database = db.location(),
        columns = source.header().len(),
        "importing merged NEO/MPCORB file"
    );

    let mut run = NeoImport::new(db, path, options)?;
    let progress = RowProgress::start("neo");

    db.begin()?;
    for row in source.rows() {
        run.report.rows_read += 1;
        match row {
            Ok(row) => {
                if let Err(err) = run.ingest(&row) {
                    run.record_failure(&row, &err);
                }
            }
            Err(err) => run.record_unreadable(&err),
        }

        progress.row_done(run.report.errors.count);
        if options.commit_every > 0 && run.report.rows_read % options.commit_every as u64 == 0 {
            db.commit()?;
            debug!(rows = run.report.rows_read, "checkpoint committed");
            db.begin()?;
        }
    }
    db.commit()?;
    progress.finish();

    info!(
        rows = run.report.rows_read,
        asteroids_inserted = run.report.asteroids_inserted,
        orbits_inserted = run.report.orbits_inserted,
        errors = run.report.errors.count,
        "import finished"
    );
    Ok(run.report)
}

struct NeoImport<'a> {
    db: &'a NeoDatabase,
    options: &'a ImportOptions,
    source_name: String,
    resolver: IdentityResolver,
    next_sequence: i64,
    log_errors: bool,
    report: ImportReport,
}

impl<'a> NeoImport<'a> {
    fn new(
        db: &'a NeoDatabase,
        path: &Utf8Path,
        options: &'a ImportOptions,
    ) -> Result<Self, LoaderError> {
        let resolver = IdentityResolver::from_existing(db.identity_snapshot()?);
        let next_sequence = db.next_orbit_sequence()?;
        let log_errors = db.table_exists("Load_Error")?;
        debug!(
            known_keys = resolver.len(),
            next_sequence, log_errors, "import state seeded"
        );

        Ok(NeoImport {
            db,
            options,
            source_name: path.file_name().unwrap_or(path.as_str()).to_string(),
            resolver,
            next_sequence,
            log_errors,
            report: ImportReport {
                source: path.to_path_buf(),
                ..Default::default()
            },
        })
    }

    fn ingest(&mut self, row: &RawRow) -> Result<(), LoaderError> {
        let keys = RowKeys::from_row(row);
        let identity = keys.identity();
        if identity.lacks_natural_keys() {
            self.report.missing_keys += 1;
        }

        let class = class_from_row(row);
        if let Some(class) = &class {
            if self.db.ensure_class(class)? {
                self.report.classes_created += 1;
            }
        }

        let owner = match self.resolver.resolve(&identity) {
            Resolution::Unidentifiable => {
                self.report.unattached_rows += 1;
                None
            }
            resolution => {
                let asteroid = asteroid_from_row(row, &keys, PdesFallback::Designation);
                let (action, id) = self.db.upsert_asteroid(
                    resolution.id(),
                    &asteroid,
                    self.options.missing_elements,
                )?;
                self.resolver.register(&identity, id);
                match action {
                    UpsertAction::Inserted => self.report.asteroids_inserted += 1,
                    UpsertAction::Updated => self.report.asteroids_updated += 1,
                }
                Some(id)
            }
        };

        self.ingest_orbit(row, keys.orbit_id, owner)
    }

    fn ingest_orbit(
        &mut self,
        row: &RawRow,
        orbit_id: Option<String>,
        owner: Option<IdInternal>,
    ) -> Result<(), LoaderError> {
        let mut orbit = orbit_from_row(row, orbit_id.clone().unwrap_or_default());
        let epoch_mpc = packed_epoch(row);
        complete_epoch(&mut orbit, epoch_mpc.as_deref());

        if orbit_id.is_none() {
            if !orbit.has_content() {
                return Ok(());
            }
            orbit.id_orbita = format!("{SYNTHETIC_ORBIT_PREFIX}{}", self.next_sequence);
            self.next_sequence += 1;
        }

        orbit.id_internal = owner;
        derive_missing_elements(&mut orbit);

        match self.db.upsert_orbit(orbit, self.options.missing_elements)? {
            OrbitOutcome::Inserted => self.report.orbits_inserted += 1,
            OrbitOutcome::Merged => self.report.orbits_merged += 1,
            OrbitOutcome::SkippedForeignOwner { .. } => self.report.orbits_skipped += 1,
        }
        Ok(())
    }

    fn record_failure(&mut self, row: &RawRow, err: &LoaderError) {
        let message = err.to_string();
        warn!(line = row.line, error = %message, "row failed");

        self.report.errors.record(ErrorSample {
            line: row.line,
            neo_id: row.get("id").map(str::to_string),
            spkid: row.get("spkid").map(str::to_string),
            orbit_id: row.get("orbit_id").map(str::to_string),
            message: message.clone(),
        });

        if self.log_errors {
            let entry = LoadErrorEntry {
                source_file: &self.source_name,
                row_number: row.line,
                entity: "Loader",
                message: &format!("Unhandled error: {message}"),
                raw_data: row.raw(),
            };
            if let Err(log_err) = self.db.log_load_error(&entry) {
                warn!(line = row.line, error = %log_err, "could not write Load_Error");
            }
        }
    }

    fn record_unreadable(&mut self, err: &LoaderError) {
        let line = match err {
            LoaderError::MalformedRow { line, .. } => *line,
            _ => 0,
        };
        warn!(line, error = %err, "unreadable row");
        self.report.errors.record(ErrorSample {
            line,
            neo_id: None,
            spkid: None,
            orbit_id: None,
            message: err.to_string(),
        });
    }
}
