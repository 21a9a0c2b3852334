//! # Offline catalogue builder
//!
//! Runs the merge of a merged NEO + MPCORB export entirely in memory, without a database.
//! The result feeds [`super::sql_script`], which renders it as a T-SQL insert script.
//!
//! ## Differences with the database importer
//! -----------------
//! * Surrogate keys are minted from 1 by a [`KeyCounter`].
//! * The principal designation falls back to the name part of `designation_full`
//!   ([`PdesFallback::SplitFull`]).
//! * An orbit without `orbit_id` takes `MPC:<designation>` (else `MPC:<designation_full>`);
//!   a row with none of those has no orbit.
//! * Elements stay optional while merging; zero filling happens at render time.
use std::collections::BTreeMap;

use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::catalog::{
    AsteroidRecord, FillMissing, IdentityResolver, KeyCounter, OrbitRecord,
};
use crate::constants::{IdInternal, DEFAULT_CLASS, DEFAULT_CLASS_DESCRIPTION};
use crate::csv_source::row::{
    asteroid_from_row, class_from_row, orbit_from_row, packed_epoch, PdesFallback, RowKeys,
};
use crate::csv_source::{CsvSource, HeaderPolicy, RawRow, SourceOptions};
use crate::ingest::neo_csv::NEO_KEY_COLUMNS;
use crate::loader_errors::LoaderError;
use crate::orb_elem::{complete_epoch, derive_missing_elements};

/// In-memory catalogue, every map ordered by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    /// class code -> description
    pub classes: BTreeMap<String, String>,
    pub asteroids: BTreeMap<IdInternal, AsteroidRecord>,
    pub orbits: BTreeMap<String, OrbitRecord>,
    /// Rows that could not be attached to any asteroid
    pub skipped_rows: u64,
    /// Orbits seen again under another asteroid, left untouched
    pub foreign_orbits: u64,
}

impl Catalog {
    fn add_asteroid(&mut self, id: IdInternal, mut incoming: AsteroidRecord) {
        incoming.id_internal = Some(id);
        match self.asteroids.get_mut(&id) {
            Some(current) => current.fill_missing(&incoming),
            None => {
                self.asteroids.insert(id, incoming);
            }
        }
    }

    fn add_orbit(&mut self, incoming: OrbitRecord) {
        match self.orbits.get_mut(&incoming.id_orbita) {
            Some(current) if current.id_internal != incoming.id_internal => {
                debug!(orbit = %incoming.id_orbita, "orbit already owned by another asteroid");
                self.foreign_orbits += 1;
            }
            Some(current) => current.fill_missing(&incoming),
            None => {
                if incoming.class.is_none() {
                    self.classes
                        .entry(DEFAULT_CLASS.to_string())
                        .or_insert_with(|| DEFAULT_CLASS_DESCRIPTION.to_string());
                }
                self.orbits.insert(incoming.id_orbita.clone(), incoming);
            }
        }
    }
}

/// Orbit identifier of a row: `orbit_id`, else derived from its MPC designation
fn orbit_id_of(keys: &RowKeys) -> Option<String> {
    keys.orbit_id.clone().or_else(|| {
        keys.designation
            .as_deref()
            .or(keys.designation_full.as_deref())
            .map(|designation| format!("MPC:{designation}"))
    })
}

/// Build the catalogue held by a merged NEO + MPCORB export.
///
/// Arguments
/// -----------------
/// * `path`: the CSV file; its first non-blank line is the header
///
/// Return
/// ----------
/// * The merged catalogue, or a read error ([`LoaderError::IoError`],
///   [`LoaderError::EmptyCsv`]). Malformed rows are logged and skipped.
///
/// See also
/// ------------
/// * [`super::sql_script::build_insert_blocks`] – Render the catalogue as SQL.
pub fn build_data_from_csv(path: &Utf8Path) -> Result<Catalog, LoaderError> {
    let source = CsvSource::open(
        path,
        &SourceOptions::new(&NEO_KEY_COLUMNS, HeaderPolicy::FirstLine),
    )?;

    let mut catalog = Catalog::default();
    let mut resolver = IdentityResolver::new();
    let mut counter = KeyCounter::default();

    for row in source.rows() {
        match row {
            Ok(row) => add_row(&mut catalog, &mut resolver, &mut counter, &row),
            Err(err) => warn!(file = %path, error = %err, "unreadable row skipped"),
        }
    }

    info!(
        file = %path,
        classes = catalog.classes.len(),
        asteroids = catalog.asteroids.len(),
        orbits = catalog.orbits.len(),
        "catalogue built"
    );
    Ok(catalog)
}

fn add_row(
    catalog: &mut Catalog,
    resolver: &mut IdentityResolver,
    counter: &mut KeyCounter,
    row: &RawRow,
) {
    let keys = RowKeys::from_row(row);
    let Some((id, _)) = resolver.resolve_or_mint(&keys.identity(), || counter.mint()) else {
        catalog.skipped_rows += 1;
        return;
    };

    if let Some(class) = class_from_row(row) {
        catalog.classes.entry(class.code).or_insert(class.description);
    }
    catalog.add_asteroid(id, asteroid_from_row(row, &keys, PdesFallback::SplitFull));

    let Some(orbit_id) = orbit_id_of(&keys) else {
        return;
    };
    let mut orbit = orbit_from_row(row, orbit_id);
    complete_epoch(&mut orbit, packed_epoch(row).as_deref());
    derive_missing_elements(&mut orbit);
    orbit.id_internal = Some(id);
    catalog.add_orbit(orbit);
}
