//! # SQLite catalogue store
//!
//! [`NeoDatabase`] owns one `rusqlite` connection and exposes the catalogue operations used
//! by the importers, the alert tools and the monitoring snapshot. Every statement uses
//! positional `?` placeholders.
//!
//! ## Schema
//! -----------------
//! The schema is created on open (`CREATE TABLE IF NOT EXISTS`). Surrogate keys of
//! `Asteroid` and `Alert` are `INTEGER PRIMARY KEY AUTOINCREMENT` columns, so concurrent
//! writers can never mint the same key. Orbital elements are nullable.
//!
//! The `Load_Error` table is optional: it only exists once [`NeoDatabase::enable_error_log`]
//! has been called, and importers check for it before logging row failures.
//!
//! ## Merging
//! -----------------
//! Upserts read the stored row, apply [`FillMissing`] and write every column back, so the
//! fill-absent-only policy lives in a single place for the database and the offline builder.
use std::time::Duration;

use camino::Utf8Path;
use itertools::Itertools;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::catalog::merge::{
    apply_asteroid_defaults, apply_insert_defaults, FillMissing, MissingElements,
};
use crate::catalog::records::{
    AsteroidRecord, OrbitClass, OrbitOutcome, OrbitRecord, OrbitSigmas, UpsertAction, YesNo,
};
use crate::constants::{
    IdInternal, SpkId, DEFAULT_CLASS, DEFAULT_CLASS_DESCRIPTION, MAX_RAW_ROW_CHARS,
    SYNTHETIC_ORBIT_PREFIX,
};
use crate::conversion::truncate_chars;
use crate::loader_errors::LoaderError;
use crate::time::CalendarDate;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Class_Orbital (
    class             TEXT PRIMARY KEY,
    class_description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Asteroid (
    id_internal        INTEGER PRIMARY KEY AUTOINCREMENT,
    neo_id             TEXT UNIQUE,
    spkid              INTEGER UNIQUE,
    full_name          TEXT,
    pdes               TEXT,
    name               TEXT,
    prefix             TEXT,
    neo_flag           TEXT,
    pha_flag           TEXT,
    diameter           REAL,
    absolute_magnitude REAL,
    albedo             REAL,
    diameter_sigma     REAL,
    created_at         TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_asteroid_pdes ON Asteroid (pdes);

CREATE TABLE IF NOT EXISTS Orbit (
    id_orbita         TEXT PRIMARY KEY,
    id_internal       INTEGER REFERENCES Asteroid (id_internal),
    class             TEXT REFERENCES Class_Orbital (class),
    epoch             REAL,
    epoch_mjd         REAL,
    epoch_cal         TEXT,
    equinox           TEXT,
    rms               REAL,
    moid              REAL,
    moid_ld           REAL,
    e                 REAL,
    a                 REAL,
    q                 REAL,
    i                 REAL,
    om                REAL,
    w                 REAL,
    ma                REAL,
    ad                REAL,
    n                 REAL,
    tp                REAL,
    tp_cal            TEXT,
    per               REAL,
    per_y             REAL,
    orbit_uncertainty INTEGER,
    condition_code    INTEGER,
    sigma_e           REAL,
    sigma_a           REAL,
    sigma_q           REAL,
    sigma_i           REAL,
    sigma_om          REAL,
    sigma_w           REAL,
    sigma_ma          REAL,
    sigma_ad          REAL,
    sigma_n           REAL,
    sigma_tp          REAL,
    sigma_per         REAL
);
CREATE INDEX IF NOT EXISTS idx_orbit_owner ON Orbit (id_internal);

CREATE TABLE IF NOT EXISTS Priority (
    id_priority INTEGER PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Level (
    id_level    INTEGER PRIMARY KEY,
    color       TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Alert (
    id_alert         INTEGER PRIMARY KEY AUTOINCREMENT,
    data_generation  TEXT NOT NULL,
    criteria_trigger TEXT NOT NULL,
    id_internal      INTEGER NOT NULL REFERENCES Asteroid (id_internal),
    id_priority      INTEGER NOT NULL REFERENCES Priority (id_priority),
    id_level         INTEGER NOT NULL REFERENCES Level (id_level)
);
"#;

const LOAD_ERROR_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Load_Error (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    source_file   TEXT,
    row_number    INTEGER,
    entity        TEXT,
    error_message TEXT,
    raw_data      TEXT,
    logged_at     TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const ASTEROID_COLUMNS: [&str; 14] = [
    "id_internal",
    "neo_id",
    "spkid",
    "full_name",
    "pdes",
    "name",
    "prefix",
    "neo_flag",
    "pha_flag",
    "diameter",
    "absolute_magnitude",
    "albedo",
    "diameter_sigma",
    "created_at",
];

const ORBIT_COLUMNS: [&str; 36] = [
    "id_orbita",
    "id_internal",
    "class",
    "epoch",
    "epoch_mjd",
    "epoch_cal",
    "equinox",
    "rms",
    "moid",
    "moid_ld",
    "e",
    "a",
    "q",
    "i",
    "om",
    "w",
    "ma",
    "ad",
    "n",
    "tp",
    "tp_cal",
    "per",
    "per_y",
    "orbit_uncertainty",
    "condition_code",
    "sigma_e",
    "sigma_a",
    "sigma_q",
    "sigma_i",
    "sigma_om",
    "sigma_w",
    "sigma_ma",
    "sigma_ad",
    "sigma_n",
    "sigma_tp",
    "sigma_per",
];

const PRIORITIES: [(i64, &str); 3] = [(1, "High"), (2, "Medium"), (3, "Low")];

const LEVELS: [(i64, &str, &str); 4] = [
    (1, "G", "Green"),
    (2, "Y", "Yellow"),
    (3, "O", "Orange"),
    (4, "R", "Red"),
];

impl ToSql for CalendarDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for CalendarDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: String| FromSqlError::Other(err.into()))
    }
}

impl ToSql for YesNo {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for YesNo {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Ok(YesNo::from_char(crate::conversion::norm_flag(text)))
    }
}

/// One row failure written to `Load_Error`
#[derive(Debug, Clone, PartialEq)]
pub struct LoadErrorEntry<'a> {
    pub source_file: &'a str,
    pub row_number: u64,
    pub entity: &'a str,
    pub message: &'a str,
    pub raw_data: &'a str,
}

/// Handle on the catalogue database
#[derive(Debug)]
pub struct NeoDatabase {
    conn: Connection,
    location: String,
}

impl NeoDatabase {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: &Utf8Path) -> Result<Self, LoaderError> {
        let conn = Connection::open(path)?;
        Self::init(conn, path.to_string())
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, LoaderError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:".to_string())
    }

    fn init(conn: Connection, location: String) -> Result<Self, LoaderError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        debug!(%location, "catalogue schema ready");
        Ok(NeoDatabase { conn, location })
    }

    /// Where the database lives (file path or `:memory:`)
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction unless one is already open
    pub fn begin(&self) -> Result<(), LoaderError> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Commit the open transaction, if any
    pub fn commit(&self) -> Result<(), LoaderError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Roll back the open transaction, if any
    pub fn rollback(&self) -> Result<(), LoaderError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, LoaderError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create the optional `Load_Error` table
    pub fn enable_error_log(&self) -> Result<(), LoaderError> {
        self.conn.execute_batch(LOAD_ERROR_SCHEMA)?;
        Ok(())
    }

    /// Record a row failure in `Load_Error`; the raw row is truncated to 4000 characters.
    pub fn log_load_error(&self, entry: &LoadErrorEntry<'_>) -> Result<(), LoaderError> {
        self.conn.execute(
            "INSERT INTO Load_Error (source_file, row_number, entity, error_message, raw_data) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                entry.source_file,
                entry.row_number as i64,
                entry.entity,
                entry.message,
                truncate_chars(entry.raw_data, MAX_RAW_ROW_CHARS),
            ],
        )?;
        Ok(())
    }

    /// Seed the `Priority` and `Level` reference tables when they are empty.
    pub fn ensure_reference_data(&self) -> Result<(), LoaderError> {
        let priorities: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Priority", [], |row| row.get(0))?;
        if priorities == 0 {
            for (id, name) in PRIORITIES {
                self.conn.execute(
                    "INSERT INTO Priority (id_priority, name) VALUES (?, ?)",
                    params![id, name],
                )?;
            }
        }

        let levels: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Level", [], |row| row.get(0))?;
        if levels == 0 {
            for (id, color, description) in LEVELS {
                self.conn.execute(
                    "INSERT INTO Level (id_level, color, description) VALUES (?, ?, ?)",
                    params![id, color, description],
                )?;
            }
        }
        Ok(())
    }

    /// Every `(id_internal, neo_id, spkid)` triple, used to seed the identity resolver
    pub fn identity_snapshot(
        &self,
    ) -> Result<Vec<(IdInternal, Option<String>, Option<SpkId>)>, LoaderError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id_internal, neo_id, spkid FROM Asteroid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Next free sequence number for synthesized `MPC<n>` orbit identifiers
    pub fn next_orbit_sequence(&self) -> Result<i64, LoaderError> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(CAST(SUBSTR(id_orbita, ?) AS INTEGER)) FROM Orbit \
             WHERE id_orbita GLOB ?",
            params![
                SYNTHETIC_ORBIT_PREFIX.len() as i64 + 1,
                format!("{SYNTHETIC_ORBIT_PREFIX}[0-9]*"),
            ],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    // ---------------------------------------------------------------------------------------------
    // Classes
    // ---------------------------------------------------------------------------------------------

    /// Insert a class if its code is unknown; existing descriptions are never changed.
    ///
    /// Return
    /// ----------
    /// * `true` when the class was created
    pub fn ensure_class(&self, class: &OrbitClass) -> Result<bool, LoaderError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO Class_Orbital (class, class_description) VALUES (?, ?)",
            params![class.code, class.description],
        )?;
        Ok(inserted > 0)
    }

    pub fn class_description(&self, code: &str) -> Result<Option<String>, LoaderError> {
        Ok(self
            .conn
            .query_row(
                "SELECT class_description FROM Class_Orbital WHERE class = ?",
                [code],
                |row| row.get(0),
            )
            .optional()?)
    }

    // ---------------------------------------------------------------------------------------------
    // Asteroids
    // ---------------------------------------------------------------------------------------------

    fn asteroid_from_sql(row: &Row<'_>) -> rusqlite::Result<AsteroidRecord> {
        Ok(AsteroidRecord {
            id_internal: row.get(0)?,
            neo_id: row.get(1)?,
            spkid: row.get(2)?,
            full_name: row.get(3)?,
            pdes: row.get(4)?,
            name: row.get(5)?,
            prefix: row.get(6)?,
            neo_flag: row.get(7)?,
            pha_flag: row.get(8)?,
            diameter: row.get(9)?,
            absolute_magnitude: row.get(10)?,
            albedo: row.get(11)?,
            diameter_sigma: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    pub fn asteroid(&self, id: IdInternal) -> Result<Option<AsteroidRecord>, LoaderError> {
        let sql = format!(
            "SELECT {} FROM Asteroid WHERE id_internal = ?",
            ASTEROID_COLUMNS.join(", ")
        );
        Ok(self
            .conn
            .query_row(&sql, [id], Self::asteroid_from_sql)
            .optional()?)
    }

    fn lookup_id(&self, sql: &str, key: &dyn ToSql) -> Result<Option<IdInternal>, LoaderError> {
        Ok(self
            .conn
            .query_row(sql, [key], |row| row.get(0))
            .optional()?)
    }

    pub fn asteroid_id_by_spkid(&self, spkid: SpkId) -> Result<Option<IdInternal>, LoaderError> {
        self.lookup_id("SELECT id_internal FROM Asteroid WHERE spkid = ?", &spkid)
    }

    /// Case-insensitive lookup by natural id
    pub fn asteroid_id_by_neo_id(&self, neo_id: &str) -> Result<Option<IdInternal>, LoaderError> {
        self.lookup_id(
            "SELECT id_internal FROM Asteroid WHERE neo_id = ? COLLATE NOCASE",
            &neo_id,
        )
    }

    /// Lookup by principal designation, lowest key first when several asteroids share it
    pub fn asteroid_id_by_pdes(&self, pdes: &str) -> Result<Option<IdInternal>, LoaderError> {
        self.lookup_id(
            "SELECT id_internal FROM Asteroid WHERE pdes = ? ORDER BY id_internal LIMIT 1",
            &pdes,
        )
    }

    /// Stored asteroid matching the SPK-id, else the natural id, of `asteroid`
    pub fn find_asteroid(
        &self,
        asteroid: &AsteroidRecord,
    ) -> Result<Option<IdInternal>, LoaderError> {
        if let Some(spkid) = asteroid.spkid {
            if let Some(id) = self.asteroid_id_by_spkid(spkid)? {
                return Ok(Some(id));
            }
        }
        match asteroid.neo_id.as_deref() {
            Some(neo_id) => self.asteroid_id_by_neo_id(neo_id),
            None => Ok(None),
        }
    }

    /// Insert a new asteroid and return the key assigned by the database.
    pub fn insert_asteroid(&self, asteroid: &AsteroidRecord) -> Result<IdInternal, LoaderError> {
        let columns = &ASTEROID_COLUMNS[1..13];
        let sql = format!(
            "INSERT INTO Asteroid ({}) VALUES ({})",
            columns.join(", "),
            itertools::repeat_n("?", columns.len()).join(", ")
        );
        self.conn.execute(
            &sql,
            params![
                asteroid.neo_id,
                asteroid.spkid,
                asteroid.full_name,
                asteroid.pdes,
                asteroid.name,
                asteroid.prefix,
                asteroid.neo_flag,
                asteroid.pha_flag,
                asteroid.diameter,
                asteroid.absolute_magnitude,
                asteroid.albedo,
                asteroid.diameter_sigma,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite every attribute of an asteroid (the key and `created_at` excepted).
    pub fn update_asteroid(
        &self,
        id: IdInternal,
        asteroid: &AsteroidRecord,
    ) -> Result<(), LoaderError> {
        let sql = format!(
            "UPDATE Asteroid SET {} WHERE id_internal = ?",
            ASTEROID_COLUMNS[1..13]
                .iter()
                .map(|column| format!("{column} = ?"))
                .join(", ")
        );
        self.conn.execute(
            &sql,
            params![
                asteroid.neo_id,
                asteroid.spkid,
                asteroid.full_name,
                asteroid.pdes,
                asteroid.name,
                asteroid.prefix,
                asteroid.neo_flag,
                asteroid.pha_flag,
                asteroid.diameter,
                asteroid.absolute_magnitude,
                asteroid.albedo,
                asteroid.diameter_sigma,
                id,
            ],
        )?;
        Ok(())
    }

    /// Insert or merge an asteroid.
    ///
    /// Arguments
    /// -----------------
    /// * `resolved`: key found by the identity resolver, if any. Without one, the asteroid
    ///   is looked up by SPK-id, then by natural id, before falling back to an insert.
    /// * `incoming`: attributes read from the input
    /// * `policy`: defaults applied to a new asteroid
    ///
    /// Return
    /// ----------
    /// * What happened and the asteroid key.
    ///
    /// The SPK-id and natural id of the stored row are only filled while absent and while no
    /// other asteroid already owns them.
    pub fn upsert_asteroid(
        &self,
        resolved: Option<IdInternal>,
        incoming: &AsteroidRecord,
        policy: MissingElements,
    ) -> Result<(UpsertAction, IdInternal), LoaderError> {
        let existing = match resolved {
            Some(id) => Some(id),
            None => self.find_asteroid(incoming)?,
        };

        if let Some(id) = existing {
            if let Some(mut stored) = self.asteroid(id)? {
                let mut incoming = incoming.clone();
                if let Some(spkid) = incoming.spkid {
                    if self.asteroid_id_by_spkid(spkid)?.is_some_and(|owner| owner != id) {
                        incoming.spkid = None;
                    }
                }
                if let Some(neo_id) = incoming.neo_id.as_deref() {
                    if self.asteroid_id_by_neo_id(neo_id)?.is_some_and(|owner| owner != id) {
                        incoming.neo_id = None;
                    }
                }
                stored.fill_missing(&incoming);
                self.update_asteroid(id, &stored)?;
                return Ok((UpsertAction::Updated, id));
            }
        }

        let mut fresh = incoming.clone();
        apply_asteroid_defaults(&mut fresh, policy);
        let id = self.insert_asteroid(&fresh)?;
        Ok((UpsertAction::Inserted, id))
    }

    // ---------------------------------------------------------------------------------------------
    // Orbits
    // ---------------------------------------------------------------------------------------------

    fn orbit_from_sql(row: &Row<'_>) -> rusqlite::Result<OrbitRecord> {
        Ok(OrbitRecord {
            id_orbita: row.get(0)?,
            id_internal: row.get(1)?,
            class: row.get(2)?,
            epoch: row.get(3)?,
            epoch_mjd: row.get(4)?,
            epoch_cal: row.get(5)?,
            equinox: row.get(6)?,
            rms: row.get(7)?,
            moid: row.get(8)?,
            moid_ld: row.get(9)?,
            e: row.get(10)?,
            a: row.get(11)?,
            q: row.get(12)?,
            i: row.get(13)?,
            om: row.get(14)?,
            w: row.get(15)?,
            ma: row.get(16)?,
            ad: row.get(17)?,
            n: row.get(18)?,
            tp: row.get(19)?,
            tp_cal: row.get(20)?,
            per: row.get(21)?,
            per_y: row.get(22)?,
            orbit_uncertainty: row.get(23)?,
            condition_code: row.get(24)?,
            sigma: OrbitSigmas {
                e: row.get(25)?,
                a: row.get(26)?,
                q: row.get(27)?,
                i: row.get(28)?,
                om: row.get(29)?,
                w: row.get(30)?,
                ma: row.get(31)?,
                ad: row.get(32)?,
                n: row.get(33)?,
                tp: row.get(34)?,
                per: row.get(35)?,
            },
        })
    }

    /// Values of an orbit in [`ORBIT_COLUMNS`] order
    fn orbit_values(orbit: &OrbitRecord) -> [&dyn ToSql; 36] {
        [
            &orbit.id_orbita,
            &orbit.id_internal,
            &orbit.class,
            &orbit.epoch,
            &orbit.epoch_mjd,
            &orbit.epoch_cal,
            &orbit.equinox,
            &orbit.rms,
            &orbit.moid,
            &orbit.moid_ld,
            &orbit.e,
            &orbit.a,
            &orbit.q,
            &orbit.i,
            &orbit.om,
            &orbit.w,
            &orbit.ma,
            &orbit.ad,
            &orbit.n,
            &orbit.tp,
            &orbit.tp_cal,
            &orbit.per,
            &orbit.per_y,
            &orbit.orbit_uncertainty,
            &orbit.condition_code,
            &orbit.sigma.e,
            &orbit.sigma.a,
            &orbit.sigma.q,
            &orbit.sigma.i,
            &orbit.sigma.om,
            &orbit.sigma.w,
            &orbit.sigma.ma,
            &orbit.sigma.ad,
            &orbit.sigma.n,
            &orbit.sigma.tp,
            &orbit.sigma.per,
        ]
    }

    pub fn orbit(&self, id_orbita: &str) -> Result<Option<OrbitRecord>, LoaderError> {
        let sql = format!(
            "SELECT {} FROM Orbit WHERE id_orbita = ?",
            ORBIT_COLUMNS.join(", ")
        );
        Ok(self
            .conn
            .query_row(&sql, [id_orbita], Self::orbit_from_sql)
            .optional()?)
    }

    pub fn orbit_exists(&self, id_orbita: &str) -> Result<bool, LoaderError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM Orbit WHERE id_orbita = ?",
                [id_orbita],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Orbits owned by an asteroid, ordered by identifier
    pub fn orbits_of(&self, id: IdInternal) -> Result<Vec<OrbitRecord>, LoaderError> {
        let sql = format!(
            "SELECT {} FROM Orbit WHERE id_internal = ? ORDER BY id_orbita",
            ORBIT_COLUMNS.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let orbits = stmt
            .query_map([id], Self::orbit_from_sql)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orbits)
    }

    pub fn insert_orbit(&self, orbit: &OrbitRecord) -> Result<(), LoaderError> {
        let sql = format!(
            "INSERT INTO Orbit ({}) VALUES ({})",
            ORBIT_COLUMNS.join(", "),
            itertools::repeat_n("?", ORBIT_COLUMNS.len()).join(", ")
        );
        self.conn
            .execute(&sql, Self::orbit_values(orbit).as_slice())?;
        Ok(())
    }

    /// Overwrite every attribute of a stored orbit
    pub fn update_orbit(&self, orbit: &OrbitRecord) -> Result<(), LoaderError> {
        let sql = format!(
            "UPDATE Orbit SET {} WHERE id_orbita = ?",
            ORBIT_COLUMNS[1..]
                .iter()
                .map(|column| format!("{column} = ?"))
                .join(", ")
        );
        let values = Self::orbit_values(orbit);
        let ordered: Vec<&dyn ToSql> = values[1..]
            .iter()
            .copied()
            .chain(std::iter::once(values[0]))
            .collect();
        self.conn.execute(&sql, ordered.as_slice())?;
        Ok(())
    }

    /// Insert or merge an orbit.
    ///
    /// Arguments
    /// -----------------
    /// * `incoming`: the orbit read from the input, owner already set
    /// * `policy`: treatment of absent elements if the orbit is new
    ///
    /// Return
    /// ----------
    /// * [`OrbitOutcome::SkippedForeignOwner`] when the stored orbit belongs to another
    ///   asteroid (nothing is written), otherwise whether it was inserted or merged.
    pub fn upsert_orbit(
        &self,
        mut incoming: OrbitRecord,
        policy: MissingElements,
    ) -> Result<OrbitOutcome, LoaderError> {
        if let Some(mut stored) = self.orbit(&incoming.id_orbita)? {
            if let (Some(owner), Some(requested)) = (stored.id_internal, incoming.id_internal) {
                if owner != requested {
                    warn!(
                        orbit = %incoming.id_orbita,
                        owner,
                        requested,
                        "orbit belongs to another asteroid, skipped"
                    );
                    return Ok(OrbitOutcome::SkippedForeignOwner { owner });
                }
            }
            stored.fill_missing(&incoming);
            self.update_orbit(&stored)?;
            return Ok(OrbitOutcome::Merged);
        }

        apply_insert_defaults(&mut incoming, policy, CalendarDate::today());
        if incoming.class.as_deref() == Some(DEFAULT_CLASS) {
            self.ensure_class(&OrbitClass {
                code: DEFAULT_CLASS.to_string(),
                description: DEFAULT_CLASS_DESCRIPTION.to_string(),
            })?;
        }
        self.insert_orbit(&incoming)?;
        Ok(OrbitOutcome::Inserted)
    }

    /// Number of rows of a catalogue table
    pub fn count_rows(&self, table: CatalogTable) -> Result<i64, LoaderError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

/// Tables whose sizes are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Asteroid,
    Orbit,
    ClassOrbital,
    Alert,
}

impl CatalogTable {
    pub fn name(&self) -> &'static str {
        match self {
            CatalogTable::Asteroid => "Asteroid",
            CatalogTable::Orbit => "Orbit",
            CatalogTable::ClassOrbital => "Class_Orbital",
            CatalogTable::Alert => "Alert",
        }
    }
}
