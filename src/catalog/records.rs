//! Typed rows of the catalogue: asteroids, orbits and orbital classes.
//!
//! Every attribute that may be missing from an input file is an `Option`, so that the merge
//! policy in [`super::merge`] can tell "absent" from "zero".
use std::fmt;

use crate::constants::{AstronomicalUnit, Degree, IdInternal, SpkId, JD, MJD};
use crate::time::CalendarDate;

/// Single-character yes/no flag (`neo`, `pha`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn from_char(c: char) -> Self {
        if c == 'Y' {
            YesNo::Yes
        } else {
            YesNo::No
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Y",
            YesNo::No => "N",
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical and naming data of one asteroid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsteroidRecord {
    /// Surrogate key, `None` until the record has been stored or minted
    pub id_internal: Option<IdInternal>,
    /// Natural identifier of the source catalogue (`id` column)
    pub neo_id: Option<String>,
    pub spkid: Option<SpkId>,
    pub full_name: Option<String>,
    pub pdes: Option<String>,
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub neo_flag: Option<YesNo>,
    pub pha_flag: Option<YesNo>,
    /// Diameter in kilometres
    pub diameter: Option<f64>,
    /// Absolute magnitude `H`
    pub absolute_magnitude: Option<f64>,
    pub albedo: Option<f64>,
    pub diameter_sigma: Option<f64>,
    /// Insertion timestamp set by storage, `YYYY-MM-DD HH:MM:SS`
    pub created_at: Option<String>,
}

/// One-sigma uncertainties of the orbital elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbitSigmas {
    pub e: Option<f64>,
    pub a: Option<f64>,
    pub q: Option<f64>,
    pub i: Option<f64>,
    pub om: Option<f64>,
    pub w: Option<f64>,
    pub ma: Option<f64>,
    pub ad: Option<f64>,
    pub n: Option<f64>,
    pub tp: Option<f64>,
    pub per: Option<f64>,
}

impl OrbitSigmas {
    pub fn is_empty(&self) -> bool {
        *self == OrbitSigmas::default()
    }
}

/// Osculating orbit of an asteroid at a given epoch.
///
/// Angles are in degrees, distances in AU, the mean motion in degrees per day and the
/// period in days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbitRecord {
    pub id_orbita: String,
    pub id_internal: Option<IdInternal>,
    pub class: Option<String>,
    pub epoch: Option<JD>,
    pub epoch_mjd: Option<MJD>,
    pub epoch_cal: Option<CalendarDate>,
    pub equinox: Option<String>,
    pub rms: Option<f64>,
    pub moid: Option<AstronomicalUnit>,
    pub moid_ld: Option<f64>,
    pub e: Option<f64>,
    pub a: Option<AstronomicalUnit>,
    pub q: Option<AstronomicalUnit>,
    pub i: Option<Degree>,
    pub om: Option<Degree>,
    pub w: Option<Degree>,
    pub ma: Option<Degree>,
    pub ad: Option<AstronomicalUnit>,
    pub n: Option<f64>,
    pub tp: Option<JD>,
    pub tp_cal: Option<CalendarDate>,
    pub per: Option<f64>,
    pub per_y: Option<f64>,
    pub orbit_uncertainty: Option<i64>,
    pub condition_code: Option<i64>,
    pub sigma: OrbitSigmas,
}

impl OrbitRecord {
    pub fn new(id_orbita: impl Into<String>) -> Self {
        OrbitRecord {
            id_orbita: id_orbita.into(),
            ..Default::default()
        }
    }

    /// `true` when the record carries at least one epoch or element, i.e. something worth
    /// storing besides its identifier.
    pub fn has_content(&self) -> bool {
        let dated = self.epoch.is_some() || self.epoch_mjd.is_some() || self.epoch_cal.is_some();
        let elements = [
            self.e, self.a, self.q, self.i, self.om, self.w, self.ma, self.ad, self.n,
        ];
        dated || elements.iter().any(Option::is_some) || self.tp.is_some() || self.per.is_some()
    }
}

/// Orbital class code and its description (`APO` -> "Apollo")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrbitClass {
    pub code: String,
    pub description: String,
}

/// What an asteroid upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Inserted,
    Updated,
}

/// What an orbit upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitOutcome {
    Inserted,
    Merged,
    /// The orbit already belongs to another asteroid and was left untouched
    SkippedForeignOwner { owner: IdInternal },
}
