//! # Merge policy for repeated catalogue entities
//!
//! The same asteroid or orbit usually appears several times across (or within) input
//! files. Records are combined with a strict **fill-absent-only** rule:
//!
//! * text attributes are replaced only while the stored value is absent or blank,
//! * numeric and date attributes keep any stored value, even `0.0`,
//! * an orbit never changes owner through a merge.
//!
//! The same rules back both the database importer ([`super::store`]) and the offline
//! catalogue builder, so an input file yields the same catalogue either way.
//!
//! ## Insert defaults
//! -----------------
//! When a brand new orbit is stored, [`MissingElements`] decides what happens to elements
//! the input did not provide. Independently of that choice, `tp_cal` falls back to the
//! epoch date (then today), the class to `NEA`, and the equinox to `J2000`.
use crate::catalog::records::{AsteroidRecord, OrbitRecord, OrbitSigmas};
use crate::constants::{DEFAULT_CLASS, DEFAULT_EQUINOX};
use crate::conversion::is_null_token;
use crate::time::CalendarDate;

/// Treatment of orbital elements absent from the input when a new orbit is inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingElements {
    /// Store absent elements as NULL
    #[default]
    KeepNull,
    /// Store absent elements as `0.0`, for targets whose columns are `NOT NULL`
    ZeroFill,
}

/// Fill-absent-only merge of a freshly read record into an existing one
pub trait FillMissing {
    /// Copy into `self` every attribute that `self` lacks and `incoming` has.
    fn fill_missing(&mut self, incoming: &Self);
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, is_null_token)
}

/// Replace `current` with `incoming` when `current` is absent, empty or the `NULL` token.
pub fn fill_text(current: &mut Option<String>, incoming: &Option<String>) {
    if is_blank(current) {
        if let Some(value) = incoming {
            *current = Some(value.clone());
        }
    }
}

/// Replace `current` with `incoming` only when `current` is absent.
pub fn fill_value<T: Clone>(current: &mut Option<T>, incoming: &Option<T>) {
    if current.is_none() {
        current.clone_from(incoming);
    }
}

impl FillMissing for AsteroidRecord {
    fn fill_missing(&mut self, incoming: &Self) {
        fill_text(&mut self.neo_id, &incoming.neo_id);
        fill_value(&mut self.spkid, &incoming.spkid);
        fill_text(&mut self.full_name, &incoming.full_name);
        fill_text(&mut self.pdes, &incoming.pdes);
        fill_text(&mut self.name, &incoming.name);
        fill_text(&mut self.prefix, &incoming.prefix);
        fill_value(&mut self.neo_flag, &incoming.neo_flag);
        fill_value(&mut self.pha_flag, &incoming.pha_flag);
        fill_value(&mut self.diameter, &incoming.diameter);
        fill_value(&mut self.absolute_magnitude, &incoming.absolute_magnitude);
        fill_value(&mut self.albedo, &incoming.albedo);
        fill_value(&mut self.diameter_sigma, &incoming.diameter_sigma);
    }
}

impl FillMissing for OrbitSigmas {
    fn fill_missing(&mut self, incoming: &Self) {
        fill_value(&mut self.e, &incoming.e);
        fill_value(&mut self.a, &incoming.a);
        fill_value(&mut self.q, &incoming.q);
        fill_value(&mut self.i, &incoming.i);
        fill_value(&mut self.om, &incoming.om);
        fill_value(&mut self.w, &incoming.w);
        fill_value(&mut self.ma, &incoming.ma);
        fill_value(&mut self.ad, &incoming.ad);
        fill_value(&mut self.n, &incoming.n);
        fill_value(&mut self.tp, &incoming.tp);
        fill_value(&mut self.per, &incoming.per);
    }
}

impl FillMissing for OrbitRecord {
    fn fill_missing(&mut self, incoming: &Self) {
        fill_value(&mut self.id_internal, &incoming.id_internal);
        fill_text(&mut self.class, &incoming.class);
        fill_value(&mut self.epoch, &incoming.epoch);
        fill_value(&mut self.epoch_mjd, &incoming.epoch_mjd);
        fill_value(&mut self.epoch_cal, &incoming.epoch_cal);
        fill_text(&mut self.equinox, &incoming.equinox);
        fill_value(&mut self.rms, &incoming.rms);
        fill_value(&mut self.moid, &incoming.moid);
        fill_value(&mut self.moid_ld, &incoming.moid_ld);
        fill_value(&mut self.e, &incoming.e);
        fill_value(&mut self.a, &incoming.a);
        fill_value(&mut self.q, &incoming.q);
        fill_value(&mut self.i, &incoming.i);
        fill_value(&mut self.om, &incoming.om);
        fill_value(&mut self.w, &incoming.w);
        fill_value(&mut self.ma, &incoming.ma);
        fill_value(&mut self.ad, &incoming.ad);
        fill_value(&mut self.n, &incoming.n);
        fill_value(&mut self.tp, &incoming.tp);
        fill_value(&mut self.tp_cal, &incoming.tp_cal);
        fill_value(&mut self.per, &incoming.per);
        fill_value(&mut self.per_y, &incoming.per_y);
        fill_value(&mut self.orbit_uncertainty, &incoming.orbit_uncertainty);
        fill_value(&mut self.condition_code, &incoming.condition_code);
        self.sigma.fill_missing(&incoming.sigma);
    }
}

/// Complete a new orbit before its first insertion.
///
/// Arguments
/// -----------------
/// * `orbit`: the orbit about to be inserted
/// * `policy`: what to do with absent elements
/// * `today`: last-resort value of `tp_cal`
pub fn apply_insert_defaults(
    orbit: &mut OrbitRecord,
    policy: MissingElements,
    today: Option<CalendarDate>,
) {
    if orbit.tp_cal.is_none() {
        orbit.tp_cal = orbit.epoch_cal.or(today);
    }
    if is_blank(&orbit.class) {
        orbit.class = Some(DEFAULT_CLASS.to_string());
    }
    if is_blank(&orbit.equinox) {
        orbit.equinox = Some(DEFAULT_EQUINOX.to_string());
    }

    if policy == MissingElements::ZeroFill {
        for value in [
            &mut orbit.epoch,
            &mut orbit.epoch_mjd,
            &mut orbit.rms,
            &mut orbit.moid,
            &mut orbit.moid_ld,
            &mut orbit.e,
            &mut orbit.a,
            &mut orbit.q,
            &mut orbit.i,
            &mut orbit.om,
            &mut orbit.w,
            &mut orbit.ma,
            &mut orbit.ad,
            &mut orbit.n,
            &mut orbit.tp,
            &mut orbit.per,
            &mut orbit.per_y,
        ] {
            value.get_or_insert(0.0);
        }
    }
}

/// Complete a new asteroid before its first insertion.
///
/// Only [`MissingElements::ZeroFill`] changes anything: the absolute magnitude becomes `0.0`
/// and the prefix an empty string, matching `NOT NULL` targets.
pub fn apply_asteroid_defaults(asteroid: &mut AsteroidRecord, policy: MissingElements) {
    if policy == MissingElements::ZeroFill {
        asteroid.absolute_magnitude.get_or_insert(0.0);
        asteroid.prefix.get_or_insert_with(String::new);
    }
}

#[cfg(test)]
mod merge_test {
    use super::*;

    #[test]
    fn test_fill_text_only_when_blank() {
        let mut current = Some("433 Eros".to_string());
        fill_text(&mut current, &Some("Other".to_string()));
        assert_eq!(current.as_deref(), Some("433 Eros"));

        let mut current = Some("  ".to_string());
        fill_text(&mut current, &Some("Eros".to_string()));
        assert_eq!(current.as_deref(), Some("Eros"));

        let mut current = Some("NULL".to_string());
        fill_text(&mut current, &None);
        assert_eq!(current.as_deref(), Some("NULL"));
    }

    #[test]
    fn test_numeric_keeps_existing_value() {
        let mut stored = AsteroidRecord {
            diameter: Some(10.0),
            absolute_magnitude: Some(0.0),
            ..Default::default()
        };
        let incoming = AsteroidRecord {
            diameter: Some(99.0),
            absolute_magnitude: Some(17.2),
            albedo: Some(0.25),
            ..Default::default()
        };
        stored.fill_missing(&incoming);
        assert_eq!(stored.diameter, Some(10.0));
        assert_eq!(stored.absolute_magnitude, Some(0.0));
        assert_eq!(stored.albedo, Some(0.25));
    }

    #[test]
    fn test_orbit_merge_keeps_rms_and_fills_sigmas() {
        let mut stored = OrbitRecord {
            rms: Some(0.42),
            ..OrbitRecord::new("O1")
        };
        let incoming = OrbitRecord {
            rms: Some(0.9),
            e: Some(0.2),
            sigma: OrbitSigmas {
                e: Some(1e-8),
                ..Default::default()
            },
            ..OrbitRecord::new("O1")
        };
        stored.fill_missing(&incoming);
        assert_eq!(stored.rms, Some(0.42));
        assert_eq!(stored.e, Some(0.2));
        assert_eq!(stored.sigma.e, Some(1e-8));
    }

    #[test]
    fn test_insert_defaults() {
        let epoch_cal = CalendarDate::new(2024, 3, 15);
        let today = CalendarDate::new(2026, 1, 1);

        let mut orbit = OrbitRecord {
            epoch_cal,
            a: Some(1.5),
            ..OrbitRecord::new("O1")
        };
        apply_insert_defaults(&mut orbit, MissingElements::KeepNull, today);
        assert_eq!(orbit.tp_cal, epoch_cal);
        assert_eq!(orbit.class.as_deref(), Some("NEA"));
        assert_eq!(orbit.equinox.as_deref(), Some("J2000"));
        assert_eq!(orbit.e, None);

        let mut orbit = OrbitRecord::new("O2");
        apply_insert_defaults(&mut orbit, MissingElements::ZeroFill, today);
        assert_eq!(orbit.tp_cal, today);
        assert_eq!(orbit.e, Some(0.0));
        assert_eq!(orbit.per_y, Some(0.0));
        assert_eq!(orbit.orbit_uncertainty, None);
    }
}
