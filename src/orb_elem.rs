//! # Derived orbital elements
//!
//! Source catalogues rarely provide every element of an orbit. Several of them follow from
//! the others through closed-form relations, which this module applies to fill the gaps
//! before storage:
//!
//! | Element | Relation | Requires |
//! |---------|----------|----------|
//! | `q`     | `a (1 - e)` | `a`, `e` |
//! | `ad`    | `a (1 + e)` | `a`, `e` |
//! | `per`   | `360 / n` (days) | `n != 0` |
//! | `per_y` | `per / 365.25` | `per` |
//! | `tp`    | `epoch - ma / n` (JD) | `epoch`, `ma`, `n != 0` |
//! | `tp_cal`| calendar date of `tp` | `tp` |
//!
//! Values already present are never overwritten.
//!
//! The epoch itself may arrive as a Julian Date, an MJD, a calendar date or a packed MPC
//! epoch; [`complete_epoch`] reconciles them first.
use crate::catalog::records::OrbitRecord;
use crate::constants::{AstronomicalUnit, Degree, DAYS_PER_JULIAN_YEAR, DEGREES_PER_REVOLUTION, JD};
use crate::time::{date_to_mjd, jd_to_mjd, mjd_to_date, mjd_to_jd, mpc_packed_to_date};

/// Perihelion distance `q = a (1 - e)`
pub fn perihelion_distance(a: AstronomicalUnit, e: f64) -> AstronomicalUnit {
    a * (1.0 - e)
}

/// Aphelion distance `Q = a (1 + e)`
pub fn aphelion_distance(a: AstronomicalUnit, e: f64) -> AstronomicalUnit {
    a * (1.0 + e)
}

/// Orbital period in days from the mean motion in degrees per day.
///
/// `None` for a zero (or non-finite) mean motion, or when the period overflows.
pub fn period_from_mean_motion(n: f64) -> Option<f64> {
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    Some(DEGREES_PER_REVOLUTION / n).filter(|per| per.is_finite())
}

/// Convert a period in days to Julian years
pub fn period_in_years(per_days: f64) -> f64 {
    per_days / DAYS_PER_JULIAN_YEAR
}

/// Time of perihelion passage preceding the epoch.
///
/// Arguments
/// -----------------
/// * `epoch`: osculation epoch (JD)
/// * `ma`: mean anomaly at epoch (degrees)
/// * `n`: mean motion (degrees per day)
///
/// Return
/// ----------
/// * `epoch - ma / n` as a Julian Date, `None` when `n` is zero or the result overflows.
pub fn time_of_perihelion(epoch: JD, ma: Degree, n: f64) -> Option<JD> {
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    Some(epoch - ma / n).filter(|tp| tp.is_finite())
}

/// Reconcile the different representations of the osculation epoch.
///
/// * only `epoch_mjd` known: `epoch = epoch_mjd + 2400000.5`
/// * only `epoch` (JD) known: `epoch_mjd = epoch - 2400000.5`
/// * no numeric epoch but a calendar date: both day counts follow from it
/// * nothing at all: the packed MPC epoch, when given, provides all three
///
/// `epoch_cal` is filled from the day count whenever it is missing.
pub fn complete_epoch(orbit: &mut OrbitRecord, epoch_mpc: Option<&str>) {
    if orbit.epoch.is_none() && orbit.epoch_mjd.is_none() {
        if orbit.epoch_cal.is_none() {
            orbit.epoch_cal = epoch_mpc.and_then(mpc_packed_to_date);
        }
        if let Some(date) = orbit.epoch_cal {
            orbit.epoch_mjd = Some(date_to_mjd(date));
        }
    }

    match (orbit.epoch, orbit.epoch_mjd) {
        (None, Some(mjd)) => orbit.epoch = Some(mjd_to_jd(mjd)),
        (Some(jd), None) => orbit.epoch_mjd = Some(jd_to_mjd(jd)),
        _ => {}
    }

    if orbit.epoch_cal.is_none() {
        orbit.epoch_cal = orbit.epoch_mjd.and_then(mjd_to_date);
    }
}

/// Fill every derivable element that is still missing (see the module table).
pub fn derive_missing_elements(orbit: &mut OrbitRecord) {
    if let (Some(a), Some(e)) = (orbit.a, orbit.e) {
        orbit.q.get_or_insert(perihelion_distance(a, e));
        orbit.ad.get_or_insert(aphelion_distance(a, e));
    }

    if orbit.per.is_none() {
        orbit.per = orbit.n.and_then(period_from_mean_motion);
    }
    if orbit.per_y.is_none() {
        orbit.per_y = orbit.per.map(period_in_years);
    }

    if orbit.tp.is_none() {
        if let (Some(epoch), Some(ma), Some(n)) = (orbit.epoch, orbit.ma, orbit.n) {
            orbit.tp = time_of_perihelion(epoch, ma, n);
        }
    }
    if orbit.tp_cal.is_none() {
        orbit.tp_cal = orbit.tp.map(jd_to_mjd).and_then(mjd_to_date);
    }
}
