//! Mapping of raw rows onto typed catalogue records.
//!
//! The merged NEO + MPCORB export carries many attributes twice, once under the JPL column
//! name and once under the MPCORB one (`e` / `eccentricity`, `h` / `abs_mag`, ...). The JPL
//! column wins whenever it holds a value.
use crate::catalog::identity::IdentityKeys;
use crate::catalog::records::{AsteroidRecord, OrbitClass, OrbitRecord, OrbitSigmas, YesNo};
use crate::constants::{
    CLASS_DESCRIPTION_MAX, CLASS_MAX, FULL_NAME_MAX, NAME_MAX, PDES_MAX, PREFIX_MAX,
    UNKNOWN_DESIGNATION,
};
use crate::conversion::{norm_flag, norm_text, norm_text_max, parse_float, parse_int, truncate_chars};
use crate::csv_source::RawRow;
use crate::time::parse_date;

/// Where the principal designation comes from when the `pdes` column is blank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PdesFallback {
    /// `designation`, then `designation_full`
    #[default]
    Designation,
    /// The part of `designation_full` after its parenthesized number (`"(433) Eros"` ->
    /// `"Eros"`), then the number, then `designation`
    SplitFull,
}

fn float(row: &RawRow, columns: &[&str]) -> Option<f64> {
    columns
        .iter()
        .filter_map(|column| row.get(column))
        .find_map(parse_float)
}

fn text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).and_then(norm_text)
}

fn flag(row: &RawRow, column: &str) -> Option<YesNo> {
    text(row, column).map(|value| YesNo::from_char(norm_flag(&value)))
}

/// Split `"(433) Eros"` into `("433", "Eros")`; text without a leading parenthesized number
/// is returned whole as the second element.
pub fn split_designation_full(value: &str) -> (String, String) {
    let value = value.trim();
    if let Some(inner) = value.strip_prefix('(') {
        if let Some(close) = inner.find(')') {
            return (
                inner[..close].trim().to_string(),
                inner[close + 1..].trim().to_string(),
            );
        }
    }
    (String::new(), value.to_string())
}

/// Natural keys, orbit identifier and designations of a row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowKeys {
    pub neo_id: Option<String>,
    pub spkid: Option<i64>,
    pub orbit_id: Option<String>,
    pub designation: Option<String>,
    pub designation_full: Option<String>,
}

impl RowKeys {
    pub fn from_row(row: &RawRow) -> Self {
        RowKeys {
            neo_id: text(row, "id"),
            spkid: row.get("spkid").and_then(parse_int),
            orbit_id: text(row, "orbit_id"),
            designation: text(row, "designation"),
            designation_full: text(row, "designation_full"),
        }
    }

    /// Keys handed to the identity resolver; the designation fallback prefers the full form.
    pub fn identity(&self) -> IdentityKeys {
        IdentityKeys {
            neo_id: self.neo_id.clone(),
            spkid: self.spkid,
            designation: self
                .designation_full
                .clone()
                .or_else(|| self.designation.clone()),
        }
    }
}

/// Orbital class of a row.
///
/// The class code comes from `class`, else from the first 20 characters of `orbit_type`. The
/// description comes from `class_description`, else `orbit_type`, else the code itself.
pub fn class_from_row(row: &RawRow) -> Option<OrbitClass> {
    let orbit_type = text(row, "orbit_type");
    let code = text(row, "class")
        .or_else(|| orbit_type.clone())
        .map(|code| truncate_chars(&code, CLASS_MAX))?;
    let description = text(row, "class_description")
        .or(orbit_type)
        .unwrap_or_else(|| code.clone());
    Some(OrbitClass {
        description: truncate_chars(&description, CLASS_DESCRIPTION_MAX),
        code,
    })
}

/// Asteroid attributes of a row, without surrogate key.
pub fn asteroid_from_row(row: &RawRow, keys: &RowKeys, fallback: PdesFallback) -> AsteroidRecord {
    let designation = keys.designation.as_deref();
    let designation_full = keys.designation_full.as_deref();

    let pdes = text(row, "pdes").or_else(|| match fallback {
        PdesFallback::Designation => designation.or(designation_full).map(str::to_string),
        PdesFallback::SplitFull => {
            let (number, rest) = split_designation_full(designation_full.unwrap_or_default());
            [rest, number]
                .into_iter()
                .find(|part| !part.is_empty())
                .or_else(|| designation.map(str::to_string))
        }
    });

    let full_name = text(row, "full_name")
        .or_else(|| designation_full.or(designation).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_DESIGNATION.to_string());
    let pdes = pdes.unwrap_or_else(|| UNKNOWN_DESIGNATION.to_string());

    AsteroidRecord {
        id_internal: None,
        neo_id: keys.neo_id.clone(),
        spkid: keys.spkid,
        full_name: Some(truncate_chars(&full_name, FULL_NAME_MAX)),
        pdes: Some(truncate_chars(&pdes, PDES_MAX)),
        name: row.get("name").and_then(|n| norm_text_max(n, NAME_MAX)),
        prefix: row.get("prefix").and_then(|p| norm_text_max(p, PREFIX_MAX)),
        neo_flag: flag(row, "neo"),
        pha_flag: flag(row, "pha"),
        diameter: float(row, &["diameter"]),
        absolute_magnitude: float(row, &["h", "abs_mag"]),
        albedo: float(row, &["albedo"]),
        diameter_sigma: float(row, &["diameter_sigma"]),
        created_at: None,
    }
}

/// Orbit attributes of a row as read, before epoch completion and derivation.
///
/// Arguments
/// -----------------
/// * `row`: the source row
/// * `id_orbita`: identifier chosen by the caller (read or synthesized)
pub fn orbit_from_row(row: &RawRow, id_orbita: impl Into<String>) -> OrbitRecord {
    OrbitRecord {
        id_orbita: id_orbita.into(),
        id_internal: None,
        class: class_from_row(row).map(|class| class.code),
        epoch: float(row, &["epoch"]),
        epoch_mjd: float(row, &["epoch_mjd"]),
        epoch_cal: row.get("epoch_cal").and_then(parse_date),
        equinox: text(row, "equinox"),
        rms: float(row, &["rms", "rms_residual"]),
        moid: float(row, &["moid"]),
        moid_ld: float(row, &["moid_ld"]),
        e: float(row, &["e", "eccentricity"]),
        a: float(row, &["a", "semi_major_axis"]),
        q: float(row, &["q"]),
        i: float(row, &["i", "inclination"]),
        om: float(row, &["om", "long_asc_node"]),
        w: float(row, &["w", "arg_perihelion"]),
        ma: float(row, &["ma", "mean_anomaly"]),
        ad: float(row, &["ad"]),
        n: float(row, &["n", "mean_motion"]),
        tp: float(row, &["tp"]),
        tp_cal: row.get("tp_cal").and_then(parse_date),
        per: float(row, &["per"]),
        per_y: float(row, &["per_y"]),
        orbit_uncertainty: row.get("uncertainty").and_then(parse_int),
        condition_code: row.get("condition_code").and_then(parse_int),
        sigma: OrbitSigmas {
            e: float(row, &["sigma_e"]),
            a: float(row, &["sigma_a"]),
            q: float(row, &["sigma_q"]),
            i: float(row, &["sigma_i"]),
            om: float(row, &["sigma_om"]),
            w: float(row, &["sigma_w"]),
            ma: float(row, &["sigma_ma"]),
            ad: float(row, &["sigma_ad"]),
            n: float(row, &["sigma_n"]),
            tp: float(row, &["sigma_tp"]),
            per: float(row, &["sigma_per"]),
        },
    }
}

/// Packed MPC epoch of a row, if any
pub fn packed_epoch(row: &RawRow) -> Option<String> {
    text(row, "epoch_mpc")
}

#[cfg(test)]
mod row_test {
    use super::*;

    #[test]
    fn test_split_designation_full() {
        assert_eq!(
            split_designation_full(" (433) Eros "),
            ("433".to_string(), "Eros".to_string())
        );
        assert_eq!(
            split_designation_full("2020 AB"),
            (String::new(), "2020 AB".to_string())
        );
    }

    #[test]
    fn test_class_from_row() {
        let row = RawRow::from_pairs(2, [("class", "APO"), ("class_description", "Apollo")]);
        assert_eq!(
            class_from_row(&row),
            Some(OrbitClass {
                code: "APO".to_string(),
                description: "Apollo".to_string()
            })
        );

        let row = RawRow::from_pairs(2, [("orbit_type", "Amor-type asteroid and long")]);
        let class = class_from_row(&row).unwrap();
        assert_eq!(class.code, "Amor-type asteroid a");
        assert_eq!(class.description, "Amor-type asteroid and long");

        let row = RawRow::from_pairs(2, [("class", " ")]);
        assert_eq!(class_from_row(&row), None);
    }

    #[test]
    fn test_asteroid_aliases_and_fallbacks() {
        let row = RawRow::from_pairs(
            2,
            [
                ("id", "a0000433"),
                ("spkid", "2000433.0"),
                ("h", ""),
                ("abs_mag", "10.4"),
                ("neo", "yes"),
                ("designation_full", "(433) Eros"),
                ("designation", "433"),
            ],
        );
        let keys = RowKeys::from_row(&row);
        assert_eq!(keys.spkid, Some(2000433));

        let asteroid = asteroid_from_row(&row, &keys, PdesFallback::Designation);
        assert_eq!(asteroid.absolute_magnitude, Some(10.4));
        assert_eq!(asteroid.neo_flag, Some(YesNo::Yes));
        assert_eq!(asteroid.pha_flag, None);
        assert_eq!(asteroid.full_name.as_deref(), Some("(433) Eros"));
        assert_eq!(asteroid.pdes.as_deref(), Some("433"));

        let asteroid = asteroid_from_row(&row, &keys, PdesFallback::SplitFull);
        assert_eq!(asteroid.pdes.as_deref(), Some("Eros"));

        let empty = RawRow::from_pairs(3, [("id", "x")]);
        let asteroid = asteroid_from_row(&empty, &RowKeys::from_row(&empty), PdesFallback::Designation);
        assert_eq!(asteroid.full_name.as_deref(), Some("UNKNOWN"));
        assert_eq!(asteroid.pdes.as_deref(), Some("UNKNOWN"));
    }

    #[test]
    fn test_orbit_aliases() {
        let row = RawRow::from_pairs(
            2,
            [
                ("e", ""),
                ("eccentricity", "0.22"),
                ("a", "1.46"),
                ("semi_major_axis", "9.9"),
                ("rms_residual", "0.5"),
                ("epoch_cal", "20240315.5"),
                ("uncertainty", "3.0"),
            ],
        );
        let orbit = orbit_from_row(&row, "O1");
        assert_eq!(orbit.e, Some(0.22));
        assert_eq!(orbit.a, Some(1.46));
        assert_eq!(orbit.rms, Some(0.5));
        assert_eq!(orbit.orbit_uncertainty, Some(3));
        assert_eq!(orbit.epoch_cal.map(|d| d.to_string()).as_deref(), Some("2024-03-15"));
        assert!(orbit.has_content());
    }
}
