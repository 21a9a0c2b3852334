//! # Constants and type definitions for neo_loader
//!
//! This module centralizes the **time constants**, **ingestion limits**, **storage widths**
//! and **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Julian-date / Modified-Julian-date offsets and calendar anchors
//! - Orbital unit conversions (revolution in degrees, Julian year in days)
//! - Ingestion tuning (commit checkpoint, sniffing window, error sampling)
//! - Column widths enforced on text fields before they reach storage
//! - The built-in merged NEO + MPCORB column layout
//!
//! These definitions are shared by the CSV sniffer, the row mapper, the importers and the
//! SQL script generator.

// -------------------------------------------------------------------------------------------------
// Time constants
// -------------------------------------------------------------------------------------------------

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Calendar date of Modified Julian Day 0 (year, month, day)
pub const MJD_ZERO_DATE: (i32, u8, u8) = (1858, 11, 17);

/// Days in a Julian year
pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

/// Degrees in one full revolution, used to turn a mean motion into a period
pub const DEGREES_PER_REVOLUTION: f64 = 360.0;

// -------------------------------------------------------------------------------------------------
// Ingestion tuning
// -------------------------------------------------------------------------------------------------

/// Number of processed rows between two transaction checkpoints
pub const COMMIT_EVERY: usize = 1000;

/// Number of leading bytes inspected to guess the text encoding
pub const SNIFF_BYTES: usize = 4096;

/// Number of non-blank lines inspected by the delimiter frequency heuristic
pub const SNIFF_LINES: usize = 5;

/// Maximum number of error samples kept in an import report
pub const MAX_ERROR_SAMPLES: usize = 5;

/// Maximum number of distinct error messages listed in an import report
pub const MAX_TOP_ERRORS: usize = 5;

/// Raw row text stored in the load-error table is truncated to this many characters
pub const MAX_RAW_ROW_CHARS: usize = 4000;

/// Candidate delimiters, in the priority order used by the header check
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b'\t', b';', b',', b'|'];

// -------------------------------------------------------------------------------------------------
// Storage widths and defaults
// -------------------------------------------------------------------------------------------------

pub const FULL_NAME_MAX: usize = 100;
pub const PDES_MAX: usize = 50;
pub const NAME_MAX: usize = 100;
pub const PREFIX_MAX: usize = 10;
pub const CLASS_MAX: usize = 20;
pub const CLASS_DESCRIPTION_MAX: usize = 255;

/// Equinox assumed when a row carries none
pub const DEFAULT_EQUINOX: &str = "J2000";

/// Orbital class assigned to new orbits that carry no class code
pub const DEFAULT_CLASS: &str = "NEA";

/// Description registered together with [`DEFAULT_CLASS`]
pub const DEFAULT_CLASS_DESCRIPTION: &str = "Near Earth Asteroid";

/// Placeholder used when an asteroid has neither a name nor a designation
pub const UNKNOWN_DESIGNATION: &str = "UNKNOWN";

/// Prefix of synthesized orbit identifiers (`MPC<sequence>`)
pub const SYNTHETIC_ORBIT_PREFIX: &str = "MPC";

/// Default file name of the JSON loader configuration
pub const DEFAULT_LOADER_CONFIG: &str = "loader_config.json";

/// File names under which the legacy one-value-per-line configuration may be found
pub const LEGACY_CONFIG_NAMES: [&str; 2] = ["ultima_configuracao.cfg", "ultima_configuração.cfg"];

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Surrogate key of an asteroid row
pub type IdInternal = i64;

/// JPL SPICE kernel identifier
pub type SpkId = i64;

/// Modified Julian Date (days)
pub type MJD = f64;

/// Julian Date (days)
pub type JD = f64;

/// Angle in degrees
pub type Degree = f64;

/// Distance in astronomical units
pub type AstronomicalUnit = f64;

// -------------------------------------------------------------------------------------------------
// Built-in column layout
// -------------------------------------------------------------------------------------------------

/// Column layout of the merged NEO + MPCORB export.
///
/// Only used when the caller explicitly accepts it for a file whose header cannot be
/// recognized (see [`crate::csv_source::HeaderPolicy::AssumeDefault`]).
pub const DEFAULT_MERGED_HEADER: &[&str] = &[
    "id",
    "spkid",
    "full_name",
    "pdes",
    "name",
    "prefix",
    "neo",
    "pha",
    "h",
    "diameter",
    "albedo",
    "diameter_sigma",
    "orbit_id",
    "epoch",
    "epoch_mjd",
    "epoch_cal",
    "equinox",
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
    "moid",
    "moid_ld",
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
    "class",
    "rms",
    "class_description",
    "abs_mag",
    "slope_param",
    "epoch_mpc",
    "mean_anomaly",
    "arg_perihelion",
    "long_asc_node",
    "inclination",
    "eccentricity",
    "mean_motion",
    "semi_major_axis",
    "uncertainty",
    "reference",
    "num_observations",
    "num_oppositions",
    "first_obs",
    "separator",
    "last_obs",
    "rms_residual",
    "coarse_perturbers",
    "precise_perturbers",
    "computer",
    "hex_flags",
    "designation_full",
    "last_obs_date",
    "orbit_type",
    "is_neo",
];
