//! # T-SQL insert script
//!
//! Renders a [`Catalog`] as `INSERT [dbo].[...]` statements and splices them into an
//! existing database script (schema + sample data), producing a script that recreates the
//! catalogue on SQL Server.
//!
//! Zero filling and the other insert defaults are applied here, at render time, so the
//! catalogue itself keeps the difference between absent and zero.
use camino::Utf8Path;
use tracing::info;

use crate::catalog::merge::{apply_asteroid_defaults, apply_insert_defaults};
use crate::catalog::{AsteroidRecord, MissingElements, OrbitRecord, YesNo};
use crate::csv_source::sniffer::read_text;
use crate::ingest::catalog_builder::Catalog;
use crate::loader_errors::LoaderError;
use crate::time::CalendarDate;

/// Quoted `N'...'` literal.
///
/// Arguments
/// -----------------
/// * `value`: the text, `None` for absent
/// * `allow_null`: render absent values as `NULL` (else `N''`)
/// * `empty_as_null`: treat blank and `"NULL"` text as absent
pub fn sql_text(value: Option<&str>, allow_null: bool, empty_as_null: bool) -> String {
    let Some(value) = value else {
        return if allow_null { "NULL" } else { "N''" }.to_string();
    };
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("NULL") {
        return if allow_null && empty_as_null { "NULL" } else { "N''" }.to_string();
    }
    format!("N'{}'", value.replace('\'', "''"))
}

/// Text for a `NOT NULL` column
fn sql_required(value: Option<&str>) -> String {
    sql_text(value, false, false)
}

pub fn sql_float(value: Option<f64>) -> String {
    value
        .filter(|v| v.is_finite())
        .map_or_else(|| "NULL".to_string(), |v| format!("{v:?}"))
}

pub fn sql_int(value: Option<i64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}

pub fn sql_date(value: Option<CalendarDate>) -> String {
    value.map_or_else(
        || "NULL".to_string(),
        |date| format!("CAST(N'{date}' AS Date)"),
    )
}

/// Rendered statements, one per line, grouped by target table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertBlocks {
    pub classes: Vec<String>,
    pub asteroids: Vec<String>,
    pub orbits: Vec<String>,
}

fn asteroid_insert(asteroid: &AsteroidRecord) -> String {
    let mut a = asteroid.clone();
    apply_asteroid_defaults(&mut a, MissingElements::ZeroFill);
    let flag = |flag: Option<YesNo>| sql_required(Some(flag.unwrap_or(YesNo::No).as_str()));

    format!(
        "INSERT [dbo].[Asteroid] ([id_internal], [spkid], [full_name], [pdes], [name], \
         [prefix], [neo_flag], [pha_flag], [diameter], [absolute_magnitude], [albedo], \
         [diameter_sigma], [created_at], [neo_id]) VALUES ({}, {}, {}, {}, {}, {}, {}, {}, \
         {}, {}, {}, {}, SYSDATETIME(), {});",
        sql_int(a.id_internal),
        sql_int(a.spkid),
        sql_required(a.full_name.as_deref()),
        sql_required(a.pdes.as_deref()),
        sql_text(a.name.as_deref(), true, true),
        sql_required(a.prefix.as_deref()),
        flag(a.neo_flag),
        flag(a.pha_flag),
        sql_float(a.diameter),
        sql_float(a.absolute_magnitude),
        sql_float(a.albedo),
        sql_float(a.diameter_sigma),
        sql_text(a.neo_id.as_deref(), true, true),
    )
}

fn orbit_insert(orbit: &OrbitRecord, today: Option<CalendarDate>) -> String {
    let mut o = orbit.clone();
    apply_insert_defaults(&mut o, MissingElements::ZeroFill, today);
    let s = &o.sigma;

    let columns = "INSERT [dbo].[Orbit] ([id_orbita], [epoch], [rms], [moid_ld], \
         [epoch_mjd], [epoch_cal], [tp], [tp_cal], [per], [per_y], [equinox], [orbit_uncertainty], \
         [condition_code], [e], [a], [q], [i], [om], [w], [ma], [ad], [n], [moid], [sigma_e], \
         [sigma_a], [sigma_q], [sigma_i], [sigma_n], [sigma_ma], [sigma_om], [sigma_w], \
         [sigma_ad], [sigma_tp], [sigma_per], [id_internal], [class]) VALUES (";
    let values = [
        sql_required(Some(&o.id_orbita)),
        sql_float(o.epoch),
        sql_float(o.rms),
        sql_float(o.moid_ld),
        sql_float(o.epoch_mjd),
        sql_date(o.epoch_cal),
        sql_float(o.tp),
        sql_date(o.tp_cal),
        sql_float(o.per),
        sql_float(o.per_y),
        sql_required(o.equinox.as_deref()),
        sql_int(o.orbit_uncertainty),
        sql_int(o.condition_code),
        sql_float(o.e),
        sql_float(o.a),
        sql_float(o.q),
        sql_float(o.i),
        sql_float(o.om),
        sql_float(o.w),
        sql_float(o.ma),
        sql_float(o.ad),
        sql_float(o.n),
        sql_float(o.moid),
        sql_float(s.e),
        sql_float(s.a),
        sql_float(s.q),
        sql_float(s.i),
        sql_float(s.n),
        sql_float(s.ma),
        sql_float(s.om),
        sql_float(s.w),
        sql_float(s.ad),
        sql_float(s.tp),
        sql_float(s.per),
        sql_int(o.id_internal),
        sql_required(o.class.as_deref()),
    ];
    format!("{columns}{});", values.join(", "))
}

/// Render every entity of the catalogue, classes by code, asteroids by key and orbits by
/// identifier.
pub fn build_insert_blocks(catalog: &Catalog) -> InsertBlocks {
    let today = CalendarDate::today();
    InsertBlocks {
        classes: catalog
            .classes
            .iter()
            .map(|(code, description)| {
                format!(
                    "INSERT [dbo].[Class_Orbital] ([class_description], [class]) VALUES ({}, {});",
                    sql_text(Some(description), true, true),
                    sql_required(Some(code)),
                )
            })
            .collect(),
        asteroids: catalog.asteroids.values().map(asteroid_insert).collect(),
        orbits: catalog
            .orbits
            .values()
            .map(|orbit| orbit_insert(orbit, today))
            .collect(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum InsertKind {
    Class,
    Asteroid,
    Orbit,
}

fn insert_kind(line: &str) -> Option<InsertKind> {
    let line = line.trim_start().trim_start_matches('\u{feff}').to_lowercase();
    if line.starts_with("insert [dbo].[asteroid]") {
        Some(InsertKind::Asteroid)
    } else if line.starts_with("insert [dbo].[orbit]") {
        Some(InsertKind::Orbit)
    } else if line.starts_with("insert [dbo].[class_orbital]") {
        Some(InsertKind::Class)
    } else {
        None
    }
}

/// Splice the generated blocks into a template script.
///
/// Return
/// ----------
/// * The new script: the `[spkid]` and `[neo_id]` columns of `CREATE TABLE
///   [dbo].[Asteroid]` become nullable, the first insert statement of each table is replaced
///   by the generated block and the other ones are dropped. Blocks whose table has no insert
///   in the template are appended at the end.
pub fn splice_sql(template: &str, blocks: &InsertBlocks) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut written = [false; 3];
    let mut in_asteroid_table = false;

    let block_of = |kind: InsertKind| match kind {
        InsertKind::Class => (0, &blocks.classes),
        InsertKind::Asteroid => (1, &blocks.asteroids),
        InsertKind::Orbit => (2, &blocks.orbits),
    };

    for line in template.lines() {
        let trimmed = line.trim().trim_start_matches('\u{feff}');
        if trimmed.starts_with("CREATE TABLE [dbo].[Asteroid]") {
            in_asteroid_table = true;
        }
        let mut line = line.to_string();
        if in_asteroid_table {
            let nullable_key = trimmed.starts_with("[spkid]") || trimmed.starts_with("[neo_id]");
            if nullable_key && trimmed.contains("NOT NULL") {
                line = line.replace("NOT NULL", "NULL");
            }
            if trimmed == ") ON [PRIMARY]" {
                in_asteroid_table = false;
            }
        }

        match insert_kind(&line) {
            Some(kind) => {
                let (slot, block) = block_of(kind);
                if !written[slot] {
                    out.extend(block.iter().cloned());
                    written[slot] = true;
                }
            }
            None => out.push(line),
        }
    }

    for kind in [InsertKind::Class, InsertKind::Asteroid, InsertKind::Orbit] {
        let (slot, block) = block_of(kind);
        if !written[slot] {
            out.extend(block.iter().cloned());
        }
    }

    let mut script = out.join("\n");
    script.push('\n');
    script
}

/// Read `template` (UTF-8 or UTF-16, with or without BOM), splice the blocks in and write
/// the result to `output` as UTF-8 with `\n` line endings.
pub fn write_sql(
    template: &Utf8Path,
    output: &Utf8Path,
    blocks: &InsertBlocks,
) -> Result<(), LoaderError> {
    let (text, encoding) = read_text(template)?;
    let script = splice_sql(&text, blocks);
    std::fs::write(output, script)?;
    info!(
        template = %template,
        ?encoding,
        output = %output,
        classes = blocks.classes.len(),
        asteroids = blocks.asteroids.len(),
        orbits = blocks.orbits.len(),
        "SQL script written"
    );
    Ok(())
}
