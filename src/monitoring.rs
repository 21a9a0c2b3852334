//! Catalogue monitoring snapshot: headline counts, orbit precision trend, recent additions.
use std::fmt;

use rusqlite::Connection;

use crate::catalog::{CatalogTable, NeoDatabase};
use crate::constants::IdInternal;
use crate::loader_errors::LoaderError;

/// Average orbit RMS of the orbits whose epoch falls in `year`
#[derive(Debug, Clone, PartialEq)]
pub struct RmsTrendPoint {
    pub year: i64,
    pub orbits: i64,
    pub average_rms: Option<f64>,
}

/// Asteroids added to the catalogue in one `YYYY-MM` month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPoint {
    pub period: String,
    pub asteroids: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentAsteroid {
    pub id_internal: IdInternal,
    pub full_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSnapshot {
    pub asteroids: i64,
    pub orbits: i64,
    pub alerts: i64,
    pub high_priority_alerts: i64,
    pub red_alerts: i64,
    pub orange_alerts: i64,
    /// Potentially hazardous asteroids larger than 100 m
    pub large_phas: i64,
    /// Asteroids added during the last 30 days
    pub new_last_30_days: i64,
    /// Newest epoch years first, at most 12
    pub rms_trend: Vec<RmsTrendPoint>,
    /// Newest months first, at most 12
    pub discoveries: Vec<DiscoveryPoint>,
    /// The ten most recently added asteroids
    pub latest: Vec<RecentAsteroid>,
}

fn count(conn: &Connection, sql: &str) -> Result<i64, LoaderError> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}

/// Take a snapshot of the catalogue
pub fn monitor_snapshot(db: &NeoDatabase) -> Result<MonitorSnapshot, LoaderError> {
    let conn = db.connection();

    let alerts_with_color = |color: &str| -> Result<i64, LoaderError> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM Alert a JOIN Level l ON l.id_level = a.id_level \
             WHERE l.color = ?",
            [color],
            |row| row.get(0),
        )?)
    };

    let rms_trend = conn
        .prepare(
            "SELECT CAST(strftime('%Y', epoch_cal) AS INTEGER) AS yr, COUNT(*), AVG(rms) \
             FROM Orbit WHERE epoch_cal IS NOT NULL \
             GROUP BY yr ORDER BY yr DESC LIMIT 12",
        )?
        .query_map([], |row| {
            Ok(RmsTrendPoint {
                year: row.get(0)?,
                orbits: row.get(1)?,
                average_rms: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let discoveries = conn
        .prepare(
            "SELECT strftime('%Y-%m', created_at) AS period, COUNT(*) FROM Asteroid \
             WHERE created_at IS NOT NULL \
             GROUP BY period ORDER BY period DESC LIMIT 12",
        )?
        .query_map([], |row| {
            Ok(DiscoveryPoint {
                period: row.get(0)?,
                asteroids: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let latest = conn
        .prepare(
            "SELECT id_internal, full_name, created_at FROM Asteroid \
             ORDER BY created_at DESC, id_internal DESC LIMIT 10",
        )?
        .query_map([], |row| {
            Ok(RecentAsteroid {
                id_internal: row.get(0)?,
                full_name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MonitorSnapshot {
        asteroids: db.count_rows(CatalogTable::Asteroid)?,
        orbits: db.count_rows(CatalogTable::Orbit)?,
        alerts: db.count_rows(CatalogTable::Alert)?,
        high_priority_alerts: count(conn, "SELECT COUNT(*) FROM Alert WHERE id_priority = 1")?,
        red_alerts: alerts_with_color("R")?,
        orange_alerts: alerts_with_color("O")?,
        large_phas: count(
            conn,
            "SELECT COUNT(*) FROM Asteroid WHERE pha_flag = 'Y' AND diameter > 0.1",
        )?,
        new_last_30_days: count(
            conn,
            "SELECT COUNT(*) FROM Asteroid WHERE created_at >= datetime('now', '-30 days')",
        )?,
        rms_trend,
        discoveries,
        latest,
    })
}

impl fmt::Display for MonitorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "asteroids: {} | orbits: {} | alerts: {} (high: {}, red: {}, orange: {})",
            self.asteroids,
            self.orbits,
            self.alerts,
            self.high_priority_alerts,
            self.red_alerts,
            self.orange_alerts
        )?;
        writeln!(
            f,
            "PHAs over 100 m: {} | added in the last 30 days: {}",
            self.large_phas, self.new_last_30_days
        )?;

        writeln!(f, "RMS by epoch year:")?;
        for point in &self.rms_trend {
            match point.average_rms {
                Some(rms) => writeln!(f, "  {}: {} orbits, mean rms {rms:.4}", point.year, point.orbits)?,
                None => writeln!(f, "  {}: {} orbits", point.year, point.orbits)?,
            }
        }

        writeln!(f, "Additions by month:")?;
        for point in &self.discoveries {
            writeln!(f, "  {}: {}", point.period, point.asteroids)?;
        }

        writeln!(f, "Latest asteroids:")?;
        for asteroid in &self.latest {
            writeln!(
                f,
                "  {} {} ({})",
                asteroid.id_internal,
                asteroid.full_name.as_deref().unwrap_or("-"),
                asteroid.created_at
            )?;
        }
        Ok(())
    }
}
