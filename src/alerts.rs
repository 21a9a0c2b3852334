//! # Alerts
//!
//! Manual alerts raised on catalogue asteroids, with their priority (`High`, `Medium`,
//! `Low`) and level (`Green` to `Red`) reference data, plus the asteroid search used to pick
//! the target of an alert.
//!
//! [`HighAlertWatch`] implements the high-priority notification: the first poll only takes
//! a baseline, every later poll returns the high-priority alerts created since.
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::{debug, info};

use crate::catalog::NeoDatabase;
use crate::constants::{IdInternal, SpkId};
use crate::loader_errors::LoaderError;
use crate::time::{format_timestamp, parse_datetime};

/// Identifier of the `High` priority
pub const HIGH_PRIORITY: i64 = 1;

/// Most rows returned by [`search_asteroids`]
pub const SEARCH_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Priority {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub id: i64,
    /// One-letter color code (`G`, `Y`, `O`, `R`)
    pub color: String,
    pub description: String,
}

/// Every priority, by id
pub fn priorities(db: &NeoDatabase) -> Result<Vec<Priority>, LoaderError> {
    let mut stmt = db
        .connection()
        .prepare("SELECT id_priority, name FROM Priority ORDER BY id_priority")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Priority {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every level, by id
pub fn levels(db: &NeoDatabase) -> Result<Vec<Level>, LoaderError> {
    let mut stmt = db
        .connection()
        .prepare("SELECT id_level, color, description FROM Level ORDER BY id_level")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Level {
                id: row.get(0)?,
                color: row.get(1)?,
                description: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Asteroid as listed by [`search_asteroids`]
#[derive(Debug, Clone, PartialEq)]
pub struct AsteroidSummary {
    pub id_internal: IdInternal,
    pub spkid: Option<SpkId>,
    pub neo_id: Option<String>,
    pub full_name: Option<String>,
    pub pdes: Option<String>,
    pub name: Option<String>,
    pub diameter: Option<f64>,
    pub absolute_magnitude: Option<f64>,
    pub created_at: Option<String>,
}

/// Find asteroids by name or identifier.
///
/// Arguments
/// -----------------
/// * `term`: matched as a substring of `pdes`, `full_name`, `name` and `neo_id`; an
///   all-digit term also matches `id_internal` and `spkid` exactly
///
/// Return
/// ----------
/// * At most [`SEARCH_LIMIT`] asteroids, newest key first. A blank term matches nothing.
pub fn search_asteroids(
    db: &NeoDatabase,
    term: &str,
) -> Result<Vec<AsteroidSummary>, LoaderError> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let like = format!("%{}%", escape_like(term));
    let mut values: Vec<Value> = vec![Value::Text(like); 4];
    let mut sql = String::from(
        "SELECT id_internal, spkid, neo_id, full_name, pdes, name, diameter, \
         absolute_magnitude, created_at FROM Asteroid \
         WHERE pdes LIKE ?1 ESCAPE '\\' OR full_name LIKE ?2 ESCAPE '\\' \
         OR name LIKE ?3 ESCAPE '\\' OR neo_id LIKE ?4 ESCAPE '\\'",
    );
    if term.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(number) = term.parse::<i64>() {
            sql.push_str(" OR id_internal = ?5 OR spkid = ?6");
            values.extend([Value::Integer(number), Value::Integer(number)]);
        }
    }
    sql.push_str(&format!(" ORDER BY id_internal DESC LIMIT {SEARCH_LIMIT}"));

    let mut stmt = db.connection().prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(AsteroidSummary {
                id_internal: row.get(0)?,
                spkid: row.get(1)?,
                neo_id: row.get(2)?,
                full_name: row.get(3)?,
                pdes: row.get(4)?,
                name: row.get(5)?,
                diameter: row.get(6)?,
                absolute_magnitude: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    debug!(term, found = rows.len(), "asteroid search");
    Ok(rows)
}

/// `%`, `_` and `\` match themselves under `ESCAPE '\'`
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Input of [`create_alert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub id_internal: IdInternal,
    pub criteria: String,
    pub priority: i64,
    pub level: i64,
    /// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`; now when absent or
    /// unparsable
    pub generated_at: Option<String>,
}

fn exists(db: &NeoDatabase, sql: &str, id: i64) -> Result<bool, LoaderError> {
    Ok(db
        .connection()
        .query_row(sql, [id], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Store a new alert.
///
/// Return
/// ----------
/// * The id of the alert, or [`LoaderError::InvalidAlert`] when the criteria is blank or the
///   asteroid, priority or level does not exist.
pub fn create_alert(db: &NeoDatabase, alert: &NewAlert) -> Result<i64, LoaderError> {
    let criteria = alert.criteria.trim();
    if criteria.is_empty() {
        return Err(LoaderError::InvalidAlert("criteria is required".into()));
    }
    if !exists(db, "SELECT 1 FROM Priority WHERE id_priority = ?", alert.priority)? {
        return Err(LoaderError::InvalidAlert(format!(
            "unknown priority {}",
            alert.priority
        )));
    }
    if !exists(db, "SELECT 1 FROM Level WHERE id_level = ?", alert.level)? {
        return Err(LoaderError::InvalidAlert(format!(
            "unknown level {}",
            alert.level
        )));
    }
    if !exists(db, "SELECT 1 FROM Asteroid WHERE id_internal = ?", alert.id_internal)? {
        return Err(LoaderError::InvalidAlert(format!(
            "unknown asteroid {}",
            alert.id_internal
        )));
    }

    let generated_at = alert
        .generated_at
        .as_deref()
        .and_then(parse_datetime)
        .map(|epoch| format_timestamp(&epoch));

    db.connection().execute(
        "INSERT INTO Alert (data_generation, criteria_trigger, id_internal, id_priority, id_level) \
         VALUES (COALESCE(?, datetime('now')), ?, ?, ?, ?)",
        params![
            generated_at,
            criteria,
            alert.id_internal,
            alert.priority,
            alert.level
        ],
    )?;
    let id = db.connection().last_insert_rowid();
    info!(
        id_alert = id,
        id_internal = alert.id_internal,
        priority = alert.priority,
        "alert created"
    );
    Ok(id)
}

/// Optional restrictions of [`list_alerts`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub priority: Option<i64>,
    pub level: Option<i64>,
}

/// Alert joined with its reference names; unknown references show as `ID <n>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRow {
    pub id_alert: i64,
    pub generated_at: String,
    pub priority: String,
    pub level: String,
    pub asteroid: String,
    pub criteria: String,
}

impl AlertRow {
    fn from_sql(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AlertRow {
            id_alert: row.get(0)?,
            generated_at: row.get(1)?,
            priority: row.get(2)?,
            level: row.get(3)?,
            asteroid: row.get(4)?,
            criteria: row.get(5)?,
        })
    }
}

const ALERT_SELECT: &str = "SELECT a.id_alert, a.data_generation, \
     COALESCE(p.name, 'ID ' || a.id_priority), \
     COALESCE(l.description, 'ID ' || a.id_level), \
     COALESCE(ast.full_name, 'ID ' || a.id_internal), \
     a.criteria_trigger \
     FROM Alert a \
     LEFT JOIN Priority p ON p.id_priority = a.id_priority \
     LEFT JOIN Level l ON l.id_level = a.id_level \
     LEFT JOIN Asteroid ast ON ast.id_internal = a.id_internal";

/// Alerts matching `filter`, newest first
pub fn list_alerts(db: &NeoDatabase, filter: &AlertFilter) -> Result<Vec<AlertRow>, LoaderError> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(priority) = filter.priority {
        clauses.push("a.id_priority = ?");
        values.push(priority);
    }
    if let Some(level) = filter.level {
        clauses.push("a.id_level = ?");
        values.push(level);
    }

    let mut sql = String::from(ALERT_SELECT);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY a.data_generation DESC, a.id_alert DESC");

    let mut stmt = db.connection().prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), AlertRow::from_sql)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Result of one [`HighAlertWatch::poll`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighAlertPoll {
    /// First poll: the highest high-priority id seen so far
    Baseline(i64),
    /// High-priority alerts created since the previous poll, oldest first
    NewAlerts(Vec<AlertRow>),
    Quiet,
}

/// Tracks the last high-priority alert already reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighAlertWatch {
    last_seen: Option<i64>,
}

impl HighAlertWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the baseline; the next poll takes a new one
    pub fn reset(&mut self) {
        self.last_seen = None;
    }

    pub fn poll(&mut self, db: &NeoDatabase) -> Result<HighAlertPoll, LoaderError> {
        let max_id: i64 = db.connection().query_row(
            "SELECT COALESCE(MAX(id_alert), 0) FROM Alert WHERE id_priority = ?",
            [HIGH_PRIORITY],
            |row| row.get(0),
        )?;

        let Some(last_seen) = self.last_seen else {
            self.last_seen = Some(max_id);
            return Ok(HighAlertPoll::Baseline(max_id));
        };

        let sql = format!("{ALERT_SELECT} WHERE a.id_priority = ? AND a.id_alert > ? ORDER BY a.id_alert");
        let mut stmt = db.connection().prepare(&sql)?;
        let rows = stmt
            .query_map(params![HIGH_PRIORITY, last_seen], AlertRow::from_sql)?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Ok(HighAlertPoll::Quiet);
        }
        self.last_seen = rows.iter().map(|row| row.id_alert).max().or(Some(max_id));
        Ok(HighAlertPoll::NewAlerts(rows))
    }
}

#[cfg(test)]
mod alerts_test {
    use super::*;
    use crate::catalog::AsteroidRecord;

    fn database() -> (NeoDatabase, IdInternal) {
        let db = NeoDatabase::open_in_memory().unwrap();
        db.ensure_reference_data().unwrap();
        let id = db
            .insert_asteroid(&AsteroidRecord {
                neo_id: Some("a0000433".into()),
                spkid: Some(2000433),
                full_name: Some("433 Eros (A898 PA)".into()),
                pdes: Some("433".into()),
                name: Some("Eros".into()),
                ..Default::default()
            })
            .unwrap();
        (db, id)
    }

    fn alert(id_internal: IdInternal, priority: i64, generated_at: &str) -> NewAlert {
        NewAlert {
            id_internal,
            criteria: "close approach".into(),
            priority,
            level: 4,
            generated_at: Some(generated_at.into()),
        }
    }

    #[test]
    fn test_reference_data() {
        let (db, _) = database();
        let names: Vec<String> = priorities(&db).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["High", "Medium", "Low"]);
        let levels = levels(&db).unwrap();
        assert_eq!(levels.len(), 4);
        assert_eq!(levels[3].color, "R");
    }

    #[test]
    fn test_search() {
        let (db, id) = database();
        let by_name = search_asteroids(&db, "ero").unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id_internal, id);

        let by_spk = search_asteroids(&db, "2000433").unwrap();
        assert_eq!(by_spk.len(), 1);

        assert!(search_asteroids(&db, "  ").unwrap().is_empty());
        assert!(search_asteroids(&db, "apophis").unwrap().is_empty());
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let (db, _) = database();
        for (neo_id, name) in [("b1", "Lot 100%"), ("b2", "Lot 1000"), ("b3", "x_ray")] {
            db.insert_asteroid(&AsteroidRecord {
                neo_id: Some(neo_id.into()),
                name: Some(name.into()),
                ..Default::default()
            })
            .unwrap();
        }
        let names = |term: &str| -> Vec<Option<String>> {
            search_asteroids(&db, term)
                .unwrap()
                .into_iter()
                .map(|a| a.name)
                .collect()
        };

        assert_eq!(names("100%"), vec![Some("Lot 100%".to_string())]);
        assert_eq!(names("_"), vec![Some("x_ray".to_string())]);
        assert_eq!(names("%").len(), 1);
        assert!(names("\\").is_empty());
        assert_eq!(escape_like(r"5%_\"), r"5\%\_\\");
    }

    #[test]
    fn test_create_alert_validation() {
        let (db, id) = database();
        let mut bad = alert(id, 1, "");
        bad.criteria = "  ".into();
        assert_eq!(
            create_alert(&db, &bad),
            Err(LoaderError::InvalidAlert("criteria is required".into()))
        );
        assert_eq!(
            create_alert(&db, &alert(id, 9, "")),
            Err(LoaderError::InvalidAlert("unknown priority 9".into()))
        );
        assert_eq!(
            create_alert(&db, &alert(id + 1, 1, "")),
            Err(LoaderError::InvalidAlert(format!("unknown asteroid {}", id + 1)))
        );
    }

    #[test]
    fn test_list_alerts_newest_first() {
        let (db, id) = database();
        create_alert(&db, &alert(id, 1, "2025-01-02T10:00:00")).unwrap();
        create_alert(&db, &alert(id, 3, "2025-01-03")).unwrap();

        let all = list_alerts(&db, &AlertFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].generated_at, "2025-01-03 00:00:00");
        assert_eq!(all[0].priority, "Low");
        assert_eq!(all[1].level, "Red");
        assert_eq!(all[1].asteroid, "433 Eros (A898 PA)");

        let high = list_alerts(
            &db,
            &AlertFilter {
                priority: Some(HIGH_PRIORITY),
                level: None,
            },
        )
        .unwrap();
        assert_eq!(high.len(), 1);
    }

    #[test]
    fn test_high_alert_watch() {
        let (db, id) = database();
        create_alert(&db, &alert(id, 1, "2025-01-01")).unwrap();

        let mut watch = HighAlertWatch::new();
        assert_eq!(watch.poll(&db).unwrap(), HighAlertPoll::Baseline(1));
        assert_eq!(watch.poll(&db).unwrap(), HighAlertPoll::Quiet);

        create_alert(&db, &alert(id, 2, "2025-01-02")).unwrap();
        let third = create_alert(&db, &alert(id, 1, "2025-01-03")).unwrap();
        match watch.poll(&db).unwrap() {
            HighAlertPoll::NewAlerts(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].id_alert, third);
            }
            other => panic!("unexpected poll result {other:?}"),
        }
        assert_eq!(watch.poll(&db).unwrap(), HighAlertPoll::Quiet);
    }
}
