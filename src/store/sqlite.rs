//! # SQLite Store
//!
//! [`RecordStore`] adapter over a single SQLite connection.
//!
//! ## Tables
//!
//! - `exercises`: one row per exercise, dates as epoch seconds, plus a
//!   maintained `effective_distance` column (the distance itself, or the
//!   route/variant average for driven exercises)
//! - `subs`: ordered sub-segments keyed by `superid`
//! - `routes`, `places`, `distances`: groupings
//!
//! The connection sits behind a `Mutex`, so one store can serve concurrent
//! readers. A small write path is included for loading data; the engine
//! itself never writes.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDateTime};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{EngineError, Result};
use crate::model::{
    Distance, Exercise, ExerciseId, Place, PlaceId, Route, RouteId, Sub, DISTANCE_DRIVEN,
};
use crate::query::{
    AggregateQuery, ExerciseQuery, Field, GroupAggregate, GroupBy, GroupKey, Predicate,
};
use crate::store::sql::{self, Sql};
use crate::store::{ExerciseRecord, ExerliteRow, RecordStore};
use crate::GpsPoint;

/// SQLite-backed record store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::register_functions(&conn)?;
        Self::init_schema(&conn)?;
        log::info!("[SqliteStore] Opened {}", path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::register_functions(&conn)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Register the scalar functions rendered queries rely on.
    fn register_functions(conn: &Connection) -> Result<()> {
        conn.create_scalar_function(
            sql::FOLD_CASE,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                Ok(match ctx.get_raw(0) {
                    ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).to_lowercase()),
                    _ => None,
                })
            },
        )?;
        Ok(())
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Named routes
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                goal_pace REAL,
                hidden INTEGER NOT NULL DEFAULT 0
            );

            -- Named circular regions
            CREATE TABLE IF NOT EXISTS places (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                lat REAL NOT NULL,
                lng REAL NOT NULL,
                radius REAL NOT NULL,
                hidden INTEGER NOT NULL DEFAULT 0
            );

            -- Distance buckets of interest
            CREATE TABLE IF NOT EXISTS distances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                length INTEGER NOT NULL UNIQUE,
                goal_pace REAL
            );

            -- Exercises (route_id may point at a removed route)
            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id INTEGER UNIQUE,
                exercise_type TEXT NOT NULL,
                date INTEGER NOT NULL,
                route_id INTEGER,
                route_var TEXT NOT NULL DEFAULT '',
                interval_label TEXT NOT NULL DEFAULT '',
                note TEXT NOT NULL DEFAULT '',
                data_source TEXT NOT NULL DEFAULT '',
                recording_method TEXT NOT NULL DEFAULT '',
                distance INTEGER NOT NULL,
                effective_distance INTEGER NOT NULL,
                time REAL NOT NULL,
                start_lat REAL,
                start_lng REAL,
                end_lat REAL,
                end_lng REAL,
                polyline TEXT,
                trail_hidden INTEGER NOT NULL DEFAULT 0
            );

            -- Ordered sub-segments
            CREATE TABLE IF NOT EXISTS subs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                superid INTEGER NOT NULL,
                position INTEGER NOT NULL,
                distance INTEGER NOT NULL,
                time REAL NOT NULL,
                FOREIGN KEY (superid) REFERENCES exercises(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_exercises_date ON exercises(date);
            CREATE INDEX IF NOT EXISTS idx_exercises_route ON exercises(route_id, route_var);
            CREATE INDEX IF NOT EXISTS idx_exercises_interval ON exercises(interval_label);
            CREATE INDEX IF NOT EXISTS idx_subs_superid ON subs(superid);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Writes run in transactions, so a poisoned lock holds no partial state
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Write Path
    // ========================================================================

    /// Store a route. The id on `route` is ignored; the assigned id is returned.
    pub fn add_route(&self, route: &Route) -> Result<RouteId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO routes (name, goal_pace, hidden) VALUES (?, ?, ?)",
            params![route.name, route.goal_pace, route.hidden],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Rename a stored route. Engines reading this store must drop their
    /// cached route names afterwards.
    pub fn rename_route(&self, id: RouteId, name: &str) -> Result<()> {
        let changed = self
            .conn()
            .execute("UPDATE routes SET name = ? WHERE id = ?", params![name, id])?;
        if changed == 0 {
            return Err(EngineError::NotFound {
                entity: "route",
                key: id.to_string(),
            });
        }
        log::info!("[SqliteStore] Renamed route {} to '{}'", id, name);
        Ok(())
    }

    /// Store a place and return its id.
    pub fn add_place(&self, place: &Place) -> Result<PlaceId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO places (name, lat, lng, radius, hidden) VALUES (?, ?, ?, ?, ?)",
            params![place.name, place.lat, place.lng, place.radius, place.hidden],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Store a distance bucket and return its id.
    pub fn add_distance(&self, length: i32, goal_pace: Option<f64>) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO distances (length, goal_pace) VALUES (?, ?)",
            params![length, goal_pace],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Store an exercise with its sub-segments and return its id.
    ///
    /// `id`, `route_name` and `estimated_distance` on `exercise` are ignored.
    /// Driven exercises get the average measured distance of their route and
    /// variant; a measured exercise refreshes that estimate for its siblings.
    /// An exercise whose external id is already stored is not inserted again;
    /// the existing id is returned.
    pub fn add_exercise(&self, exercise: &Exercise) -> Result<ExerciseId> {
        let mut conn = self.conn();

        if let Some(external_id) = exercise.external_id {
            let existing: Option<ExerciseId> = conn
                .query_row(
                    "SELECT id FROM exercises WHERE external_id = ?",
                    params![external_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                log::warn!(
                    "[SqliteStore] External id {} already stored as exercise {}",
                    external_id,
                    id
                );
                return Ok(id);
            }
        }

        let tx = conn.transaction()?;
        let driven = exercise.is_distance_driven();
        let effective_distance = if driven {
            route_average(&tx, exercise.route_id, &exercise.route_variant)?
        } else {
            exercise.distance
        };
        let (start, end, polyline) = match &exercise.trail {
            Some(trail) => (Some(trail.start), Some(trail.end), Some(trail.polyline.as_str())),
            None => (None, None, None),
        };

        tx.execute(
            "INSERT INTO exercises (
                external_id, exercise_type, date, route_id, route_var, interval_label,
                note, data_source, recording_method, distance, effective_distance, time,
                start_lat, start_lng, end_lat, end_lng, polyline, trail_hidden
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                exercise.external_id,
                exercise.exercise_type.label(),
                exercise.date.and_utc().timestamp(),
                exercise.route_id,
                exercise.route_variant,
                exercise.interval,
                exercise.note,
                exercise.data_source,
                exercise.recording_method,
                exercise.distance,
                effective_distance,
                exercise.time,
                start.map(|p| p.latitude),
                start.map(|p| p.longitude),
                end.map(|p| p.latitude),
                end.map(|p| p.longitude),
                polyline,
                exercise.trail_hidden,
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO subs (superid, position, distance, time) VALUES (?, ?, ?, ?)",
            )?;
            for (position, sub) in exercise.subs.iter().enumerate() {
                stmt.execute(params![id, position as i64, sub.distance, sub.time])?;
            }
        }

        if !driven && exercise.distance > 0 {
            let average = route_average(&tx, exercise.route_id, &exercise.route_variant)?;
            tx.execute(
                "UPDATE exercises SET effective_distance = ?
                 WHERE distance = ? AND route_id IS ? AND route_var = ?",
                params![
                    average,
                    DISTANCE_DRIVEN,
                    exercise.route_id,
                    exercise.route_variant
                ],
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    fn subs_of(conn: &Connection, id: ExerciseId) -> Result<Vec<Sub>> {
        let mut stmt = conn.prepare_cached(
            "SELECT distance, time FROM subs WHERE superid = ? ORDER BY position",
        )?;
        let subs = stmt
            .query_map(params![id], |row| {
                Ok(Sub {
                    distance: row.get(0)?,
                    time: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(subs)
    }

    fn run<T>(
        &self,
        sql: &Sql,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        log::debug!("[SqliteStore] {} ({} params)", sql.text, sql.params.len());
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql.text)?;
        let rows = stmt
            .query_map(params_from_iter(sql.params.iter()), map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Average measured distance of a route and variant, 0 when there is none.
fn route_average(conn: &Connection, route_id: Option<RouteId>, variant: &str) -> Result<i32> {
    let average: Option<f64> = conn.query_row(
        "SELECT AVG(distance) FROM exercises
         WHERE route_id IS ? AND route_var = ? AND distance > 0",
        params![route_id, variant],
        |row| row.get(0),
    )?;
    Ok(average.map(|a| a.round() as i32).unwrap_or(0))
}

fn epoch_to_date(seconds: i64) -> NaiveDateTime {
    DateTime::from_timestamp(seconds, 0)
        .map(|d| d.naive_utc())
        .unwrap_or_default()
}

fn point(lat: Option<f64>, lng: Option<f64>) -> Option<GpsPoint> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GpsPoint::new(lat, lng)),
        _ => None,
    }
}

fn map_exerlite(row: &Row<'_>) -> rusqlite::Result<ExerliteRow> {
    Ok(ExerliteRow {
        id: row.get(0)?,
        exercise_type: row.get(1)?,
        date: epoch_to_date(row.get(2)?),
        route_id: row.get(3)?,
        interval: row.get(4)?,
        distance: row.get(5)?,
        effective_distance: row.get(6)?,
        time: row.get(7)?,
        sub_distance: row.get(8)?,
        sub_time: row.get(9)?,
        start: point(row.get(10)?, row.get(11)?),
    })
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<ExerciseRecord> {
    Ok(ExerciseRecord {
        id: row.get(0)?,
        external_id: row.get(1)?,
        exercise_type: row.get(2)?,
        date: epoch_to_date(row.get(3)?),
        route_id: row.get(4)?,
        route_variant: row.get(5)?,
        interval: row.get(6)?,
        note: row.get(7)?,
        data_source: row.get(8)?,
        recording_method: row.get(9)?,
        distance: row.get(10)?,
        effective_distance: row.get(11)?,
        time: row.get(12)?,
        subs: Vec::new(),
        polyline: row.get(13)?,
        start: point(row.get(14)?, row.get(15)?),
        end: point(row.get(16)?, row.get(17)?),
        trail_hidden: row.get(18)?,
    })
}

fn map_route(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: row.get(0)?,
        name: row.get(1)?,
        goal_pace: row.get(2)?,
        hidden: row.get(3)?,
    })
}

fn map_place(row: &Row<'_>) -> rusqlite::Result<Place> {
    Ok(Place {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        lat: row.get(2)?,
        lng: row.get(3)?,
        radius: row.get(4)?,
        hidden: row.get(5)?,
    })
}

fn map_group_key(group: GroupBy, key: SqlValue) -> Option<GroupKey> {
    match (group, key) {
        (GroupBy::All, _) => Some(GroupKey::All),
        (GroupBy::Route, SqlValue::Integer(id)) => Some(GroupKey::Route(id)),
        (GroupBy::Interval, SqlValue::Text(label)) => Some(GroupKey::Interval(label)),
        _ => None,
    }
}

impl RecordStore for SqliteStore {
    fn exerlite_rows(&self, query: &ExerciseQuery) -> Result<Vec<ExerliteRow>> {
        let sql = sql::select_exercises(sql::EXERLITE_COLUMNS, query);
        self.run(&sql, map_exerlite)
    }

    fn exercise_records(&self, query: &ExerciseQuery) -> Result<Vec<ExerciseRecord>> {
        let sql = sql::select_exercises(sql::RECORD_COLUMNS, query);
        let mut records = self.run(&sql, map_record)?;
        let conn = self.conn();
        for record in &mut records {
            record.subs = Self::subs_of(&conn, record.id)?;
        }
        Ok(records)
    }

    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<GroupAggregate>> {
        let sql = sql::select_aggregate(query);
        let group = query.group;
        let rows = self.run(&sql, |row| {
            let key: SqlValue = row.get(0)?;
            let count: i64 = row.get(1)?;
            let avg_distance: Option<f64> = row.get(2)?;
            let best_pace: Option<f64> = row.get(3)?;
            let total_distance: Option<i64> = row.get(4)?;
            let first: Option<i64> = row.get(5)?;
            let last: Option<i64> = row.get(6)?;
            Ok(map_group_key(group, key).map(|key| GroupAggregate {
                key,
                count: count.max(0) as u32,
                avg_distance: avg_distance.unwrap_or(0.0),
                best_pace,
                total_distance: total_distance.unwrap_or(0),
                first_date: first.map(epoch_to_date),
                last_date: last.map(epoch_to_date),
            }))
        })?;

        let min_count = query.min_count.unwrap_or(0);
        Ok(rows
            .into_iter()
            .flatten()
            .filter(|g| g.count >= min_count)
            .collect())
    }

    fn distinct_labels(&self, field: Field, filter: &Predicate) -> Result<Vec<String>> {
        let sql = sql::select_labels(field, filter);
        self.run(&sql, |row| {
            let value: SqlValue = row.get(0)?;
            Ok(match value {
                SqlValue::Text(text) => text,
                SqlValue::Integer(i) => i.to_string(),
                SqlValue::Real(r) => r.to_string(),
                _ => String::new(),
            })
        })
    }

    fn polylines(&self, filter: &Predicate) -> Result<Vec<(ExerciseId, String)>> {
        let mut sql = Sql::new("SELECT e.id, e.polyline ");
        sql.push(sql::FROM_EXERCISES);
        sql.push(" WHERE (");
        sql::write_predicate(&mut sql, filter);
        sql.push(") AND e.polyline IS NOT NULL ORDER BY e.id");
        self.run(&sql, |row| Ok((row.get(0)?, row.get(1)?)))
    }

    fn external_ids(&self) -> Result<Vec<i64>> {
        let sql = Sql::new(
            "SELECT external_id FROM exercises WHERE external_id IS NOT NULL ORDER BY external_id",
        );
        self.run(&sql, |row| row.get(0))
    }

    fn routes(&self, include_hidden: bool) -> Result<Vec<Route>> {
        let sql = Sql::new(if include_hidden {
            "SELECT id, name, goal_pace, hidden FROM routes ORDER BY id"
        } else {
            "SELECT id, name, goal_pace, hidden FROM routes WHERE hidden = 0 ORDER BY id"
        });
        self.run(&sql, map_route)
    }

    fn route(&self, id: RouteId) -> Result<Option<Route>> {
        let conn = self.conn();
        let route = conn
            .query_row(
                "SELECT id, name, goal_pace, hidden FROM routes WHERE id = ?",
                params![id],
                map_route,
            )
            .optional()?;
        Ok(route)
    }

    fn route_by_name(&self, name: &str) -> Result<Option<Route>> {
        let conn = self.conn();
        let route = conn
            .query_row(
                "SELECT id, name, goal_pace, hidden FROM routes WHERE name = ?",
                params![name],
                map_route,
            )
            .optional()?;
        Ok(route)
    }

    fn places(&self, include_hidden: bool) -> Result<Vec<Place>> {
        let sql = Sql::new(if include_hidden {
            "SELECT id, name, lat, lng, radius, hidden FROM places ORDER BY id"
        } else {
            "SELECT id, name, lat, lng, radius, hidden FROM places WHERE hidden = 0 ORDER BY id"
        });
        self.run(&sql, map_place)
    }

    fn place(&self, id: PlaceId) -> Result<Option<Place>> {
        let conn = self.conn();
        let place = conn
            .query_row(
                "SELECT id, name, lat, lng, radius, hidden FROM places WHERE id = ?",
                params![id],
                map_place,
            )
            .optional()?;
        Ok(place)
    }

    fn distances(&self) -> Result<Vec<Distance>> {
        let sql = Sql::new("SELECT id, length, goal_pace FROM distances ORDER BY length ASC");
        self.run(&sql, |row| {
            Ok(Distance {
                id: row.get(0)?,
                length: row.get(1)?,
                goal_pace: row.get(2)?,
            })
        })
    }
}
