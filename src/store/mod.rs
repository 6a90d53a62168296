//! # Record Store
//!
//! The engine reads exercises through the [`RecordStore`] trait: typed query
//! plans in, raw rows out. [`SqliteStore`] is the bundled adapter.

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::model::{Distance, ExerciseId, Place, PlaceId, Route, RouteId, Sub};
use crate::query::{AggregateQuery, ExerciseQuery, Field, GroupAggregate, Predicate};
use crate::GpsPoint;

mod sql;
pub mod sqlite;

pub use sqlite::SqliteStore;

// ============================================================================
// Rows
// ============================================================================

/// Columns needed for an `Exerlite`, before projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerliteRow {
    pub id: ExerciseId,
    /// Stored type label
    pub exercise_type: String,
    pub date: NaiveDateTime,
    pub route_id: Option<RouteId>,
    pub interval: String,
    pub distance: i32,
    /// Stored effective distance: the distance itself, or the estimate for driven rows
    pub effective_distance: i32,
    pub time: f64,
    pub sub_distance: i32,
    pub sub_time: f64,
    pub start: Option<GpsPoint>,
}

/// Full exercise row with its sub-segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRecord {
    pub id: ExerciseId,
    pub external_id: Option<i64>,
    pub exercise_type: String,
    pub date: NaiveDateTime,
    pub route_id: Option<RouteId>,
    pub route_variant: String,
    pub interval: String,
    pub note: String,
    pub data_source: String,
    pub recording_method: String,
    pub distance: i32,
    pub effective_distance: i32,
    pub time: f64,
    pub subs: Vec<Sub>,
    pub polyline: Option<String>,
    pub start: Option<GpsPoint>,
    pub end: Option<GpsPoint>,
    pub trail_hidden: bool,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Read access to stored exercises and their groupings.
///
/// Implementations must be safe to share between threads for concurrent reads.
pub trait RecordStore: Send + Sync {
    fn exerlite_rows(&self, query: &ExerciseQuery) -> Result<Vec<ExerliteRow>>;

    fn exercise_records(&self, query: &ExerciseQuery) -> Result<Vec<ExerciseRecord>>;

    fn aggregate(&self, query: &AggregateQuery) -> Result<Vec<GroupAggregate>>;

    /// Distinct non-empty values of a text field among matching rows, most used first.
    fn distinct_labels(&self, field: Field, filter: &Predicate) -> Result<Vec<String>>;

    /// `(exercise id, encoded polyline)` for matching rows that have a trail.
    fn polylines(&self, filter: &Predicate) -> Result<Vec<(ExerciseId, String)>>;

    fn external_ids(&self) -> Result<Vec<i64>>;

    fn routes(&self, include_hidden: bool) -> Result<Vec<Route>>;

    fn route(&self, id: RouteId) -> Result<Option<Route>>;

    fn route_by_name(&self, name: &str) -> Result<Option<Route>>;

    fn places(&self, include_hidden: bool) -> Result<Vec<Place>>;

    fn place(&self, id: PlaceId) -> Result<Option<Place>>;

    /// Stored distance buckets, shortest first.
    fn distances(&self) -> Result<Vec<Distance>>;
}
