//! Row → view projection.
//!
//! Applies the derived fields shared by every listing: route name lookup,
//! effective distance with the sub-segment fallback, and pace.

use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::items::Exerlite;
use crate::model::{Exercise, ExerciseType, RouteId, Trail, DISTANCE_DRIVEN, ROUTE_NO_NAME};
use crate::store::{ExerciseRecord, ExerliteRow};

/// Row count above which projection fans out over rayon.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 10_000;

/// Route name lookup used during projection.
pub trait RouteNames {
    /// Name for a route id, `ROUTE_NO_NAME` when absent or unknown.
    fn route_name(&self, route_id: Option<RouteId>) -> String;
}

impl RouteNames for HashMap<RouteId, String> {
    fn route_name(&self, route_id: Option<RouteId>) -> String {
        route_id
            .and_then(|id| self.get(&id))
            .cloned()
            .unwrap_or_else(|| ROUTE_NO_NAME.to_string())
    }
}

// ============================================================================
// Derived Fields
// ============================================================================

/// Distance and time used for pace math.
///
/// When both top-level values are zero the sub-segment sums stand in.
pub fn effective_totals(distance: i32, time: f64, sub_distance: i32, sub_time: f64) -> (i32, f64) {
    if distance == 0 && time == 0.0 {
        (sub_distance, sub_time)
    } else {
        (distance, time)
    }
}

/// Seconds per kilometer. Undefined for zero distance or time and for driven distances.
pub fn pace_of(distance: i32, time: f64, driven: bool) -> Option<f64> {
    if driven || distance <= 0 || !(time > 0.0) {
        return None;
    }
    Some(time / f64::from(distance) * 1000.0)
}

/// Effective totals for a stored row. Driven rows take the stored estimate.
fn row_totals(
    distance: i32,
    estimate: i32,
    time: f64,
    sub_distance: i32,
    sub_time: f64,
) -> (i32, f64) {
    let (effective_distance, effective_time) =
        effective_totals(distance, time, sub_distance, sub_time);
    if distance == DISTANCE_DRIVEN {
        (estimate.max(0), effective_time)
    } else {
        (effective_distance, effective_time)
    }
}

// ============================================================================
// Projection
// ============================================================================

pub fn project_exerlite(row: ExerliteRow, names: &impl RouteNames) -> Exerlite {
    let (distance, time) = row_totals(
        row.distance,
        row.effective_distance,
        row.time,
        row.sub_distance,
        row.sub_time,
    );

    Exerlite {
        id: row.id,
        exercise_type: ExerciseType::from_label(&row.exercise_type),
        date: row.date,
        route_name: names.route_name(row.route_id),
        interval: row.interval,
        distance,
        time,
        start: row.start,
        distance_driven: row.distance == DISTANCE_DRIVEN,
    }
}

/// Project rows in query order.
#[cfg(not(feature = "parallel"))]
pub fn project_exerlites<N: RouteNames + Sync>(rows: Vec<ExerliteRow>, names: &N) -> Vec<Exerlite> {
    rows.into_iter()
        .map(|row| project_exerlite(row, names))
        .collect()
}

/// Project rows in query order, in parallel for large result sets.
#[cfg(feature = "parallel")]
pub fn project_exerlites<N: RouteNames + Sync>(rows: Vec<ExerliteRow>, names: &N) -> Vec<Exerlite> {
    if rows.len() < PARALLEL_THRESHOLD {
        return rows
            .into_iter()
            .map(|row| project_exerlite(row, names))
            .collect();
    }
    rows.into_par_iter()
        .map(|row| project_exerlite(row, names))
        .collect()
}

pub fn project_exercise(record: ExerciseRecord, names: &impl RouteNames) -> Exercise {
    let trail = match (record.polyline, record.start, record.end) {
        (Some(polyline), Some(start), Some(end)) => Some(Trail::new(polyline, start, end)),
        _ => None,
    };
    let estimated_distance = if record.distance == DISTANCE_DRIVEN {
        Some(record.effective_distance)
    } else {
        None
    };

    Exercise {
        id: record.id,
        external_id: record.external_id,
        exercise_type: ExerciseType::from_label(&record.exercise_type),
        date: record.date,
        route_id: record.route_id,
        route_name: names.route_name(record.route_id),
        route_variant: record.route_variant,
        interval: record.interval,
        note: record.note,
        data_source: record.data_source,
        recording_method: record.recording_method,
        distance: record.distance,
        estimated_distance,
        time: record.time,
        subs: record.subs,
        trail,
        trail_hidden: record.trail_hidden,
    }
}
