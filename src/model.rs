//! Stored entities: exercises, routes, places and distance buckets.
//!
//! These mirror the rows the record store owns. Everything derived from them
//! (projections, rankings, series) lives in other modules and is transient.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::projector::{effective_totals, pace_of};
use crate::GpsPoint;

pub type ExerciseId = i64;
pub type RouteId = i64;
pub type PlaceId = i64;

/// Distance sentinel for exercises whose distance was driven, not measured.
pub const DISTANCE_DRIVEN: i32 = -1;

/// Name returned for route ids that match no stored route.
pub const ROUTE_NO_NAME: &str = "No name";

/// Precision of encoded trail polylines.
pub const POLYLINE_PRECISION: u32 = 5;

// ============================================================================
// Exercise Type
// ============================================================================

/// Closed set of exercise types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExerciseType {
    Run,
    Walk,
    Ride,
    Swim,
    Strength,
    Other,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 6] = [
        ExerciseType::Run,
        ExerciseType::Walk,
        ExerciseType::Ride,
        ExerciseType::Swim,
        ExerciseType::Strength,
        ExerciseType::Other,
    ];

    /// Label stored in the type column.
    pub fn label(self) -> &'static str {
        match self {
            ExerciseType::Run => "Run",
            ExerciseType::Walk => "Walk",
            ExerciseType::Ride => "Ride",
            ExerciseType::Swim => "Swim",
            ExerciseType::Strength => "Strength",
            ExerciseType::Other => "Other",
        }
    }

    /// Parse a stored label, folding anything unrecognised into `Other`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_else(|_| {
            log::warn!("[Model] Unknown exercise type label '{}', using Other", label);
            ExerciseType::Other
        })
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExerciseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExerciseType::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown exercise type '{}'", s))
    }
}

// ============================================================================
// Exercise
// ============================================================================

/// A sub-segment of an exercise, e.g. one repetition of an interval session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sub {
    /// Distance in meters
    pub distance: i32,
    /// Time in seconds
    pub time: f64,
}

/// Recorded path of an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    /// Encoded polyline
    pub polyline: String,
    pub start: GpsPoint,
    pub end: GpsPoint,
}

impl Trail {
    pub fn new(polyline: impl Into<String>, start: GpsPoint, end: GpsPoint) -> Self {
        Self {
            polyline: polyline.into(),
            start,
            end,
        }
    }

    /// Decode the polyline into points. Returns `None` for a corrupt encoding.
    pub fn points(&self) -> Option<Vec<GpsPoint>> {
        match polyline::decode_polyline(&self.polyline, POLYLINE_PRECISION) {
            Ok(line) => Some(line.coords().map(|c| GpsPoint::new(c.y, c.x)).collect()),
            Err(e) => {
                log::warn!("[Model] Could not decode trail polyline: {}", e);
                None
            }
        }
    }
}

/// Full exercise record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    /// Id at the external sync service
    pub external_id: Option<i64>,
    pub exercise_type: ExerciseType,
    pub date: NaiveDateTime,
    pub route_id: Option<RouteId>,
    /// Resolved route name, `ROUTE_NO_NAME` when the route is missing
    pub route_name: String,
    pub route_variant: String,
    /// Empty when the exercise is not part of a recurring interval
    pub interval: String,
    pub note: String,
    pub data_source: String,
    pub recording_method: String,
    /// Distance in meters, or `DISTANCE_DRIVEN`
    pub distance: i32,
    /// Stand-in for a driven distance: average of the measured exercises on
    /// the same route and variant
    pub estimated_distance: Option<i32>,
    /// Elapsed time in seconds, 0 when unknown
    pub time: f64,
    pub subs: Vec<Sub>,
    pub trail: Option<Trail>,
    pub trail_hidden: bool,
}

impl Exercise {
    pub fn is_distance_driven(&self) -> bool {
        self.distance == DISTANCE_DRIVEN
    }

    /// Distance used for pace math. Falls back to the sub-segment sum when
    /// both top-level distance and time are zero.
    pub fn effective_distance(&self) -> i32 {
        self.effective().0
    }

    /// Time paired with `effective_distance`.
    pub fn effective_time(&self) -> f64 {
        self.effective().1
    }

    /// Seconds per kilometer, `None` when distance or time is unknown or the
    /// distance was driven.
    pub fn pace(&self) -> Option<f64> {
        let (distance, time) = self.effective();
        pace_of(distance, time, self.is_distance_driven())
    }

    fn effective(&self) -> (i32, f64) {
        let sub_distance = self.subs.iter().map(|s| s.distance).sum();
        let sub_time = self.subs.iter().map(|s| s.time).sum();
        let (distance, time) = effective_totals(self.distance, self.time, sub_distance, sub_time);
        if self.is_distance_driven() {
            (self.estimated_distance.unwrap_or(0).max(0), time)
        } else {
            (distance, time)
        }
    }
}

// ============================================================================
// Groupings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    /// Seconds per kilometer
    pub goal_pace: Option<f64>,
    pub hidden: bool,
}

impl Route {
    pub fn new(id: RouteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            goal_pace: None,
            hidden: false,
        }
    }
}

/// Named circular region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// `None` for places that have not been stored yet
    pub id: Option<PlaceId>,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Radius in meters
    pub radius: f64,
    pub hidden: bool,
}

impl Place {
    pub fn new(name: impl Into<String>, center: GpsPoint, radius: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            lat: center.latitude,
            lng: center.longitude,
            radius,
            hidden: false,
        }
    }

    /// Unnamed, unstored place centered on a point.
    pub fn at(center: GpsPoint, radius: f64) -> Self {
        Self::new("", center, radius)
    }

    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(self.lat, self.lng)
    }
}

/// Distance bucket of interest, e.g. 5000 m.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub id: i64,
    /// Target distance in meters
    pub length: i32,
    /// Seconds per kilometer
    pub goal_pace: Option<f64>,
}
