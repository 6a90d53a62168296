//! Transient views handed to callers.
//!
//! Everything here is built per query and never written back. Ranks live in
//! the [`Ranked`] wrapper rather than on the item itself.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::{ExerciseId, ExerciseType, PlaceId, RouteId};
use crate::projector::pace_of;
use crate::GpsPoint;

/// Lightweight exercise projection used by every listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exerlite {
    pub id: ExerciseId,
    pub exercise_type: ExerciseType,
    pub date: NaiveDateTime,
    pub route_name: String,
    pub interval: String,
    /// Effective distance in meters
    pub distance: i32,
    /// Effective time in seconds
    pub time: f64,
    pub start: Option<GpsPoint>,
    pub distance_driven: bool,
}

impl Exerlite {
    /// Seconds per kilometer, `None` when undefined.
    pub fn pace(&self) -> Option<f64> {
        pace_of(self.distance, self.time, self.distance_driven)
    }
}

/// An item annotated with its podium position among the items it was ranked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    pub item: T,
    /// 1, 2 or 3 for the three fastest, `None` otherwise
    pub rank: Option<u8>,
}

impl<T> Ranked<T> {
    pub fn unranked(item: T) -> Self {
        Self { item, rank: None }
    }

    pub fn is_top(&self) -> bool {
        self.rank.is_some()
    }

    pub fn into_inner(self) -> T {
        self.item
    }
}

// ============================================================================
// Aggregate Items
// ============================================================================

/// Per-group aggregate shared by all item listings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: u32,
    /// Average effective distance in meters
    pub avg_distance: i32,
    /// Best (lowest) pace in seconds per kilometer
    pub best_pace: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteItem {
    pub route_id: RouteId,
    pub name: String,
    pub stats: GroupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceItem {
    /// Target distance of the bucket in meters
    pub distance: i32,
    pub goal_pace: Option<f64>,
    /// Count and average cover the band; best pace also considers longer efforts
    pub stats: GroupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalItem {
    pub interval: String,
    pub stats: GroupStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceItem {
    pub place_id: PlaceId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub stats: GroupStats,
}
