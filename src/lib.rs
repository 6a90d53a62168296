//! # Exercise Log
//!
//! Query, ranking and aggregation engine for a personal exercise log.
//!
//! This library provides:
//! - Filtered and sorted exercise listings grouped by route, distance bucket,
//!   recurring interval or geographic place
//! - Personal-best (top 3 by pace) ranking, including "stretch" efforts over
//!   longer distances that still beat a bucket's records
//! - Place matching with a planar degree-space approximation of a circle
//! - Dense weekly/monthly/yearly distance series for charting, plus goal lines
//!
//! ## Features
//!
//! - **`parallel`** - Project large result sets in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use exercise_log::{EngineConfig, ExerciseEngine, SortMode, SqliteStore};
//!
//! let store = SqliteStore::in_memory().unwrap();
//! let engine = ExerciseEngine::new(store, EngineConfig::default());
//!
//! let recent = engine.list_by_type(&[], SortMode::Date, false).unwrap();
//! assert!(recent.is_empty());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{EngineError, OptionExt, Result};

// Band policy, goals and defaults
pub mod config;
pub use config::{DistanceBand, EngineConfig};

// Stored entities
pub mod model;
pub use model::{
    Distance, Exercise, ExerciseId, ExerciseType, Place, PlaceId, Route, RouteId, Sub, Trail,
    DISTANCE_DRIVEN, ROUTE_NO_NAME,
};

// Transient views handed to callers
pub mod items;
pub use items::{DistanceItem, Exerlite, IntervalItem, PlaceItem, Ranked, RouteItem};

// Typed query plans and the sort/filter translator
pub mod query;
pub use query::{SortContext, SortMode};

// Record store seam and the SQLite adapter
pub mod store;
pub use store::{RecordStore, SqliteStore};

// Row → view projection
pub mod projector;

// Top-3 pace ranking
pub mod ranking;

// Place matching and discovery
pub mod places;
pub use places::PlaceIndex;

// Chart series
pub mod series;
pub use series::{Series, SeriesPoint};

// Route name cache
pub mod cache;

// Engine facade over an injected store
pub mod engine;
pub use engine::ExerciseEngine;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use exercise_log::GpsPoint;
/// let point = GpsPoint::new(59.3293, 18.0686); // Stockholm
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(59.3293, 18.0686).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }
}
