//! Engine configuration.
//!
//! Policies that are not part of the stored data: the width of the fuzzy
//! distance band, goal baselines for charts, and defaults for discovered places.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::ExerciseType;

/// Configuration for the exercise engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of the target distance tolerated below it.
    /// Default: 0.10 (5000 m → 4500 m)
    pub band_lower_ratio: f64,

    /// Fraction of the target distance tolerated above it.
    /// Default: 0.10 (5000 m → 5500 m)
    pub band_upper_ratio: f64,

    /// Types searched by free-text search. Empty means all types.
    pub default_visible_types: Vec<ExerciseType>,

    /// Hide routes and intervals with a single exercise unless hidden groups are shown.
    /// Default: false
    pub hide_singleton_groups: bool,

    /// Radius in meters given to places created by discovery.
    /// Default: 250.0
    pub default_place_radius: f64,

    /// Flat monthly distance goal in meters.
    /// Default: 100 000
    pub monthly_distance_goal: f64,

    /// Yearly distance goal in meters.
    /// Default: 1 200 000
    pub yearly_distance_goal: f64,

    /// Week index where the yearly goal line ends.
    /// Default: 53
    pub goal_weeks: u32,

    /// Number of route names kept in the lookup cache.
    /// Default: 200
    pub route_name_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            band_lower_ratio: 0.10,
            band_upper_ratio: 0.10,
            default_visible_types: Vec::new(),
            hide_singleton_groups: false,
            default_place_radius: 250.0,
            monthly_distance_goal: 100_000.0,
            yearly_distance_goal: 1_200_000.0,
            goal_weeks: 53,
            route_name_cache_capacity: 200,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the policies describe a usable band and positive geometry.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.band_lower_ratio) {
            return Err(EngineError::Config {
                message: format!(
                    "band_lower_ratio must be in [0, 1), got {}",
                    self.band_lower_ratio
                ),
            });
        }
        if !(self.band_upper_ratio >= 0.0 && self.band_upper_ratio.is_finite()) {
            return Err(EngineError::Config {
                message: format!(
                    "band_upper_ratio must be a non-negative number, got {}",
                    self.band_upper_ratio
                ),
            });
        }
        if !(self.default_place_radius > 0.0 && self.default_place_radius.is_finite()) {
            return Err(EngineError::Config {
                message: format!(
                    "default_place_radius must be positive, got {}",
                    self.default_place_radius
                ),
            });
        }
        if self.route_name_cache_capacity == 0 {
            return Err(EngineError::Config {
                message: "route_name_cache_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fuzzy band of effective distances that count as the given target.
    ///
    /// Widths scale with the target, so longer buckets are more forgiving.
    pub fn band(&self, target: i32) -> DistanceBand {
        let target_f = f64::from(target);
        DistanceBand {
            target,
            min: (target_f * (1.0 - self.band_lower_ratio)).round() as i32,
            max: (target_f * (1.0 + self.band_upper_ratio)).round() as i32,
        }
    }
}

/// Inclusive effective-distance band around a target distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceBand {
    pub target: i32,
    pub min: i32,
    pub max: i32,
}

impl DistanceBand {
    /// Whether an effective distance falls inside the band.
    pub fn contains(&self, distance: i32) -> bool {
        distance >= self.min && distance <= self.max
    }
}
