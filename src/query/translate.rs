//! Sort mode and type visibility translation.
//!
//! Each listing context has a fixed table from sort mode to ordering key.
//! Modes outside a context's table are rejected with `UnsupportedSortMode`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::ExerciseType;
use crate::query::plan::{AggregateOrder, Field, OrderBy, Predicate, Value};

/// User-facing sort modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    Date,
    /// Secondary date ordering: insertion order for exercises, first date for groups
    DateAlt,
    Name,
    Amount,
    Distance,
    Pace,
    StartLat,
    StartLng,
}

impl SortMode {
    pub fn label(self) -> &'static str {
        match self {
            SortMode::Date => "DATE",
            SortMode::DateAlt => "DATE_ALT",
            SortMode::Name => "NAME",
            SortMode::Amount => "AMOUNT",
            SortMode::Distance => "DISTANCE",
            SortMode::Pace => "PACE",
            SortMode::StartLat => "START_LAT",
            SortMode::StartLng => "START_LNG",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Listing contexts, each with its own sort table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortContext {
    Exercises,
    Routes,
    Intervals,
    Distances,
    Places,
}

impl SortContext {
    pub fn label(self) -> &'static str {
        match self {
            SortContext::Exercises => "exercises",
            SortContext::Routes => "routes",
            SortContext::Intervals => "intervals",
            SortContext::Distances => "distances",
            SortContext::Places => "places",
        }
    }
}

fn unsupported(mode: SortMode, context: SortContext) -> EngineError {
    EngineError::UnsupportedSortMode {
        mode: mode.label(),
        context: context.label(),
    }
}

// ============================================================================
// Sort Tables
// ============================================================================

/// Ordering for exercise listings.
pub fn exercise_order(mode: SortMode, ascending: bool) -> Result<OrderBy> {
    let field = match mode {
        SortMode::Date => Field::Date,
        SortMode::DateAlt => Field::Id,
        SortMode::Name => Field::RouteName,
        SortMode::Distance => Field::EffectiveDistance,
        SortMode::Pace => Field::Pace,
        SortMode::StartLat => Field::StartLat,
        SortMode::StartLng => Field::StartLng,
        SortMode::Amount => return Err(unsupported(mode, SortContext::Exercises)),
    };
    Ok(OrderBy { field, ascending })
}

/// Ordering for route and interval aggregates.
pub fn group_order(
    context: SortContext,
    mode: SortMode,
    ascending: bool,
) -> Result<(AggregateOrder, bool)> {
    if !matches!(context, SortContext::Routes | SortContext::Intervals) {
        return Err(unsupported(mode, context));
    }
    let order = match mode {
        SortMode::Date => AggregateOrder::LatestDate,
        SortMode::DateAlt => AggregateOrder::EarliestDate,
        SortMode::Name => AggregateOrder::Key,
        SortMode::Amount => AggregateOrder::Count,
        SortMode::Distance => AggregateOrder::AvgDistance,
        SortMode::Pace => AggregateOrder::BestPace,
        SortMode::StartLat | SortMode::StartLng => return Err(unsupported(mode, context)),
    };
    Ok((order, ascending))
}

/// Orderings applied to item lists assembled in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOrder {
    Length,
    Count,
    BestPace,
    Name,
    Lat,
    Lng,
}

pub fn distance_item_order(mode: SortMode) -> Result<ItemOrder> {
    match mode {
        SortMode::Amount => Ok(ItemOrder::Count),
        SortMode::Distance => Ok(ItemOrder::Length),
        SortMode::Pace => Ok(ItemOrder::BestPace),
        _ => Err(unsupported(mode, SortContext::Distances)),
    }
}

pub fn place_item_order(mode: SortMode) -> Result<ItemOrder> {
    match mode {
        SortMode::Name => Ok(ItemOrder::Name),
        SortMode::Amount => Ok(ItemOrder::Count),
        SortMode::StartLat => Ok(ItemOrder::Lat),
        SortMode::StartLng => Ok(ItemOrder::Lng),
        _ => Err(unsupported(mode, SortContext::Places)),
    }
}

// ============================================================================
// Type Visibility
// ============================================================================

/// Restrict to the visible types. An empty set applies no restriction.
pub fn type_filter(types: &[ExerciseType]) -> Predicate {
    if types.is_empty() {
        return Predicate::True;
    }
    Predicate::In {
        field: Field::Type,
        values: types.iter().map(|t| Value::from(t.label())).collect(),
    }
}
