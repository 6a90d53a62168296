//! # Query Plans
//!
//! Listings are described as typed plans: a predicate tree, an ordering and an
//! optional aggregate spec. Store adapters interpret the plans; call sites never
//! build query text.
//!
//! - [`plan`] holds the plan types
//! - [`translate`] maps sort modes and type visibility onto plan fragments

pub mod plan;
pub mod translate;

pub use plan::{
    AggregateOrder, AggregateQuery, CompareOp, ExerciseQuery, Field, GroupAggregate, GroupBy,
    GroupKey, OrderBy, Predicate, Value,
};
pub use translate::{
    distance_item_order, exercise_order, group_order, place_item_order, type_filter, ItemOrder,
    SortContext, SortMode,
};
