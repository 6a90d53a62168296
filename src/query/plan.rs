//! Plan types: predicates, orderings and aggregate specs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::RouteId;
use crate::places::DegreeEllipse;

// ============================================================================
// Fields and Values
// ============================================================================

/// Exercise attributes a plan can filter or order on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Id,
    /// `#<id>`, as shown to users
    IdTag,
    ExternalId,
    Type,
    Date,
    /// Date rendered as `YYYY-MM-DD HH:MM`
    DateText,
    RouteId,
    RouteName,
    RouteVariant,
    RouteHidden,
    Interval,
    Note,
    DataSource,
    RecordingMethod,
    /// Stored distance, `DISTANCE_DRIVEN` included
    Distance,
    /// Distance with the sub-segment fallback applied
    EffectiveDistance,
    /// Time with the sub-segment fallback applied
    Time,
    /// Seconds per kilometer, null when undefined
    Pace,
    StartLat,
    StartLng,
    EndLat,
    EndLng,
    Polyline,
    TrailHidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Date(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

// ============================================================================
// Predicates
// ============================================================================

/// Boolean expression over exercise fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    True,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare {
        field: Field,
        op: CompareOp,
        value: Value,
    },
    /// Field equals one of the values. An empty list matches nothing.
    In { field: Field, values: Vec<Value> },
    IsNotNull(Field),
    /// Case-insensitive substring match; the text is matched literally
    TextContainsCi { field: Field, text: String },
    /// Coordinate pair falls inside a degree-space ellipse
    WithinEllipse {
        lat: Field,
        lng: Field,
        ellipse: DegreeEllipse,
    },
}

impl Predicate {
    pub fn compare(field: Field, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    /// Inclusive range.
    pub fn between(field: Field, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, low).and(Self::compare(field, CompareOp::Lte, high))
    }

    /// Conjunction that drops `True` operands and flattens nested `And`s.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), p) => {
                a.push(p);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (a, b) => Predicate::And(vec![a, b]),
        }
    }

    /// Disjunction of the given predicates. An empty list matches nothing.
    pub fn any(predicates: Vec<Predicate>) -> Predicate {
        Predicate::Or(predicates)
    }

    /// Fields referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<Field> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<Field>) {
        match self {
            Predicate::True => {}
            Predicate::And(ps) | Predicate::Or(ps) => {
                for p in ps {
                    p.collect_fields(out);
                }
            }
            Predicate::Compare { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IsNotNull(field)
            | Predicate::TextContainsCi { field, .. } => out.push(*field),
            Predicate::WithinEllipse { lat, lng, .. } => {
                out.push(*lat);
                out.push(*lng);
            }
        }
    }
}

// ============================================================================
// Exercise and Aggregate Queries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: Field,
    pub ascending: bool,
}

/// Row selection over exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseQuery {
    pub filter: Predicate,
    /// `None` keeps the store's default order
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl ExerciseQuery {
    pub fn new(filter: Predicate) -> Self {
        Self {
            filter,
            order: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    Route,
    Interval,
    /// A single group over every matching row
    All,
}

/// Orderings over aggregate columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOrder {
    /// Route name or interval label
    Key,
    Count,
    AvgDistance,
    BestPace,
    LatestDate,
    EarliestDate,
}

/// Grouped aggregate over exercises: count, average effective distance, best pace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub filter: Predicate,
    pub group: GroupBy,
    /// Groups with fewer rows are dropped
    pub min_count: Option<u32>,
    pub order: Option<(AggregateOrder, bool)>,
}

impl AggregateQuery {
    pub fn new(filter: Predicate, group: GroupBy) -> Self {
        Self {
            filter,
            group,
            min_count: None,
            order: None,
        }
    }

    pub fn min_count(mut self, min_count: u32) -> Self {
        self.min_count = Some(min_count);
        self
    }

    pub fn order_by(mut self, order: AggregateOrder, ascending: bool) -> Self {
        self.order = Some((order, ascending));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Route(RouteId),
    Interval(String),
    All,
}

/// One row of an aggregate result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub key: GroupKey,
    pub count: u32,
    /// Average effective distance in meters, 0 for an empty group
    pub avg_distance: f64,
    pub best_pace: Option<f64>,
    pub total_distance: i64,
    pub first_date: Option<NaiveDateTime>,
    pub last_date: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_drops_true() {
        let p = Predicate::True.and(Predicate::eq(Field::RouteId, 3i64));
        assert_eq!(p, Predicate::eq(Field::RouteId, 3i64));

        let p = Predicate::eq(Field::RouteId, 3i64).and(Predicate::True);
        assert_eq!(p, Predicate::eq(Field::RouteId, 3i64));

        assert_eq!(Predicate::True.and(Predicate::True), Predicate::True);
    }

    #[test]
    fn test_and_flattens() {
        let p = Predicate::eq(Field::RouteId, 1i64)
            .and(Predicate::eq(Field::Interval, "4x400"))
            .and(Predicate::IsNotNull(Field::StartLat));
        match p {
            Predicate::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_between_fields() {
        let p = Predicate::between(Field::EffectiveDistance, 4500, 5500);
        assert_eq!(
            p.fields(),
            vec![Field::EffectiveDistance, Field::EffectiveDistance]
        );
    }

    #[test]
    fn test_query_builders() {
        let q = ExerciseQuery::new(Predicate::True)
            .order_by(OrderBy {
                field: Field::Date,
                ascending: false,
            })
            .limit(3);
        assert_eq!(q.limit, Some(3));
        assert_eq!(q.order.map(|o| o.field), Some(Field::Date));

        let a = AggregateQuery::new(Predicate::True, GroupBy::Route)
            .min_count(2)
            .order_by(AggregateOrder::Count, false);
        assert_eq!(a.min_count, Some(2));
        assert_eq!(a.order, Some((AggregateOrder::Count, false)));
    }
}
