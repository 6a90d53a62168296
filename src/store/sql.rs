//! Plan → SQL rendering for the SQLite adapter.
//!
//! Every value is bound as a parameter. Derived fields (effective distance,
//! effective time, pace) are computed in the query from the exercise row and
//! its sub-segment sums, so they can be filtered and ordered on.

use rusqlite::types::Value as SqlValue;

use crate::query::{
    AggregateOrder, AggregateQuery, CompareOp, ExerciseQuery, Field, GroupBy, OrderBy, Predicate,
    Value,
};

/// Exercises with their route and sub-segment sums.
pub(crate) const FROM_EXERCISES: &str = "FROM exercises e \
     LEFT JOIN routes r ON r.id = e.route_id \
     LEFT JOIN (SELECT superid, SUM(distance) AS sub_distance, SUM(time) AS sub_time \
                FROM subs GROUP BY superid) s ON s.superid = e.id";

const EFFECTIVE_DISTANCE: &str = "(CASE WHEN e.distance = 0 AND e.time = 0 \
     THEN COALESCE(s.sub_distance, 0) ELSE e.effective_distance END)";

const EFFECTIVE_TIME: &str = "(CASE WHEN e.distance = 0 AND e.time = 0 \
     THEN COALESCE(s.sub_time, 0) ELSE e.time END)";

const PACE: &str = "(CASE WHEN e.distance != -1 \
     AND (CASE WHEN e.distance = 0 AND e.time = 0 \
         THEN COALESCE(s.sub_distance, 0) ELSE e.effective_distance END) > 0 \
     AND (CASE WHEN e.distance = 0 AND e.time = 0 \
         THEN COALESCE(s.sub_time, 0) ELSE e.time END) > 0 \
     THEN 1000.0 * (CASE WHEN e.distance = 0 AND e.time = 0 \
         THEN COALESCE(s.sub_time, 0) ELSE e.time END) \
     / (CASE WHEN e.distance = 0 AND e.time = 0 \
         THEN COALESCE(s.sub_distance, 0) ELSE e.effective_distance END) \
     END)";

/// Columns read into an `ExerliteRow`, in order.
pub(crate) const EXERLITE_COLUMNS: &str = "e.id, e.exercise_type, e.date, e.route_id, \
     e.interval_label, e.distance, e.effective_distance, e.time, \
     COALESCE(s.sub_distance, 0), COALESCE(s.sub_time, 0), e.start_lat, e.start_lng";

/// Columns read into an `ExerciseRecord` (without subs), in order.
pub(crate) const RECORD_COLUMNS: &str = "e.id, e.external_id, e.exercise_type, e.date, \
     e.route_id, e.route_var, e.interval_label, e.note, e.data_source, e.recording_method, \
     e.distance, e.effective_distance, e.time, e.polyline, \
     e.start_lat, e.start_lng, e.end_lat, e.end_lng, e.trail_hidden";

/// SQL text with its positional parameters.
#[derive(Debug, Default)]
pub(crate) struct Sql {
    pub text: String,
    pub params: Vec<SqlValue>,
}

impl Sql {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            params: Vec::new(),
        }
    }

    pub fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn bind(&mut self, value: SqlValue) {
        self.text.push('?');
        self.params.push(value);
    }
}

pub(crate) fn column(field: Field) -> &'static str {
    match field {
        Field::Id => "e.id",
        Field::IdTag => "('#' || e.id)",
        Field::ExternalId => "e.external_id",
        Field::Type => "e.exercise_type",
        Field::Date => "e.date",
        Field::DateText => "strftime('%Y-%m-%d %H:%M', e.date, 'unixepoch')",
        Field::RouteId => "e.route_id",
        Field::RouteName => "r.name",
        Field::RouteVariant => "e.route_var",
        Field::RouteHidden => "r.hidden",
        Field::Interval => "e.interval_label",
        Field::Note => "e.note",
        Field::DataSource => "e.data_source",
        Field::RecordingMethod => "e.recording_method",
        Field::Distance => "e.distance",
        Field::EffectiveDistance => EFFECTIVE_DISTANCE,
        Field::Time => EFFECTIVE_TIME,
        Field::Pace => PACE,
        Field::StartLat => "e.start_lat",
        Field::StartLng => "e.start_lng",
        Field::EndLat => "e.end_lat",
        Field::EndLng => "e.end_lng",
        Field::Polyline => "e.polyline",
        Field::TrailHidden => "e.trail_hidden",
    }
}

pub(crate) fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Int(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Date(v) => SqlValue::Integer(v.and_utc().timestamp()),
    }
}

/// Unicode lowercase scalar function registered on every store connection.
pub(crate) const FOLD_CASE: &str = "fold_case";

/// Escape LIKE wildcards so the text matches literally.
pub(crate) fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => " = ",
        CompareOp::Ne => " != ",
        CompareOp::Lt => " < ",
        CompareOp::Lte => " <= ",
        CompareOp::Gt => " > ",
        CompareOp::Gte => " >= ",
    }
}

fn write_joined(sql: &mut Sql, parts: &[Predicate], joiner: &str, empty: &str) {
    if parts.is_empty() {
        sql.push(empty);
        return;
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push(joiner);
        }
        sql.push("(");
        write_predicate(sql, part);
        sql.push(")");
    }
}

pub(crate) fn write_predicate(sql: &mut Sql, predicate: &Predicate) {
    match predicate {
        Predicate::True => sql.push("1"),
        Predicate::And(parts) => write_joined(sql, parts, " AND ", "1"),
        Predicate::Or(parts) => write_joined(sql, parts, " OR ", "0"),
        Predicate::Compare { field, op, value } => {
            sql.push(column(*field));
            sql.push(operator(*op));
            sql.bind(sql_value(value));
        }
        Predicate::In { field, values } => {
            if values.is_empty() {
                sql.push("0");
                return;
            }
            sql.push(column(*field));
            sql.push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    sql.push(", ");
                }
                sql.bind(sql_value(value));
            }
            sql.push(")");
        }
        Predicate::IsNotNull(field) => {
            sql.push(column(*field));
            sql.push(" IS NOT NULL");
        }
        Predicate::TextContainsCi { field, text } => {
            // LIKE only folds ASCII, so both sides are lowercased first
            sql.push(&format!("{FOLD_CASE}({}) LIKE ", column(*field)));
            let needle = escape_like(&text.to_lowercase());
            sql.bind(SqlValue::Text(format!("%{needle}%")));
            sql.push(" ESCAPE '\\'");
        }
        Predicate::WithinEllipse { lat, lng, ellipse } => {
            let (lat, lng) = (column(*lat), column(*lng));
            // (c - lat)² / a² + (c - lng)² / b² <= 1
            sql.push("((");
            sql.bind(SqlValue::Real(ellipse.lat));
            sql.push(&format!(" - {lat}) * ("));
            sql.bind(SqlValue::Real(ellipse.lat));
            sql.push(&format!(" - {lat}) / "));
            sql.bind(SqlValue::Real(ellipse.lat_radius_sq));
            sql.push(" + (");
            sql.bind(SqlValue::Real(ellipse.lng));
            sql.push(&format!(" - {lng}) * ("));
            sql.bind(SqlValue::Real(ellipse.lng));
            sql.push(&format!(" - {lng}) / "));
            sql.bind(SqlValue::Real(ellipse.lng_radius_sq));
            sql.push(") <= 1");
        }
    }
}

fn direction(ascending: bool) -> &'static str {
    if ascending {
        " ASC"
    } else {
        " DESC"
    }
}

fn write_order(sql: &mut Sql, order: &OrderBy) {
    sql.push(" ORDER BY ");
    sql.push(column(order.field));
    sql.push(direction(order.ascending));
}

/// `SELECT <columns> FROM … WHERE … ORDER BY … LIMIT …`
pub(crate) fn select_exercises(columns: &str, query: &ExerciseQuery) -> Sql {
    let mut sql = Sql::new("SELECT ");
    sql.push(columns);
    sql.push(" ");
    sql.push(FROM_EXERCISES);
    sql.push(" WHERE ");
    write_predicate(&mut sql, &query.filter);
    if let Some(order) = &query.order {
        write_order(&mut sql, order);
    }
    if let Some(limit) = query.limit {
        sql.push(" LIMIT ");
        sql.bind(SqlValue::Integer(i64::from(limit)));
    }
    sql
}

fn group_column(group: GroupBy) -> Option<&'static str> {
    match group {
        GroupBy::Route => Some("e.route_id"),
        GroupBy::Interval => Some("e.interval_label"),
        GroupBy::All => None,
    }
}

fn aggregate_order_column(order: AggregateOrder, group: GroupBy) -> String {
    match order {
        AggregateOrder::Key => match group {
            GroupBy::Route => "MAX(r.name)".to_string(),
            GroupBy::Interval => "e.interval_label".to_string(),
            GroupBy::All => "1".to_string(),
        },
        AggregateOrder::Count => "COUNT(1)".to_string(),
        AggregateOrder::AvgDistance => format!("AVG({EFFECTIVE_DISTANCE})"),
        AggregateOrder::BestPace => format!("MIN({PACE})"),
        AggregateOrder::LatestDate => "MAX(e.date)".to_string(),
        AggregateOrder::EarliestDate => "MIN(e.date)".to_string(),
    }
}

/// Grouped aggregate. Columns: key, count, avg distance, best pace,
/// total distance, first date, last date.
///
/// `min_count` is only rendered for grouped queries; the adapter applies it
/// to the single `All` row itself.
pub(crate) fn select_aggregate(query: &AggregateQuery) -> Sql {
    let key = group_column(query.group);
    let mut sql = Sql::new("SELECT ");
    sql.push(key.unwrap_or("NULL"));
    sql.push(&format!(
        ", COUNT(1), AVG({EFFECTIVE_DISTANCE}), MIN({PACE}), SUM({EFFECTIVE_DISTANCE}), \
         MIN(e.date), MAX(e.date) "
    ));
    sql.push(FROM_EXERCISES);
    sql.push(" WHERE ");
    write_predicate(&mut sql, &query.filter);

    if let Some(key) = key {
        sql.push(" GROUP BY ");
        sql.push(key);
        if let Some(min_count) = query.min_count {
            sql.push(" HAVING COUNT(1) >= ");
            sql.bind(SqlValue::Integer(i64::from(min_count)));
        }
        if let Some((order, ascending)) = query.order {
            sql.push(" ORDER BY ");
            sql.push(&aggregate_order_column(order, query.group));
            sql.push(direction(ascending));
        }
    }
    sql
}

/// Distinct non-empty values of a field, most used first.
pub(crate) fn select_labels(field: Field, filter: &Predicate) -> Sql {
    let col = column(field);
    let mut sql = Sql::new(&format!("SELECT {col} AS label, COUNT(1) AS uses "));
    sql.push(FROM_EXERCISES);
    sql.push(" WHERE (");
    write_predicate(&mut sql, filter);
    sql.push(&format!(") AND {col} IS NOT NULL AND {col} != '' GROUP BY label ORDER BY uses DESC"));
    sql
}
