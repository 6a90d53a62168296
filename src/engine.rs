//! # Exercise Engine
//!
//! Query, ranking and aggregation over an injected [`RecordStore`].
//!
//! ## Architecture
//!
//! Each call builds a typed plan, runs it against the store, projects the
//! rows and post-processes them (ranking, place matching, series). The only
//! state kept between calls is the route name cache, which the write path
//! clears through [`ExerciseEngine::invalidate_caches`].
//!
//! All calls are synchronous and blocking. The engine is `Sync` whenever the
//! store is, so one engine can serve several reader threads.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::cache::RouteNameCache;
use crate::config::EngineConfig;
use crate::error::{OptionExt, Result};
use crate::items::{
    DistanceItem, Exerlite, GroupStats, IntervalItem, PlaceItem, Ranked, RouteItem,
};
use crate::model::{
    Distance, Exercise, ExerciseId, ExerciseType, Place, PlaceId, Route, RouteId, Trail,
};
use crate::places::{self, DegreeEllipse, PlaceIndex};
use crate::projector::{self, RouteNames};
use crate::query::{
    distance_item_order, exercise_order, group_order, place_item_order, type_filter,
    AggregateQuery, CompareOp, ExerciseQuery, Field, GroupAggregate, GroupBy, GroupKey, ItemOrder,
    OrderBy, Predicate, SortContext, SortMode,
};
use crate::ranking;
use crate::series::{self, Series};
use crate::store::RecordStore;
use crate::GpsPoint;

/// Fields searched by free-text search.
const SEARCH_FIELDS: [Field; 7] = [
    Field::DateText,
    Field::RouteName,
    Field::RouteVariant,
    Field::DataSource,
    Field::RecordingMethod,
    Field::Note,
    Field::Type,
];

// ============================================================================
// Exercise Engine
// ============================================================================

/// Query engine over an exercise record store.
pub struct ExerciseEngine<S: RecordStore> {
    store: S,
    config: EngineConfig,
    route_names: Mutex<RouteNameCache>,
    /// Fixed "today" for month integrals; the local date when unset
    today: Option<NaiveDate>,
}

impl<S: RecordStore> ExerciseEngine<S> {
    /// Create an engine over a store.
    pub fn new(store: S, config: EngineConfig) -> Self {
        log::info!(
            "[ExerciseEngine] Created (band -{}%/+{}%, {} visible types)",
            config.band_lower_ratio * 100.0,
            config.band_upper_ratio * 100.0,
            config.default_visible_types.len()
        );
        let route_names = Mutex::new(RouteNameCache::new(config.route_name_cache_capacity));
        Self {
            store,
            config,
            route_names,
            today: None,
        }
    }

    /// Pin the date treated as today.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop cached route names. Call after routes are renamed or removed.
    pub fn invalidate_caches(&self) {
        self.cache().clear();
        log::debug!("[ExerciseEngine] Route name cache cleared");
    }

    /// Drop the cached name of one route. Call after it is renamed or removed.
    pub fn invalidate_route(&self, id: RouteId) {
        self.cache().invalidate(id);
        log::debug!("[ExerciseEngine] Route {} dropped from name cache", id);
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn cache(&self) -> MutexGuard<'_, RouteNameCache> {
        self.route_names
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Projection Helpers
    // ========================================================================

    fn route_name_map(
        &self,
        ids: impl IntoIterator<Item = RouteId>,
    ) -> Result<HashMap<RouteId, String>> {
        let mut cache = self.cache();
        let mut names = HashMap::new();
        for id in ids {
            if names.contains_key(&id) {
                continue;
            }
            let name = cache.resolve(id, |id| Ok(self.store.route(id)?.map(|r| r.name)))?;
            names.insert(id, name);
        }
        Ok(names)
    }

    fn exerlites(&self, query: &ExerciseQuery) -> Result<Vec<Exerlite>> {
        let rows = self.store.exerlite_rows(query)?;
        let names = self.route_name_map(rows.iter().filter_map(|r| r.route_id))?;
        Ok(projector::project_exerlites(rows, &names))
    }

    fn exercises(&self, query: &ExerciseQuery) -> Result<Vec<Exercise>> {
        let records = self.store.exercise_records(query)?;
        let names = self.route_name_map(records.iter().filter_map(|r| r.route_id))?;
        Ok(records
            .into_iter()
            .map(|record| projector::project_exercise(record, &names))
            .collect())
    }

    fn sorted(&self, filter: Predicate, sort: SortMode, ascending: bool) -> Result<Vec<Exerlite>> {
        let order = exercise_order(sort, ascending)?;
        self.exerlites(&ExerciseQuery::new(filter).order_by(order))
    }

    fn ranked(
        &self,
        filter: Predicate,
        sort: SortMode,
        ascending: bool,
    ) -> Result<Vec<Ranked<Exerlite>>> {
        let lites = self.sorted(filter, sort, ascending)?;
        Ok(ranking::rank_by_pace(lites, Exerlite::pace))
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Exercises of the given types; all types when `types` is empty.
    pub fn list_by_type(
        &self,
        types: &[ExerciseType],
        sort: SortMode,
        ascending: bool,
    ) -> Result<Vec<Exerlite>> {
        self.sorted(type_filter(types), sort, ascending)
    }

    /// Exercises on a route, with the three fastest ranked.
    pub fn list_by_route(
        &self,
        route_id: RouteId,
        sort: SortMode,
        ascending: bool,
        types: &[ExerciseType],
    ) -> Result<Vec<Ranked<Exerlite>>> {
        let filter = Predicate::eq(Field::RouteId, route_id).and(type_filter(types));
        self.ranked(filter, sort, ascending)
    }

    /// Exercises in the fuzzy band around `target`, plus longer exercises
    /// that make the bucket's podium.
    pub fn list_by_distance_bucket(
        &self,
        target: i32,
        sort: SortMode,
        ascending: bool,
        types: &[ExerciseType],
    ) -> Result<Vec<Ranked<Exerlite>>> {
        let band = self.config.band(target);
        let filter = Predicate::compare(Field::EffectiveDistance, CompareOp::Gte, band.min)
            .and(type_filter(types));
        let lites = self.sorted(filter, sort, ascending)?;
        Ok(ranking::select_bucket(lites, band))
    }

    /// Exercises that start or end inside a place.
    pub fn list_by_place(
        &self,
        place: &Place,
        sort: SortMode,
        ascending: bool,
        types: &[ExerciseType],
    ) -> Result<Vec<Ranked<Exerlite>>> {
        let order = exercise_order(sort, ascending)?;
        let Some(ellipse) = DegreeEllipse::around(place.center(), place.radius) else {
            log::debug!("[ExerciseEngine] Place '{}' has no usable radius", place.name);
            return Ok(Vec::new());
        };
        let filter = endpoint_filter(ellipse).and(type_filter(types));
        let lites = self.exerlites(&ExerciseQuery::new(filter).order_by(order))?;
        Ok(ranking::rank_by_pace(lites, Exerlite::pace))
    }

    /// Exercises of a recurring interval.
    pub fn list_by_interval(
        &self,
        interval: &str,
        sort: SortMode,
        ascending: bool,
    ) -> Result<Vec<Ranked<Exerlite>>> {
        self.ranked(Predicate::eq(Field::Interval, interval), sort, ascending)
    }

    /// Exercises between two instants, inclusive. Reversed bounds are swapped.
    pub fn list_by_date_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        sort: SortMode,
        ascending: bool,
        types: &[ExerciseType],
    ) -> Result<Vec<Exerlite>> {
        let (first, last) = if start <= end { (start, end) } else { (end, start) };
        let filter = Predicate::between(Field::Date, first, last).and(type_filter(types));
        self.sorted(filter, sort, ascending)
    }

    /// Free-text search over ids, dates and labels, limited to the default
    /// visible types. Empty text lists every visible exercise.
    pub fn search(&self, text: &str, sort: SortMode, ascending: bool) -> Result<Vec<Exerlite>> {
        let text = text.trim();
        let visible = &self.config.default_visible_types;
        if text.is_empty() {
            return self.list_by_type(visible, sort, ascending);
        }

        let mut matches = vec![Predicate::eq(Field::IdTag, text)];
        if let Ok(id) = text.parse::<ExerciseId>() {
            matches.push(Predicate::eq(Field::Id, id));
        }
        matches.extend(SEARCH_FIELDS.iter().map(|&field| Predicate::TextContainsCi {
            field,
            text: text.to_string(),
        }));

        let filter = Predicate::any(matches).and(type_filter(visible));
        let results = self.sorted(filter, sort, ascending)?;
        log::debug!("[ExerciseEngine] Search '{}' matched {}", text, results.len());
        Ok(results)
    }

    // ========================================================================
    // Pace Series
    // ========================================================================

    /// Paces of the distance bucket selection, oldest first.
    pub fn pace_series_by_distance_bucket(
        &self,
        target: i32,
        types: &[ExerciseType],
    ) -> Result<Series> {
        let selected = self.list_by_distance_bucket(target, SortMode::Date, true, types)?;
        Ok(series::pace_progression(
            selected.iter().filter_map(|r| r.item.pace()),
        ))
    }

    /// Paces on a route, oldest first.
    pub fn pace_series_by_route(
        &self,
        route_id: RouteId,
        types: &[ExerciseType],
    ) -> Result<Series> {
        let filter = Predicate::eq(Field::RouteId, route_id).and(type_filter(types));
        let lites = self.sorted(filter, SortMode::Date, true)?;
        Ok(series::pace_progression(lites.iter().filter_map(Exerlite::pace)))
    }

    // ========================================================================
    // Distance Series
    // ========================================================================

    fn distance_samples(
        &self,
        types: &[ExerciseType],
        (first, last): (NaiveDate, NaiveDate),
    ) -> Result<Vec<(NaiveDate, i32)>> {
        let start = first.and_time(NaiveTime::MIN);
        let end = last.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1);
        let lites = self.list_by_date_range(start, end, SortMode::Date, true, types)?;
        Ok(lites.iter().map(|e| (e.date.date(), e.distance)).collect())
    }

    /// Distance per weekday (1–7) of the week containing `date`.
    pub fn weekly_daily_distance(&self, types: &[ExerciseType], date: NaiveDate) -> Result<Series> {
        let samples = self.distance_samples(types, series::week_bounds(date))?;
        Ok(series::week_daily(samples, date))
    }

    /// Distance per month (1–12) of the year containing `date`.
    pub fn yearly_monthly_distance(
        &self,
        types: &[ExerciseType],
        date: NaiveDate,
    ) -> Result<Series> {
        let samples = self.distance_samples(types, series::year_bounds(date))?;
        Ok(series::year_monthly(samples, date))
    }

    /// Running total over the month containing `date`, by day.
    pub fn monthly_integral_distance(
        &self,
        types: &[ExerciseType],
        date: NaiveDate,
    ) -> Result<Series> {
        let samples = self.distance_samples(types, series::month_bounds(date))?;
        Ok(series::month_daily_integral(samples, date, self.today()))
    }

    /// Running total over the year containing `date`, by week.
    pub fn yearly_integral_distance(
        &self,
        types: &[ExerciseType],
        date: NaiveDate,
    ) -> Result<Series> {
        let samples = self.distance_samples(types, series::year_bounds(date))?;
        Ok(series::year_weekly_integral(samples, date))
    }

    pub fn yearly_monthly_distance_goal(&self) -> Series {
        series::year_monthly_goal(self.config.monthly_distance_goal)
    }

    pub fn monthly_integral_distance_goal(&self, date: NaiveDate) -> Series {
        series::month_integral_goal(date, self.config.monthly_distance_goal)
    }

    pub fn yearly_integral_distance_goal(&self) -> Series {
        series::year_integral_goal(self.config.yearly_distance_goal, self.config.goal_weeks)
    }

    // ========================================================================
    // Places
    // ========================================================================

    /// Stored places containing a point.
    pub fn places_containing(&self, point: GpsPoint) -> Result<Vec<Place>> {
        let index = PlaceIndex::new(self.store.places(true)?);
        Ok(index.containing(point).into_iter().cloned().collect())
    }

    /// Propose places for trail endpoints no stored place covers, newest
    /// exercise first. Nothing is written.
    pub fn discover_places(&self) -> Result<Vec<Place>> {
        let known = self.store.places(true)?;
        let filter = Predicate::IsNotNull(Field::StartLat)
            .and(Predicate::IsNotNull(Field::StartLng))
            .and(Predicate::IsNotNull(Field::EndLat))
            .and(Predicate::IsNotNull(Field::EndLng));
        let query = ExerciseQuery::new(filter).order_by(OrderBy {
            field: Field::Date,
            ascending: false,
        });
        let records = self.store.exercise_records(&query)?;
        log::info!(
            "[ExerciseEngine] Discovering places from {} trails against {} known places",
            records.len(),
            known.len()
        );

        let endpoints = records.into_iter().filter_map(|r| Some((r.start?, r.end?)));
        Ok(places::discover(
            known,
            endpoints,
            self.config.default_place_radius,
        ))
    }

    // ========================================================================
    // Aggregate Items
    // ========================================================================

    /// Routes with their exercise count, average distance and best pace.
    pub fn route_items(
        &self,
        sort: SortMode,
        ascending: bool,
        include_hidden: bool,
        types: &[ExerciseType],
    ) -> Result<Vec<RouteItem>> {
        let (order, ascending) = group_order(SortContext::Routes, sort, ascending)?;
        let mut filter = Predicate::IsNotNull(Field::RouteName).and(type_filter(types));
        if !include_hidden {
            filter = filter.and(Predicate::eq(Field::RouteHidden, false));
        }
        let query = self.group_query(filter, GroupBy::Route, include_hidden)
            .order_by(order, ascending);

        let groups = self.store.aggregate(&query)?;
        let names = self.route_name_map(groups.iter().filter_map(|g| match g.key {
            GroupKey::Route(id) => Some(id),
            _ => None,
        }))?;

        let items: Vec<RouteItem> = groups
            .iter()
            .filter_map(|g| match g.key {
                GroupKey::Route(id) => Some(RouteItem {
                    route_id: id,
                    name: names.route_name(Some(id)),
                    stats: stats_of(g),
                }),
                _ => None,
            })
            .collect();
        log::info!("[ExerciseEngine] Listed {} route items", items.len());
        Ok(items)
    }

    /// Stored distance buckets with their band statistics.
    pub fn distance_items(
        &self,
        sort: SortMode,
        ascending: bool,
        types: &[ExerciseType],
    ) -> Result<Vec<DistanceItem>> {
        let order = distance_item_order(sort)?;
        let mut items = Vec::new();
        for distance in self.store.distances()? {
            let band = self.config.band(distance.length);
            let in_band = self.aggregate_all(
                Predicate::between(Field::EffectiveDistance, band.min, band.max)
                    .and(type_filter(types)),
            )?;
            let reach = self.aggregate_all(
                Predicate::compare(Field::EffectiveDistance, CompareOp::Gte, band.min)
                    .and(type_filter(types)),
            )?;
            items.push(DistanceItem {
                distance: distance.length,
                goal_pace: distance.goal_pace,
                stats: GroupStats {
                    best_pace: reach.best_pace,
                    ..in_band
                },
            });
        }

        sort_items(&mut items, order, ascending, |item, order| match order {
            ItemOrder::Count => SortValue::Number(f64::from(item.stats.count)),
            ItemOrder::BestPace => SortValue::Maybe(item.stats.best_pace),
            _ => SortValue::Number(f64::from(item.distance)),
        });
        log::info!("[ExerciseEngine] Listed {} distance items", items.len());
        Ok(items)
    }

    /// Recurring intervals with their exercise count.
    pub fn interval_items(
        &self,
        sort: SortMode,
        ascending: bool,
        include_hidden: bool,
    ) -> Result<Vec<IntervalItem>> {
        let (order, ascending) = group_order(SortContext::Intervals, sort, ascending)?;
        let filter = Predicate::ne(Field::Interval, "");
        let query = self.group_query(filter, GroupBy::Interval, include_hidden)
            .order_by(order, ascending);

        let items: Vec<IntervalItem> = self
            .store
            .aggregate(&query)?
            .iter()
            .filter_map(|g| match &g.key {
                GroupKey::Interval(label) => Some(IntervalItem {
                    interval: label.clone(),
                    stats: stats_of(g),
                }),
                _ => None,
            })
            .collect();
        log::info!("[ExerciseEngine] Listed {} interval items", items.len());
        Ok(items)
    }

    /// Places with the exercises starting or ending in them.
    pub fn place_items(
        &self,
        sort: SortMode,
        ascending: bool,
        include_hidden: bool,
    ) -> Result<Vec<PlaceItem>> {
        let order = place_item_order(sort)?;
        let mut items = Vec::new();
        for place in self.store.places(include_hidden)? {
            let stats = match DegreeEllipse::around(place.center(), place.radius) {
                Some(ellipse) => self.aggregate_all(endpoint_filter(ellipse))?,
                None => GroupStats::default(),
            };
            items.push(PlaceItem {
                place_id: place.id.unwrap_or_default(),
                name: place.name,
                lat: place.lat,
                lng: place.lng,
                stats,
            });
        }

        sort_items(&mut items, order, ascending, |item, order| match order {
            ItemOrder::Count => SortValue::Number(f64::from(item.stats.count)),
            ItemOrder::Lat => SortValue::Number(item.lat),
            ItemOrder::Lng => SortValue::Number(item.lng),
            _ => SortValue::Text(item.name.to_lowercase()),
        });
        log::info!("[ExerciseEngine] Listed {} place items", items.len());
        Ok(items)
    }

    fn group_query(
        &self,
        filter: Predicate,
        group: GroupBy,
        include_hidden: bool,
    ) -> AggregateQuery {
        let query = AggregateQuery::new(filter, group);
        if self.config.hide_singleton_groups && !include_hidden {
            query.min_count(2)
        } else {
            query
        }
    }

    fn aggregate_all(&self, filter: Predicate) -> Result<GroupStats> {
        let groups = self
            .store
            .aggregate(&AggregateQuery::new(filter, GroupBy::All))?;
        Ok(groups.first().map(stats_of).unwrap_or_default())
    }

    // ========================================================================
    // Fetches
    // ========================================================================

    /// Full exercise by id.
    pub fn exercise(&self, id: ExerciseId) -> Result<Exercise> {
        let query = ExerciseQuery::new(Predicate::eq(Field::Id, id)).limit(1);
        self.exercises(&query)?
            .into_iter()
            .next()
            .ok_or_not_found("exercise", id)
    }

    /// Full exercise by its external sync id.
    pub fn exercise_by_external_id(&self, external_id: i64) -> Result<Exercise> {
        let query = ExerciseQuery::new(Predicate::eq(Field::ExternalId, external_id)).limit(1);
        self.exercises(&query)?
            .into_iter()
            .next()
            .ok_or_not_found("exercise with external id", external_id)
    }

    pub fn exerlite(&self, id: ExerciseId) -> Result<Exerlite> {
        let query = ExerciseQuery::new(Predicate::eq(Field::Id, id)).limit(1);
        self.exerlites(&query)?
            .into_iter()
            .next()
            .ok_or_not_found("exercise", id)
    }

    /// Exercises logged at an instant: the exact second, the start of its
    /// minute, or midnight of its day.
    pub fn exercises_at(&self, date_time: NaiveDateTime) -> Result<Vec<Exercise>> {
        let minute = date_time
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(date_time);
        let midnight = date_time.date().and_time(NaiveTime::MIN);
        let filter = Predicate::In {
            field: Field::Date,
            values: vec![date_time.into(), minute.into(), midnight.into()],
        };
        self.exercises(&ExerciseQuery::new(filter))
    }

    /// Trail of an exercise, `None` when it has none.
    pub fn trail(&self, id: ExerciseId) -> Result<Option<Trail>> {
        Ok(self.exercise(id)?.trail)
    }

    pub fn route(&self, id: RouteId) -> Result<Route> {
        self.store.route(id)?.ok_or_not_found("route", id)
    }

    pub fn route_by_name(&self, name: &str) -> Result<Route> {
        self.store.route_by_name(name)?.ok_or_not_found("route", name)
    }

    /// Route name, `ROUTE_NO_NAME` for unknown routes.
    pub fn route_name(&self, id: RouteId) -> Result<String> {
        Ok(self.route_name_map([id])?.route_name(Some(id)))
    }

    pub fn routes(&self, include_hidden: bool) -> Result<Vec<Route>> {
        self.store.routes(include_hidden)
    }

    pub fn place(&self, id: PlaceId) -> Result<Place> {
        self.store.place(id)?.ok_or_not_found("place", id)
    }

    pub fn places(&self, include_hidden: bool) -> Result<Vec<Place>> {
        self.store.places(include_hidden)
    }

    pub fn distances(&self) -> Result<Vec<Distance>> {
        self.store.distances()
    }

    // ========================================================================
    // Label Pickers
    // ========================================================================

    /// Types in use, most used first.
    pub fn types(&self) -> Result<Vec<ExerciseType>> {
        let labels = self.store.distinct_labels(Field::Type, &Predicate::True)?;
        let mut types: Vec<ExerciseType> = Vec::with_capacity(labels.len());
        for t in labels.iter().map(|l| ExerciseType::from_label(l)) {
            if !types.contains(&t) {
                types.push(t);
            }
        }
        Ok(types)
    }

    /// Route names in use, most used first.
    pub fn route_names_by_use(&self) -> Result<Vec<String>> {
        self.store.distinct_labels(Field::RouteName, &Predicate::True)
    }

    /// Variants recorded on a route, most used first.
    pub fn route_variations(&self, route_id: RouteId) -> Result<Vec<String>> {
        self.store
            .distinct_labels(Field::RouteVariant, &Predicate::eq(Field::RouteId, route_id))
    }

    pub fn intervals(&self) -> Result<Vec<String>> {
        self.store.distinct_labels(Field::Interval, &Predicate::True)
    }

    pub fn data_sources(&self) -> Result<Vec<String>> {
        self.store.distinct_labels(Field::DataSource, &Predicate::True)
    }

    pub fn recording_methods(&self) -> Result<Vec<String>> {
        self.store
            .distinct_labels(Field::RecordingMethod, &Predicate::True)
    }

    // ========================================================================
    // Misc Reads
    // ========================================================================

    pub fn external_ids(&self) -> Result<Vec<i64>> {
        self.store.external_ids()
    }

    pub fn has_external_id(&self, external_id: i64) -> Result<bool> {
        let query =
            ExerciseQuery::new(Predicate::eq(Field::ExternalId, external_id)).limit(1);
        Ok(!self.store.exerlite_rows(&query)?.is_empty())
    }

    /// Average measured distance on a route variant, 0 when none is measured.
    pub fn avg_distance(&self, route_id: RouteId, variant: &str) -> Result<i32> {
        let filter = Predicate::eq(Field::RouteId, route_id)
            .and(Predicate::eq(Field::RouteVariant, variant))
            .and(Predicate::compare(Field::Distance, CompareOp::Gt, 0));
        Ok(self.aggregate_all(filter)?.avg_distance)
    }

    /// Longest stored bucket whose length falls in the band around `length`.
    pub fn longest_distance_within_limits(&self, length: i32) -> Result<Option<i32>> {
        let band = self.config.band(length);
        Ok(self
            .store
            .distances()?
            .into_iter()
            .map(|d| d.length)
            .filter(|l| band.contains(*l))
            .max())
    }

    /// Polylines recorded on a route, optionally a single variant.
    pub fn polylines_by_route(
        &self,
        route_id: RouteId,
        variant: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut filter = Predicate::eq(Field::RouteId, route_id);
        if let Some(variant) = variant {
            filter = filter.and(Predicate::eq(Field::RouteVariant, variant));
        }
        Ok(self
            .store
            .polylines(&filter)?
            .into_iter()
            .map(|(_, polyline)| polyline)
            .collect())
    }

    /// Visible polylines of every exercise except one.
    pub fn polylines_except(&self, exercise_id: ExerciseId) -> Result<Vec<(ExerciseId, String)>> {
        let filter = Predicate::ne(Field::Id, exercise_id)
            .and(Predicate::eq(Field::TrailHidden, false));
        self.store.polylines(&filter)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Start or end coordinate inside the ellipse.
fn endpoint_filter(ellipse: DegreeEllipse) -> Predicate {
    Predicate::any(vec![
        Predicate::WithinEllipse {
            lat: Field::StartLat,
            lng: Field::StartLng,
            ellipse,
        },
        Predicate::WithinEllipse {
            lat: Field::EndLat,
            lng: Field::EndLng,
            ellipse,
        },
    ])
}

fn stats_of(group: &GroupAggregate) -> GroupStats {
    GroupStats {
        count: group.count,
        avg_distance: group.avg_distance.round() as i32,
        best_pace: group.best_pace,
    }
}

/// Sort key for in-memory item lists. Undefined values sort first, as in the store.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Number(f64),
    Maybe(Option<f64>),
    Text(String),
}

fn compare_values(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
        (SortValue::Maybe(a), SortValue::Maybe(b)) => match (a, b) {
            (Some(a), Some(b)) => a.total_cmp(b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Stable sort, so ties keep the store's order.
fn sort_items<T>(
    items: &mut [T],
    order: ItemOrder,
    ascending: bool,
    key: impl Fn(&T, ItemOrder) -> SortValue,
) {
    items.sort_by(|a, b| {
        let ordering = compare_values(&key(a, order), &key(b, order));
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}
