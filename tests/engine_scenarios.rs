//! End-to-end engine scenarios over the bundled SQLite store.
//!
//! Each test seeds a fresh in-memory store (one uses an on-disk database in a
//! temp dir) and checks listings, rankings, place matching and chart series
//! through the public engine API.
//!
//! Run with: `cargo test --test engine_scenarios`
//! Set `RUST_LOG=debug` to see the generated queries.

use chrono::{NaiveDate, NaiveDateTime};
use exercise_log::places;
use exercise_log::{
    EngineConfig, EngineError, Exercise, ExerciseEngine, ExerciseType, GpsPoint, Place, Route,
    SortMode, SqliteStore, Sub, Trail, ROUTE_NO_NAME,
};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn engine_with(config: EngineConfig) -> ExerciseEngine<SqliteStore> {
    init_logging();
    let store = SqliteStore::in_memory().expect("failed to open in-memory store");
    ExerciseEngine::new(store, config)
}

fn engine() -> ExerciseEngine<SqliteStore> {
    engine_with(EngineConfig::default())
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    day(y, m, d).and_hms_opt(h, 0, 0).unwrap()
}

fn run(date: NaiveDateTime, distance: i32, time: f64) -> Exercise {
    Exercise {
        id: 0,
        external_id: None,
        exercise_type: ExerciseType::Run,
        date,
        route_id: None,
        route_name: String::new(),
        route_variant: String::new(),
        interval: String::new(),
        note: String::new(),
        data_source: String::new(),
        recording_method: String::new(),
        distance,
        estimated_distance: None,
        time,
        subs: Vec::new(),
        trail: None,
        trail_hidden: false,
    }
}

fn with_trail(mut exercise: Exercise, start: (f64, f64), end: (f64, f64)) -> Exercise {
    let start = GpsPoint::new(start.0, start.1);
    let end = GpsPoint::new(end.0, end.1);
    let line = geo::LineString::from(vec![
        (start.longitude, start.latitude),
        (end.longitude, end.latitude),
    ]);
    let encoded = polyline::encode_coordinates(line, 5).expect("encodable trail");
    exercise.trail = Some(Trail::new(encoded, start, end));
    exercise
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> i64) -> Vec<i64> {
    items.iter().map(id).collect()
}

// ============================================================================
// Listings
// ============================================================================

#[test]
fn test_list_by_type_filters_and_empty_means_all() {
    let engine = engine();
    let store = engine.store();
    let mut walk = run(at(2024, 3, 2, 9), 4000, 2400.0);
    walk.exercise_type = ExerciseType::Walk;
    let mut ride = run(at(2024, 3, 3, 9), 30_000, 3600.0);
    ride.exercise_type = ExerciseType::Ride;

    let r = store.add_exercise(&run(at(2024, 3, 1, 9), 5000, 1500.0)).unwrap();
    let w = store.add_exercise(&walk).unwrap();
    let b = store.add_exercise(&ride).unwrap();

    let runs = engine
        .list_by_type(&[ExerciseType::Run], SortMode::Date, true)
        .unwrap();
    assert_eq!(ids(&runs, |e| e.id), vec![r]);

    let all = engine.list_by_type(&[], SortMode::Date, false).unwrap();
    assert_eq!(ids(&all, |e| e.id), vec![b, w, r]);

    let foot = engine
        .list_by_type(&[ExerciseType::Run, ExerciseType::Walk], SortMode::Distance, false)
        .unwrap();
    assert_eq!(ids(&foot, |e| e.id), vec![r, w]);
}

#[test]
fn test_empty_store_lists_nothing() {
    let engine = engine();
    assert!(engine.list_by_type(&[], SortMode::Date, true).unwrap().is_empty());
    assert!(engine
        .list_by_distance_bucket(5000, SortMode::Date, true, &[])
        .unwrap()
        .is_empty());
    assert!(engine.route_items(SortMode::Name, true, true, &[]).unwrap().is_empty());
    assert!(engine.discover_places().unwrap().is_empty());
}

#[test]
fn test_distance_bucket_ranks_and_pace_series() {
    let engine = engine();
    let store = engine.store();
    let first = store.add_exercise(&run(at(2024, 4, 1, 7), 5000, 1500.0)).unwrap();
    let second = store.add_exercise(&run(at(2024, 4, 3, 7), 5000, 1600.0)).unwrap();
    store.add_exercise(&run(at(2024, 4, 5, 7), 10_000, 3200.0)).unwrap();

    let bucket = engine
        .list_by_distance_bucket(5000, SortMode::Date, true, &[])
        .unwrap();
    assert_eq!(ids(&bucket, |r| r.item.id), vec![first, second]);
    assert_eq!(bucket[0].rank, Some(1));
    assert_eq!(bucket[1].rank, Some(2));

    let series = engine.pace_series_by_distance_bucket(5000, &[]).unwrap();
    assert_eq!(series.ys(), vec![300.0, 320.0]);
}

#[test]
fn test_distance_bucket_keeps_faster_longer_effort() {
    let engine = engine();
    let store = engine.store();
    let slow = store.add_exercise(&run(at(2024, 4, 1, 7), 5100, 1632.0)).unwrap();
    let stretch = store.add_exercise(&run(at(2024, 4, 2, 7), 10_000, 3000.0)).unwrap();
    store.add_exercise(&run(at(2024, 4, 3, 7), 4000, 1000.0)).unwrap();

    let bucket = engine
        .list_by_distance_bucket(5000, SortMode::Date, true, &[])
        .unwrap();
    assert_eq!(ids(&bucket, |r| r.item.id), vec![slow, stretch]);
    assert_eq!(bucket[0].rank, Some(2));
    assert_eq!(bucket[1].rank, Some(1));
}

#[test]
fn test_distance_bucket_keeps_every_faster_longer_effort() {
    let engine = engine();
    let store = engine.store();
    let five = store.add_exercise(&run(at(2024, 4, 1, 7), 5000, 1500.0)).unwrap();
    let ten = store.add_exercise(&run(at(2024, 4, 2, 7), 10_000, 2900.0)).unwrap();
    let faster_ten = store.add_exercise(&run(at(2024, 4, 3, 7), 10_000, 2800.0)).unwrap();

    let bucket = engine
        .list_by_distance_bucket(5000, SortMode::Date, true, &[])
        .unwrap();
    assert_eq!(ids(&bucket, |r| r.item.id), vec![five, ten, faster_ten]);
    let ranks: Vec<_> = bucket.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![Some(3), Some(2), Some(1)]);

    let series = engine.pace_series_by_distance_bucket(5000, &[]).unwrap();
    assert_eq!(series.ys(), vec![300.0, 290.0, 280.0]);
}

#[test]
fn test_distance_bucket_without_band_uses_longer_efforts() {
    let engine = engine();
    let store = engine.store();
    let long = store.add_exercise(&run(at(2024, 4, 2, 7), 10_000, 3000.0)).unwrap();

    let bucket = engine
        .list_by_distance_bucket(5000, SortMode::Date, true, &[])
        .unwrap();
    assert_eq!(ids(&bucket, |r| r.item.id), vec![long]);
    assert_eq!(bucket[0].rank, Some(1));
}

#[test]
fn test_list_by_route_and_pace_series() {
    let engine = engine();
    let store = engine.store();
    let route = store.add_route(&Route::new(0, "Lakeside")).unwrap();

    let mut ids_on_route = Vec::new();
    for (d, time) in [(1, 1500.0), (2, 1450.0), (3, 1550.0), (4, 1400.0)] {
        let mut e = run(at(2024, 6, d, 7), 5000, time);
        e.route_id = Some(route);
        ids_on_route.push(store.add_exercise(&e).unwrap());
    }
    store.add_exercise(&run(at(2024, 6, 5, 7), 5000, 1000.0)).unwrap();

    let listed = engine
        .list_by_route(route, SortMode::Date, true, &[])
        .unwrap();
    assert_eq!(ids(&listed, |r| r.item.id), ids_on_route);
    assert!(listed.iter().all(|r| r.item.route_name == "Lakeside"));

    let ranks: Vec<Option<u8>> = listed.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![Some(3), Some(2), None, Some(1)]);

    let series = engine.pace_series_by_route(route, &[]).unwrap();
    assert_eq!(series.ys(), vec![300.0, 290.0, 310.0, 280.0]);
    assert_eq!(series.xs(), vec![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_list_by_interval() {
    let engine = engine();
    let store = engine.store();
    let mut reps = run(at(2024, 2, 1, 18), 0, 0.0);
    reps.interval = "4x400".to_string();
    reps.subs = vec![Sub { distance: 400, time: 80.0 }; 4];
    let reps_id = store.add_exercise(&reps).unwrap();
    store.add_exercise(&run(at(2024, 2, 2, 18), 5000, 1500.0)).unwrap();

    let listed = engine.list_by_interval("4x400", SortMode::Pace, true).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].item.id, reps_id);
    assert_eq!(listed[0].item.distance, 1600);
    assert_eq!(listed[0].item.pace(), Some(200.0));
    assert_eq!(listed[0].rank, Some(1));
}

#[test]
fn test_list_by_date_range_swaps_reversed_bounds() {
    let engine = engine();
    let store = engine.store();
    store.add_exercise(&run(at(2024, 1, 1, 8), 5000, 1500.0)).unwrap();
    let inside = store.add_exercise(&run(at(2024, 1, 15, 8), 5000, 1500.0)).unwrap();
    store.add_exercise(&run(at(2024, 2, 1, 8), 5000, 1500.0)).unwrap();

    let forward = engine
        .list_by_date_range(at(2024, 1, 10, 0), at(2024, 1, 20, 0), SortMode::Date, true, &[])
        .unwrap();
    let reversed = engine
        .list_by_date_range(at(2024, 1, 20, 0), at(2024, 1, 10, 0), SortMode::Date, true, &[])
        .unwrap();
    assert_eq!(ids(&forward, |e| e.id), vec![inside]);
    assert_eq!(forward, reversed);
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_matches_labels_and_id_tag() {
    let engine = engine();
    let store = engine.store();
    let route = store.add_route(&Route::new(0, "Lakeside Loop")).unwrap();

    let mut on_route = run(at(2024, 5, 1, 7), 5000, 1500.0);
    on_route.route_id = Some(route);
    let lake = store.add_exercise(&on_route).unwrap();

    let mut noted = run(at(2024, 5, 2, 7), 5000, 1500.0);
    noted.note = "100% effort".to_string();
    let percent = store.add_exercise(&noted).unwrap();

    let mut underscored = run(at(2024, 5, 3, 7), 5000, 1500.0);
    underscored.data_source = "watch_v2".to_string();
    let underscore = store.add_exercise(&underscored).unwrap();

    let found = engine.search("lakeside", SortMode::Date, true).unwrap();
    assert_eq!(ids(&found, |e| e.id), vec![lake]);

    let found = engine.search("%", SortMode::Date, true).unwrap();
    assert_eq!(ids(&found, |e| e.id), vec![percent]);

    let found = engine.search("_", SortMode::Date, true).unwrap();
    assert_eq!(ids(&found, |e| e.id), vec![underscore]);

    let tag = format!("#{}", percent);
    let found = engine.search(&tag, SortMode::Date, true).unwrap();
    assert_eq!(ids(&found, |e| e.id), vec![percent]);

    let found = engine.search("2024-05-03", SortMode::Date, true).unwrap();
    assert_eq!(ids(&found, |e| e.id), vec![underscore]);

    let all = engine.search("   ", SortMode::Date, true).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_search_folds_non_ascii_case() {
    let engine = engine();
    let store = engine.store();
    let mut noted = run(at(2024, 5, 1, 7), 5000, 1500.0);
    noted.note = "Östermalm loop".to_string();
    let id = store.add_exercise(&noted).unwrap();
    store.add_exercise(&run(at(2024, 5, 2, 7), 5000, 1500.0)).unwrap();

    for text in ["östermalm", "ÖSTERMALM LOOP", "Östermalm"] {
        let found = engine.search(text, SortMode::Date, true).unwrap();
        assert_eq!(ids(&found, |e| e.id), vec![id], "search '{}'", text);
    }
}

#[test]
fn test_search_limited_to_visible_types() {
    let config = EngineConfig {
        default_visible_types: vec![ExerciseType::Run],
        ..EngineConfig::default()
    };
    let engine = engine_with(config);
    let store = engine.store();

    let mut walk = run(at(2024, 5, 1, 7), 3000, 1800.0);
    walk.exercise_type = ExerciseType::Walk;
    walk.note = "harbour".to_string();
    store.add_exercise(&walk).unwrap();
    let mut jog = run(at(2024, 5, 2, 7), 5000, 1500.0);
    jog.note = "harbour".to_string();
    let jog_id = store.add_exercise(&jog).unwrap();

    let found = engine.search("harbour", SortMode::Date, true).unwrap();
    assert_eq!(ids(&found, |e| e.id), vec![jog_id]);
    assert_eq!(engine.search("", SortMode::Date, true).unwrap().len(), 1);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unsupported_sort_modes() {
    let engine = engine();
    assert!(matches!(
        engine.list_by_type(&[], SortMode::Amount, true),
        Err(EngineError::UnsupportedSortMode { .. })
    ));
    assert!(matches!(
        engine.route_items(SortMode::StartLat, true, true, &[]),
        Err(EngineError::UnsupportedSortMode { .. })
    ));
    assert!(matches!(
        engine.distance_items(SortMode::Name, true, &[]),
        Err(EngineError::UnsupportedSortMode { .. })
    ));
}

#[test]
fn test_missing_records() {
    let engine = engine();
    assert!(matches!(
        engine.exercise(999),
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        engine.route_by_name("Nowhere"),
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        engine.exercise_by_external_id(12),
        Err(EngineError::NotFound { .. })
    ));
    assert_eq!(engine.route_name(3).unwrap(), ROUTE_NO_NAME);
}

// ============================================================================
// Aggregate Items
// ============================================================================

#[test]
fn test_route_items_hide_hidden_and_singletons() {
    let config = EngineConfig {
        hide_singleton_groups: true,
        ..EngineConfig::default()
    };
    let engine = engine_with(config);
    let store = engine.store();

    let alpha = store.add_route(&Route::new(0, "Alpha")).unwrap();
    let bravo = store.add_route(&Route::new(0, "Bravo")).unwrap();
    let mut hidden = Route::new(0, "Charlie");
    hidden.hidden = true;
    let charlie = store.add_route(&hidden).unwrap();

    for (route, distance, time) in [
        (alpha, 4000, 1200.0),
        (alpha, 6000, 1500.0),
        (bravo, 5000, 1500.0),
        (charlie, 3000, 900.0),
        (charlie, 3000, 1000.0),
    ] {
        let mut e = run(at(2024, 7, 1, 7), distance, time);
        e.route_id = Some(route);
        store.add_exercise(&e).unwrap();
    }

    let visible = engine.route_items(SortMode::Amount, false, false, &[]).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].name, "Alpha");
    assert_eq!(visible[0].stats.count, 2);
    assert_eq!(visible[0].stats.avg_distance, 5000);
    assert_eq!(visible[0].stats.best_pace, Some(250.0));

    let all = engine.route_items(SortMode::Name, true, true, &[]).unwrap();
    let names: Vec<&str> = all.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);
}

#[test]
fn test_interval_and_distance_items() {
    let engine = engine();
    let store = engine.store();
    store.add_distance(5000, Some(300.0)).unwrap();
    store.add_distance(10_000, None).unwrap();

    for (label, distance, time) in [
        ("4x400", 1600, 330.0),
        ("4x400", 1600, 320.0),
        ("6x200", 1200, 220.0),
        ("", 5000, 1500.0),
        ("", 5200, 1508.0),
        ("", 10_000, 2800.0),
    ] {
        let mut e = run(at(2024, 8, 1, 7), distance, time);
        e.interval = label.to_string();
        store.add_exercise(&e).unwrap();
    }

    let intervals = engine.interval_items(SortMode::Amount, false, true).unwrap();
    let labels: Vec<&str> = intervals.iter().map(|i| i.interval.as_str()).collect();
    assert_eq!(labels, vec!["4x400", "6x200"]);
    assert_eq!(intervals[0].stats.count, 2);

    let distances = engine.distance_items(SortMode::Distance, true, &[]).unwrap();
    assert_eq!(distances.len(), 2);
    assert_eq!(distances[0].distance, 5000);
    assert_eq!(distances[0].goal_pace, Some(300.0));
    assert_eq!(distances[0].stats.count, 2);
    assert_eq!(distances[0].stats.avg_distance, 5100);
    // The 10 km effort is faster and counts toward the 5 km best
    assert_eq!(distances[0].stats.best_pace, Some(280.0));
    assert_eq!(distances[1].stats.count, 1);
}

// ============================================================================
// Places
// ============================================================================

#[test]
fn test_place_matching() {
    let engine = engine();
    let store = engine.store();
    let mut park = Place::new("Park", GpsPoint::new(0.0, 0.0), 100.0);
    let park_id = store.add_place(&park).unwrap();
    park.id = Some(park_id);

    let near = store
        .add_exercise(&with_trail(
            run(at(2024, 9, 1, 7), 5000, 1500.0),
            (0.0005, 0.0),
            (0.02, 0.02),
        ))
        .unwrap();
    store
        .add_exercise(&with_trail(
            run(at(2024, 9, 2, 7), 5000, 1500.0),
            (0.01, 0.0),
            (0.02, 0.0),
        ))
        .unwrap();

    let listed = engine.list_by_place(&park, SortMode::Date, true, &[]).unwrap();
    assert_eq!(ids(&listed, |r| r.item.id), vec![near]);

    let containing = engine.places_containing(GpsPoint::new(0.0005, 0.0)).unwrap();
    assert_eq!(containing.len(), 1);
    assert_eq!(containing[0].name, "Park");
    assert!(engine.places_containing(GpsPoint::new(0.01, 0.0)).unwrap().is_empty());

    let items = engine.place_items(SortMode::Amount, false, true).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].place_id, park_id);
    assert_eq!(items[0].stats.count, 1);
}

#[test]
fn test_zero_radius_place_lists_nothing() {
    let engine = engine();
    engine
        .store()
        .add_exercise(&with_trail(
            run(at(2024, 9, 1, 7), 5000, 1500.0),
            (0.0, 0.0),
            (0.0, 0.0),
        ))
        .unwrap();
    let dot = Place::new("Dot", GpsPoint::new(0.0, 0.0), 0.0);
    assert!(engine
        .list_by_place(&dot, SortMode::Date, true, &[])
        .unwrap()
        .is_empty());
}

#[test]
fn test_discovered_places_cover_every_endpoint() {
    let engine = engine();
    let store = engine.store();
    store
        .add_place(&Place::new("Home", GpsPoint::new(51.5, -0.12), 200.0))
        .unwrap();

    let trails = [
        ((51.5, -0.12), (51.53, -0.10)),
        ((51.5001, -0.1201), (51.53005, -0.10005)),
        ((51.6, -0.2), (51.5, -0.12)),
    ];
    for (i, (start, end)) in trails.iter().enumerate() {
        let e = with_trail(run(at(2024, 10, 1 + i as u32, 7), 5000, 1500.0), *start, *end);
        store.add_exercise(&e).unwrap();
    }

    let discovered = engine.discover_places().unwrap();
    assert_eq!(discovered.len(), 2);
    assert!(discovered.iter().all(|p| p.id.is_none()));
    assert!(discovered
        .iter()
        .all(|p| p.radius == engine.config().default_place_radius));

    for (start, end) in trails {
        for (lat, lng) in [start, end] {
            let point = GpsPoint::new(lat, lng);
            let known = !engine.places_containing(point).unwrap().is_empty();
            let new = discovered.iter().any(|p| places::contains(p, point));
            assert!(known || new, "endpoint ({lat}, {lng}) not covered");
        }
    }

    // Discovery is read-only
    assert_eq!(engine.places(true).unwrap().len(), 1);
}

// ============================================================================
// Distance Series
// ============================================================================

#[test]
fn test_weekly_distance() {
    let engine = engine();
    let store = engine.store();
    // 2024-05-06 is a Monday
    store.add_exercise(&run(at(2024, 5, 6, 7), 3000, 900.0)).unwrap();
    store.add_exercise(&run(at(2024, 5, 8, 7), 2000, 600.0)).unwrap();
    store.add_exercise(&run(at(2024, 5, 13, 7), 9000, 2700.0)).unwrap();

    let week = engine
        .weekly_daily_distance(&[], day(2024, 5, 9))
        .unwrap();
    assert_eq!(week.len(), 7);
    assert_eq!(week.ys(), vec![3000.0, 0.0, 2000.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(week.xs(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
}

#[test]
fn test_yearly_monthly_distance() {
    let engine = engine();
    let store = engine.store();
    store.add_exercise(&run(at(2023, 12, 31, 7), 8000, 2400.0)).unwrap();
    store.add_exercise(&run(at(2024, 1, 10, 7), 5000, 1500.0)).unwrap();
    store.add_exercise(&run(at(2024, 3, 10, 7), 4000, 1200.0)).unwrap();
    store.add_exercise(&run(at(2024, 3, 20, 7), 6000, 1800.0)).unwrap();

    let year = engine.yearly_monthly_distance(&[], day(2024, 6, 1)).unwrap();
    assert_eq!(year.len(), 12);
    assert_eq!(year.get(1.0), Some(5000.0));
    assert_eq!(year.get(2.0), Some(0.0));
    assert_eq!(year.get(3.0), Some(10_000.0));

    let goal = engine.yearly_monthly_distance_goal();
    assert_eq!(goal.len(), 12);
    assert!(goal.ys().iter().all(|y| *y == 100_000.0));
}

#[test]
fn test_integrals_never_decrease() {
    let engine = engine().with_today(day(2024, 12, 31));
    let store = engine.store();
    let samples = [
        (3, 2, 5000),
        (3, 9, 7000),
        (3, 9, 3000),
        (3, 28, 10_000),
        (6, 1, 4000),
    ];
    for (m, d, distance) in samples {
        store.add_exercise(&run(at(2024, m, d, 7), distance, 1800.0)).unwrap();
    }

    let month = engine.monthly_integral_distance(&[], day(2024, 3, 15)).unwrap();
    assert_eq!(month.len(), 32);
    assert_eq!(month.get(0.0), Some(0.0));
    assert_eq!(month.get(9.0), Some(15_000.0));
    assert_eq!(month.get(31.0), Some(25_000.0));

    let year = engine.yearly_integral_distance(&[], day(2024, 3, 15)).unwrap();
    assert!(!year.is_empty());
    for series in [month, year] {
        let ys = series.ys();
        assert!(ys.windows(2).all(|w| w[0] <= w[1]), "{:?}", ys);
    }
}

#[test]
fn test_month_integral_stops_at_today() {
    let engine = engine().with_today(day(2024, 3, 10));
    engine
        .store()
        .add_exercise(&run(at(2024, 3, 2, 7), 5000, 1500.0))
        .unwrap();

    let month = engine.monthly_integral_distance(&[], day(2024, 3, 10)).unwrap();
    assert_eq!(month.len(), 11);
    assert_eq!(month.get(10.0), Some(5000.0));

    assert!(engine
        .monthly_integral_distance(&[], day(2024, 4, 10))
        .unwrap()
        .is_empty());
}

// ============================================================================
// Fetches, Labels and Caching
// ============================================================================

#[test]
fn test_fetch_full_exercise_and_labels() {
    let engine = engine();
    let store = engine.store();
    let route = store.add_route(&Route::new(0, "Harbour")).unwrap();

    let mut e = with_trail(run(at(2024, 11, 1, 7), 5000, 1500.0), (10.0, 10.0), (10.01, 10.01));
    e.external_id = Some(77);
    e.route_id = Some(route);
    e.route_variant = "long".to_string();
    e.data_source = "watch".to_string();
    let id = store.add_exercise(&e).unwrap();

    // Same external id is not stored twice
    assert_eq!(store.add_exercise(&e).unwrap(), id);
    assert_eq!(engine.external_ids().unwrap(), vec![77]);
    assert!(engine.has_external_id(77).unwrap());

    let fetched = engine.exercise_by_external_id(77).unwrap();
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.route_name, "Harbour");
    let trail = engine.trail(id).unwrap().expect("trail stored");
    assert_eq!(trail.points().map(|p| p.len()), Some(2));

    assert_eq!(engine.types().unwrap(), vec![ExerciseType::Run]);
    assert_eq!(engine.route_variations(route).unwrap(), vec!["long".to_string()]);
    assert_eq!(engine.data_sources().unwrap(), vec!["watch".to_string()]);
    assert!(engine.intervals().unwrap().is_empty());
    assert_eq!(engine.polylines_by_route(route, Some("long")).unwrap().len(), 1);
    assert!(engine.polylines_except(id).unwrap().is_empty());
}

#[test]
fn test_driven_exercise_uses_route_average() {
    let engine = engine();
    let store = engine.store();
    let route = store.add_route(&Route::new(0, "Commute")).unwrap();

    let mut driven = run(at(2024, 11, 5, 7), exercise_log::DISTANCE_DRIVEN, 1500.0);
    driven.route_id = Some(route);
    let driven_id = store.add_exercise(&driven).unwrap();

    for distance in [4800, 5200] {
        let mut measured = run(at(2024, 11, 1, 7), distance, 1500.0);
        measured.route_id = Some(route);
        store.add_exercise(&measured).unwrap();
    }

    let lite = engine.exerlite(driven_id).unwrap();
    assert!(lite.distance_driven);
    assert_eq!(lite.distance, 5000);
    assert_eq!(lite.pace(), None);

    let full = engine.exercise(driven_id).unwrap();
    assert_eq!(full.estimated_distance, Some(5000));
    assert_eq!(engine.avg_distance(route, "").unwrap(), 5000);
}

#[test]
fn test_on_disk_store_survives_reopen() {
    init_logging();
    let tmp = TempDir::new().expect("failed to create temp dir");
    let path = tmp.path().join("exercises.db");

    let id = {
        let store = SqliteStore::new(&path).expect("failed to open store");
        store.add_exercise(&run(at(2024, 1, 1, 7), 5000, 1500.0)).unwrap()
    };

    let engine = ExerciseEngine::new(
        SqliteStore::new(&path).expect("failed to reopen store"),
        EngineConfig::default(),
    );
    assert_eq!(engine.exercise(id).unwrap().distance, 5000);
}

#[test]
fn test_route_name_cache_invalidation() {
    let engine = engine();
    let route = engine.store().add_route(&Route::new(0, "Old name")).unwrap();
    assert_eq!(engine.route_name(route).unwrap(), "Old name");

    engine.store().rename_route(route, "New name").unwrap();
    assert_eq!(engine.route_name(route).unwrap(), "Old name");

    engine.invalidate_caches();
    assert_eq!(engine.route_name(route).unwrap(), "New name");
}

#[test]
fn test_single_route_invalidation() {
    let engine = engine();
    let store = engine.store();
    let renamed = store.add_route(&Route::new(0, "Harbour")).unwrap();
    let kept = store.add_route(&Route::new(0, "Ridge")).unwrap();
    assert_eq!(engine.route_name(renamed).unwrap(), "Harbour");
    assert_eq!(engine.route_name(kept).unwrap(), "Ridge");

    store.rename_route(renamed, "Harbour Front").unwrap();
    store.rename_route(kept, "Ridge Top").unwrap();
    engine.invalidate_route(renamed);

    assert_eq!(engine.route_name(renamed).unwrap(), "Harbour Front");
    assert_eq!(engine.route_name(kept).unwrap(), "Ridge");
}
