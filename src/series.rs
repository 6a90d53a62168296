//! # Chart Series
//!
//! Dense distance series by calendar unit, running totals, goal lines and
//! pace progressions.
//!
//! ## Features
//! - Fixed buckets: ISO day-of-week (1–7) and month (1–12), zero-filled
//! - Running total over a month by day, truncated at today
//! - Running total over a year by week, emitted at week boundaries
//! - Synthetic goal lines for the above
//!
//! All functions are pure: the caller supplies `(date, distance)` samples and
//! the reference date. Samples outside the reference period are ignored.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A single point on a chart series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Bucket index (day, month, week or sequence number)
    pub x: f64,
    /// Distance in meters, or pace in seconds per kilometer
    pub y: f64,
}

/// Ordered x → y sequence, ascending in x.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            points: pairs
                .into_iter()
                .map(|(x, y)| SeriesPoint { x, y })
                .collect(),
        }
    }

    /// Value at a bucket index
    pub fn get(&self, x: f64) -> Option<f64> {
        self.points.iter().find(|p| p.x == x).map(|p| p.y)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }
}

// ============================================================================
// Calendar Periods
// ============================================================================

/// Monday and Sunday of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first + Duration::days(i64::from(days_in_month(date)) - 1);
    (first, last)
}

/// First and last day of the year containing `date`.
pub fn year_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_ordinal(1).unwrap_or(date);
    let last = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
    (first, last)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (NaiveDate::from_ymd_opt(year, month, 1), next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 31,
    }
}

fn within(date: NaiveDate, (first, last): (NaiveDate, NaiveDate)) -> bool {
    date >= first && date <= last
}

/// Sum distances per bucket and emit every bucket in `range`, zero-filled.
fn dense_sum<I>(
    samples: I,
    range: std::ops::RangeInclusive<u32>,
    bucket: impl Fn(NaiveDate) -> u32,
) -> Series
where
    I: IntoIterator<Item = (NaiveDate, i32)>,
{
    let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
    for (date, distance) in samples {
        *totals.entry(bucket(date)).or_insert(0.0) += f64::from(distance);
    }
    Series::from_pairs(
        range.map(|key| (f64::from(key), totals.get(&key).copied().unwrap_or(0.0))),
    )
}

// ============================================================================
// Distance Series
// ============================================================================

/// Distance per ISO weekday (1 = Monday … 7 = Sunday) of the week containing `reference`.
pub fn week_daily<I>(samples: I, reference: NaiveDate) -> Series
where
    I: IntoIterator<Item = (NaiveDate, i32)>,
{
    let week = week_bounds(reference);
    dense_sum(
        samples.into_iter().filter(|(date, _)| within(*date, week)),
        1..=7,
        |date| date.weekday().number_from_monday(),
    )
}

/// Distance per month (1–12) of the year containing `reference`.
pub fn year_monthly<I>(samples: I, reference: NaiveDate) -> Series
where
    I: IntoIterator<Item = (NaiveDate, i32)>,
{
    let year = year_bounds(reference);
    dense_sum(
        samples.into_iter().filter(|(date, _)| within(*date, year)),
        1..=12,
        |date| date.month(),
    )
}

/// Running distance total over the month containing `reference`, by day.
///
/// Node 0 holds 0 and node `d` the total through day `d`. When `reference`
/// is `today` the series stops at today. A month without exercises yields an
/// empty series.
pub fn month_daily_integral<I>(samples: I, reference: NaiveDate, today: NaiveDate) -> Series
where
    I: IntoIterator<Item = (NaiveDate, i32)>,
{
    let month = month_bounds(reference);
    let mut per_day: BTreeMap<u32, f64> = BTreeMap::new();
    for (date, distance) in samples {
        if within(date, month) {
            *per_day.entry(date.day()).or_insert(0.0) += f64::from(distance);
        }
    }
    if per_day.is_empty() {
        return Series::default();
    }

    let stop_at_today = reference == today;
    let mut total = 0.0;
    let mut points = Vec::new();
    for day in 0..=days_in_month(reference) {
        total += per_day.get(&day).copied().unwrap_or(0.0);
        points.push((f64::from(day), total));
        if stop_at_today && day == today.day() {
            break;
        }
    }
    Series::from_pairs(points)
}

/// Running distance total over the year containing `reference`, by week.
///
/// Week `w` is `⌈day-of-year / 7⌉`. A node is emitted when the week changes,
/// carrying the total accumulated before the change under the previous
/// week's index (starting from week 0). The week of the last exercise is
/// therefore never emitted.
pub fn year_weekly_integral<I>(samples: I, reference: NaiveDate) -> Series
where
    I: IntoIterator<Item = (NaiveDate, i32)>,
{
    let year = year_bounds(reference);
    let mut samples: Vec<(NaiveDate, i32)> = samples
        .into_iter()
        .filter(|(date, _)| within(*date, year))
        .collect();
    samples.sort_by_key(|(date, _)| *date);

    let mut total = 0.0;
    let mut last_week = 0;
    let mut points = Vec::new();
    for (date, distance) in samples {
        let week = date.ordinal().div_ceil(7);
        if week != last_week {
            points.push((f64::from(last_week), total));
            last_week = week;
        }
        total += f64::from(distance);
    }
    Series::from_pairs(points)
}

// ============================================================================
// Goal Lines
// ============================================================================

/// Flat monthly goal for months 1–12.
pub fn year_monthly_goal(monthly_goal: f64) -> Series {
    Series::from_pairs((1..=12).map(|m| (f64::from(m), monthly_goal)))
}

/// Straight line from 0 to the monthly goal at the month's last day.
pub fn month_integral_goal(reference: NaiveDate, monthly_goal: f64) -> Series {
    Series::from_pairs([
        (0.0, 0.0),
        (f64::from(days_in_month(reference)), monthly_goal),
    ])
}

/// Straight line from 0 to the yearly goal at `goal_weeks`.
pub fn year_integral_goal(yearly_goal: f64, goal_weeks: u32) -> Series {
    Series::from_pairs([(0.0, 0.0), (f64::from(goal_weeks), yearly_goal)])
}

// ============================================================================
// Pace Series
// ============================================================================

/// Paces indexed by position, 0 first.
pub fn pace_progression(paces: impl IntoIterator<Item = f64>) -> Series {
    Series::from_pairs(
        paces
            .into_iter()
            .enumerate()
            .map(|(i, pace)| (i as f64, pace)),
    )
}
