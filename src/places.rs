//! # Place Matching
//!
//! Point-in-place tests using a locally linearised degree/meter conversion.
//!
//! A circle of `radius` meters around a place is an ellipse in degree space,
//! since a degree of longitude shrinks away from the equator. The conversion
//! samples a 0.001° step along each axis with the haversine distance, then the
//! containment test is plain squared arithmetic:
//!
//! ```text
//! Δlat² / radiusLatDeg² + Δlng² / radiusLngDeg² ≤ 1
//! ```
//!
//! The same form is pushed into store queries, where no trigonometry is available.
//!
//! ## Features
//! - Exact containment via [`contains`]
//! - R-tree pre-filter over place envelopes ([`PlaceIndex`])
//! - Place discovery from trail endpoints ([`discover`])

use geo::{Distance, Haversine, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::model::Place;
use crate::GpsPoint;

/// Sampling step for the degree/meter conversion.
const SAMPLE_DEGREES: f64 = 0.001;

/// Calculate haversine distance between two GPS points in meters
fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

// ============================================================================
// Degree-space Ellipse
// ============================================================================

/// A metric circle expressed as an axis-aligned ellipse in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeEllipse {
    pub lat: f64,
    pub lng: f64,
    /// Squared latitude semi-axis in degrees²
    pub lat_radius_sq: f64,
    /// Squared longitude semi-axis in degrees²
    pub lng_radius_sq: f64,
}

impl DegreeEllipse {
    /// Ellipse for a circle of `radius` meters around `center`.
    ///
    /// Returns `None` when the geometry is degenerate: a non-positive or
    /// non-finite radius, an invalid center, or a conversion that does not
    /// yield finite positive semi-axes.
    pub fn around(center: GpsPoint, radius: f64) -> Option<Self> {
        if !(radius > 0.0 && radius.is_finite()) || !center.is_valid() {
            return None;
        }

        let lat_step = GpsPoint::new(center.latitude + SAMPLE_DEGREES, center.longitude);
        let lng_step = GpsPoint::new(center.latitude, center.longitude + SAMPLE_DEGREES);
        let lat_meters = haversine_distance(&center, &lat_step);
        let lng_meters = haversine_distance(&center, &lng_step);

        let lat_radius = radius * (SAMPLE_DEGREES / lat_meters);
        let lng_radius = radius * (SAMPLE_DEGREES / lng_meters);
        let lat_radius_sq = lat_radius * lat_radius;
        let lng_radius_sq = lng_radius * lng_radius;

        let usable = |v: f64| v > 0.0 && v.is_finite();
        if !usable(lat_radius_sq) || !usable(lng_radius_sq) {
            log::debug!(
                "[PlaceMatcher] Degenerate ellipse at ({}, {}) r={}",
                center.latitude,
                center.longitude,
                radius
            );
            return None;
        }

        Some(Self {
            lat: center.latitude,
            lng: center.longitude,
            lat_radius_sq,
            lng_radius_sq,
        })
    }

    pub fn contains(&self, point: GpsPoint) -> bool {
        let d_lat = self.lat - point.latitude;
        let d_lng = self.lng - point.longitude;
        d_lat * d_lat / self.lat_radius_sq + d_lng * d_lng / self.lng_radius_sq <= 1.0
    }

    /// Bounding box as `[lng, lat]` corners.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        let lat_radius = self.lat_radius_sq.sqrt();
        let lng_radius = self.lng_radius_sq.sqrt();
        AABB::from_corners(
            [self.lng - lng_radius, self.lat - lat_radius],
            [self.lng + lng_radius, self.lat + lat_radius],
        )
    }
}

/// Whether a place contains a point. Degenerate places contain nothing.
pub fn contains(place: &Place, point: GpsPoint) -> bool {
    DegreeEllipse::around(place.center(), place.radius)
        .map(|ellipse| ellipse.contains(point))
        .unwrap_or(false)
}

// ============================================================================
// Spatial Index
// ============================================================================

/// Envelope entry pointing back into the index's place list.
#[derive(Debug, Clone)]
struct PlaceEnvelope {
    slot: usize,
    ellipse: DegreeEllipse,
}

impl RTreeObject for PlaceEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.ellipse.envelope()
    }
}

/// Places with an R-tree over their degree-space bounding boxes.
///
/// Bounding boxes only narrow the candidates; the ellipse test decides.
#[derive(Debug, Default)]
pub struct PlaceIndex {
    places: Vec<Place>,
    tree: RTree<PlaceEnvelope>,
}

impl PlaceIndex {
    pub fn new(places: Vec<Place>) -> Self {
        let entries: Vec<PlaceEnvelope> = places
            .iter()
            .enumerate()
            .filter_map(|(slot, place)| {
                DegreeEllipse::around(place.center(), place.radius)
                    .map(|ellipse| PlaceEnvelope { slot, ellipse })
            })
            .collect();

        Self {
            places,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, place: Place) {
        let slot = self.places.len();
        if let Some(ellipse) = DegreeEllipse::around(place.center(), place.radius) {
            self.tree.insert(PlaceEnvelope { slot, ellipse });
        }
        self.places.push(place);
    }

    /// Places containing the point, in insertion order.
    pub fn containing(&self, point: GpsPoint) -> Vec<&Place> {
        let mut slots = self.candidate_slots(point);
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.places[slot]).collect()
    }

    pub fn any_contains(&self, point: GpsPoint) -> bool {
        !self.candidate_slots(point).is_empty()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    fn candidate_slots(&self, point: GpsPoint) -> Vec<usize> {
        if self.is_empty() || !point.is_valid() {
            return Vec::new();
        }
        let envelope = AABB::from_point([point.longitude, point.latitude]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.ellipse.contains(point))
            .map(|entry| entry.slot)
            .collect()
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Create places for trail endpoints that no known place covers.
///
/// `endpoints` are `(start, end)` pairs in the order they should be considered.
/// Each new place joins the working set immediately, so later endpoints (and
/// the end of the same trail) can fall inside it. Only new places are returned.
pub fn discover<I>(known: Vec<Place>, endpoints: I, radius: f64) -> Vec<Place>
where
    I: IntoIterator<Item = (GpsPoint, GpsPoint)>,
{
    let mut index = PlaceIndex::new(known);
    let mut created = Vec::new();

    for (start, end) in endpoints {
        for point in [start, end] {
            if !point.is_valid() || index.any_contains(point) {
                continue;
            }
            let place = Place::at(point, radius);
            index.insert(place.clone());
            created.push(place);
        }
    }

    log::info!(
        "[PlaceMatcher] Discovered {} new places ({} total)",
        created.len(),
        index.len()
    );
    created
}
