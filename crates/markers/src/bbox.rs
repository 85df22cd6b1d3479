use serde::{Deserialize, Serialize};
use shared::Marker;

/// Visible map region in degrees.
///
/// When `west > east` the box crosses the antimeridian and covers
/// `[west, 180] ∪ [-180, east]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// Box centered on a point. Longitudes wrap; latitudes clamp at the poles.
    pub fn centered(latitude: f64, longitude: f64, lat_span: f64, lon_span: f64) -> Self {
        if lon_span >= 360.0 {
            return Self::new(
                (latitude - lat_span / 2.0).max(-90.0),
                -180.0,
                (latitude + lat_span / 2.0).min(90.0),
                180.0,
            );
        }

        Self::new(
            (latitude - lat_span / 2.0).max(-90.0),
            wrap_longitude(longitude - lon_span / 2.0),
            (latitude + lat_span / 2.0).min(90.0),
            wrap_longitude(longitude + lon_span / 2.0),
        )
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if !latitude.is_finite() || !longitude.is_finite() {
            return false;
        }
        if latitude < self.south || latitude > self.north {
            return false;
        }

        let longitude = wrap_longitude(longitude);
        if self.crosses_antimeridian() {
            longitude >= self.west || longitude <= self.east
        } else {
            longitude >= self.west && longitude <= self.east
        }
    }

    pub fn contains_marker(&self, marker: &Marker) -> bool {
        self.contains(marker.latitude, marker.longitude)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::world()
    }
}

/// Map a longitude into `[-180, 180]`
fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}
