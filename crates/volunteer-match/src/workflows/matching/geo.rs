//! Great-circle distance and the rectangular pre-filter used before it.

use serde::{Deserialize, Serialize};

use super::domain::Coordinates;

pub const EARTH_RADIUS_MILES: f64 = 3958.8;
pub const MILES_PER_DEGREE_LATITUDE: f64 = 69.0;

/// Floor on |cos(latitude)| so longitude scaling stays finite near the poles.
const MIN_LONGITUDE_SCALE: f64 = 0.1;

/// Haversine distance in miles on a spherical Earth.
pub fn distance_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let central_angle = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_MILES * central_angle
}

/// Coordinate range handed to the persistence layer as a cheap range query.
///
/// The box is a superset of the true radius: corners admit points beyond it, and the
/// exact distance is always recomputed afterwards. Longitude bounds may extend past
/// ±180 when the box straddles the antimeridian; use [`BoundingBox::contains`]
/// rather than comparing bounds directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinates, radius_miles: f64) -> Self {
        let radius_miles = radius_miles.max(0.0);
        let lat_delta = radius_miles / MILES_PER_DEGREE_LATITUDE;
        let lat_min = (center.latitude - lat_delta).max(-90.0);
        let lat_max = (center.latitude + lat_delta).min(90.0);

        match longitude_half_width(center.latitude, radius_miles) {
            Some(lon_delta) => Self {
                lat_min,
                lat_max,
                lon_min: center.longitude - lon_delta,
                lon_max: center.longitude + lon_delta,
            },
            None => Self {
                lat_min,
                lat_max,
                lon_min: -180.0,
                lon_max: 180.0,
            },
        }
    }

    pub fn spans_all_longitudes(&self) -> bool {
        self.lon_max - self.lon_min >= 360.0
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        if point.latitude < self.lat_min || point.latitude > self.lat_max {
            return false;
        }
        if self.spans_all_longitudes() {
            return true;
        }
        [point.longitude, point.longitude - 360.0, point.longitude + 360.0]
            .into_iter()
            .any(|lon| lon >= self.lon_min && lon <= self.lon_max)
    }
}

/// Longitude half-width in degrees, or `None` when the circle reaches a pole.
///
/// Uses `radius / (69 * max(0.1, |cos lat|))`, widened to the exact spherical
/// half-width `asin(sin θ / cos φ)` where that is larger, so no in-radius point is
/// ever cut off at higher latitudes.
fn longitude_half_width(center_latitude: f64, radius_miles: f64) -> Option<f64> {
    let cos_lat = center_latitude.to_radians().cos().abs();
    let scaled = radius_miles / (MILES_PER_DEGREE_LATITUDE * cos_lat.max(MIN_LONGITUDE_SCALE));

    let angular_radius = radius_miles / EARTH_RADIUS_MILES;
    if angular_radius >= std::f64::consts::FRAC_PI_2 {
        return None;
    }
    let ratio = angular_radius.sin() / cos_lat;
    if ratio >= 1.0 {
        return None;
    }
    let exact = ratio.asin().to_degrees();

    let half_width = scaled.max(exact);
    if half_width >= 180.0 {
        None
    } else {
        Some(half_width)
    }
}
