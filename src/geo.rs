//! Great-circle distance and the coordinate checks shared by every
//! proximity lookup.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Two pins closer than this are treated as the same place when logging visits.
pub const MERGE_RADIUS_KM: f64 = 0.05;

pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const MIN_RADIUS_KM: f64 = 0.001;
pub const MAX_RADIUS_KM: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Haversine distance in kilometers.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    if a.latitude == b.latitude && a.longitude == b.longitude {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push h a hair outside [0, 1]; asin would return NaN
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn latitude_error(latitude: f64) -> Option<&'static str> {
    if !latitude.is_finite() {
        Some("Latitude must be a number")
    } else if !(-90.0..=90.0).contains(&latitude) {
        Some("Latitude must be between -90 and 90")
    } else {
        None
    }
}

pub fn longitude_error(longitude: f64) -> Option<&'static str> {
    if !longitude.is_finite() {
        Some("Longitude must be a number")
    } else if !(-180.0..=180.0).contains(&longitude) {
        Some("Longitude must be between -180 and 180")
    } else {
        None
    }
}

pub fn radius_error(radius_km: f64) -> Option<&'static str> {
    if !radius_km.is_finite() || !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
        Some("Radius must be between 0.001 and 100 kilometers")
    } else {
        None
    }
}

/// Degree box enclosing every point within `radius_km` of a center.
///
/// Used only to narrow the rows a query reads; the haversine check still
/// decides membership, so the box errs on the large side. `longitude` is
/// `None` when the circle reaches a pole or wraps the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub longitude: Option<(f64, f64)>,
}

const BOX_MARGIN_DEG: f64 = 1e-6;

impl BoundingBox {
    pub fn around(center: Coordinate, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let dlat = angular.to_degrees() + BOX_MARGIN_DEG;

        let min_latitude = center.latitude - dlat;
        let max_latitude = center.latitude + dlat;

        if min_latitude <= -90.0 || max_latitude >= 90.0 {
            return Self {
                min_latitude: min_latitude.max(-90.0),
                max_latitude: max_latitude.min(90.0),
                longitude: None,
            };
        }

        let ratio = angular.sin() / center.latitude.to_radians().cos();
        if ratio >= 1.0 {
            return Self {
                min_latitude,
                max_latitude,
                longitude: None,
            };
        }

        let dlon = ratio.asin().to_degrees() + BOX_MARGIN_DEG;
        let min_longitude = center.longitude - dlon;
        let max_longitude = center.longitude + dlon;
        let longitude = if min_longitude < -180.0 || max_longitude > 180.0 {
            None
        } else {
            Some((min_longitude, max_longitude))
        };

        Self {
            min_latitude,
            max_latitude,
            longitude,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        if point.latitude < self.min_latitude || point.latitude > self.max_latitude {
            return false;
        }
        match self.longitude {
            Some((min, max)) => point.longitude >= min && point.longitude <= max,
            None => true,
        }
    }
}
