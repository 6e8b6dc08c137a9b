//! Great-circle distance between two points on the Earth's surface.
//!
//! Coordinates are decimal degrees. Nothing is validated: an out-of-range
//! latitude still produces a number, it just doesn't mean anything.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinate { lat, lng }
    }

    /// Distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(*self, *other)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Haversine distance in kilometres between `a` and `b`.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let p = Coordinate::new(12.9716, 77.5946);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        // 2 * pi * 6371 / 360
        assert!((haversine_km(a, b) - 111.195).abs() < 0.01);
    }

    #[test]
    fn symmetric() {
        let blr = Coordinate::new(12.9716, 77.5946);
        let mys = Coordinate::new(12.2958, 76.6394);
        let d1 = blr.distance_km(&mys);
        let d2 = mys.distance_km(&blr);
        assert!((d1 - d2).abs() < 1e-9);
        assert!(d1 > 120.0 && d1 < 130.0);
    }
}
