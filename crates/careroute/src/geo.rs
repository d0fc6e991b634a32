//! Great-circle geometry

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers (IUGG)
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine distance to another coordinate, in kilometers
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Straight-line (great-circle) distance between two coordinates in kilometers
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push a past 1.0 on antipodal points; clamp keeps NaN input NaN
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Round a kilometer value for presentation
pub fn round_km(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
