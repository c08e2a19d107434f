//! Waypoint geometry.
//!
//! Longitudes are signed degrees in `[-180, 180]`, latitudes in `[-90, 90]`.

use crate::units::{Length, constants, m};

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatLon {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl LatLon {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }
}

/// Difference between two waypoints in degrees, longitude unwrapped
/// across the antimeridian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaypointDirection {
    pub d_lat_deg: f64,
    pub d_lon_deg: f64,
}

impl WaypointDirection {
    pub fn magnitude_deg(&self) -> f64 {
        self.d_lat_deg.hypot(self.d_lon_deg)
    }

    /// Unit vector in the local (x = east, y = north) plane, `None` for a
    /// zero-length or antipodal (direction undefined) pair.
    pub fn unit_east_north(&self) -> Option<(f64, f64)> {
        let mag = self.magnitude_deg();
        if !mag.is_finite() || mag <= f64::EPSILON || self.d_lon_deg.abs() >= 180.0 {
            return None;
        }
        Some((self.d_lon_deg / mag, self.d_lat_deg / mag))
    }
}

/// True when the shortest path between the two longitudes crosses ±180°.
pub fn crosses_antimeridian(lon_start: f64, lon_end: f64) -> bool {
    lon_start.signum() != lon_end.signum() && lon_start.abs() + lon_end.abs() > 180.0
}

/// Direction from `start` to `end`.
///
/// When the pair straddles the antimeridian the negative longitude is
/// shifted by +360° before differencing, so `-179 → 179` is a 2° step
/// west rather than 358° east.
pub fn direction(start: LatLon, end: LatLon) -> WaypointDirection {
    let mut lon_start = start.lon_deg;
    let mut lon_end = end.lon_deg;
    if crosses_antimeridian(lon_start, lon_end) {
        if lon_start < 0.0 {
            lon_start += 360.0;
        } else {
            lon_end += 360.0;
        }
    }
    WaypointDirection {
        d_lat_deg: end.lat_deg - start.lat_deg,
        d_lon_deg: lon_end - lon_start,
    }
}

/// Haversine distance on a spherical earth.
pub fn great_circle_distance(a: LatLon, b: LatLon) -> Length {
    let phi1 = a.lat_deg.to_radians();
    let phi2 = b.lat_deg.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (b.lon_deg - a.lon_deg).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    m(constants::EARTH_RADIUS_M * c)
}
