//! Solar load geometry.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use nalgebra::{Rotation3, Vector3};
use ttm_core::{LatLon, direction};
use ttm_project::SolarLoad;

use crate::segments::Segment;

/// Apparent solar irradiation `A` per month (W/m²), January first.
pub const SOLAR_INTENSITY_W_PER_M2: [f64; 12] = [
    1230.0, 1215.0, 1186.0, 1136.0, 1104.0, 1088.0, 1085.0, 1107.0, 1151.0, 1192.0, 1221.0, 1233.0,
];

/// Atmospheric extinction coefficient `B` per month, January first.
pub const EXTINCTION_COEFFICIENT: [f64; 12] = [
    0.142, 0.144, 0.156, 0.180, 0.196, 0.205, 0.207, 0.201, 0.177, 0.160, 0.149, 0.142,
];

/// Resolves the UTC offset in force at a location.
pub trait TimezoneResolver {
    /// `None` where no time zone applies, e.g. on open water.
    fn utc_offset_hours(&self, at: DateTime<Utc>, location: LatLon) -> Option<f64>;
}

/// One offset everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedOffset(pub f64);

impl TimezoneResolver for FixedOffset {
    fn utc_offset_hours(&self, _at: DateTime<Utc>, _location: LatLon) -> Option<f64> {
        Some(self.0)
    }
}

/// No zone data; every lookup falls back to the longitude approximation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongitudeApproximation;

impl TimezoneResolver for LongitudeApproximation {
    fn utc_offset_hours(&self, _at: DateTime<Utc>, _location: LatLon) -> Option<f64> {
        None
    }
}

/// UTC offset at `location`, approximated as one hour per 15° of
/// longitude where the resolver has no answer.
pub fn utc_offset_hours(resolver: &dyn TimezoneResolver, at: DateTime<Utc>, location: LatLon) -> f64 {
    resolver
        .utc_offset_hours(at, location)
        .unwrap_or_else(|| (location.lon_deg / 15.0).floor())
}

/// East expressed in the frame whose x axis points along the travel
/// direction from `from` to `to`. `None` when the direction is undefined.
pub fn grid_east(from: LatLon, to: LatLon) -> Option<Vector3<f64>> {
    let (east, north) = direction(from, to).unit_east_north()?;
    let heading = north.atan2(east);
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), -heading);
    Some(rotation * Vector3::x())
}

/// Solar parameters for one segment. Start day and hour refer to the
/// campaign start in local time, the monthly tables to the segment's month.
pub fn solar_load(
    campaign_start: DateTime<Utc>,
    segment: &Segment,
    resolver: &dyn TimezoneResolver,
) -> SolarLoad {
    let offset_h = utc_offset_hours(resolver, segment.timestamp, segment.from);
    let local_start = campaign_start + Duration::seconds((offset_h * 3600.0).round() as i64);
    let start_hour = local_start.hour() as f64
        + local_start.minute() as f64 / 60.0
        + local_start.second() as f64 / 3600.0;
    let month = segment.timestamp.month0() as usize;
    SolarLoad {
        start_day: Some(local_start.ordinal()),
        start_hour: Some(start_hour),
        local_standard_meridian: Some(offset_h),
        location: segment.from,
        solar_intensity_w_per_m2: SOLAR_INTENSITY_W_PER_M2[month],
        extinction_coefficient: EXTINCTION_COEFFICIENT[month],
        grid_east: grid_east(segment.from, segment.to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn assert_vec(v: Vector3<f64>, expected: [f64; 3]) {
        for i in 0..3 {
            assert!((v[i] - expected[i]).abs() < 1e-12, "{v:?} != {expected:?}");
        }
    }

    #[test]
    fn east_travel_keeps_east_on_x() {
        let east = grid_east(LatLon::new(0.0, 10.0), LatLon::new(0.0, 11.0)).unwrap();
        assert_vec(east, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn north_travel_puts_east_on_negative_y() {
        let east = grid_east(LatLon::new(10.0, 10.0), LatLon::new(11.0, 10.0)).unwrap();
        assert_vec(east, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn antimeridian_crossing_is_short_hop() {
        // Heading west across 180°: east lies behind the carrier.
        let east = grid_east(LatLon::new(0.0, -179.0), LatLon::new(0.0, 179.0)).unwrap();
        assert_vec(east, [-1.0, 0.0, 0.0]);
        let east = grid_east(LatLon::new(0.0, 170.0), LatLon::new(0.0, -170.0)).unwrap();
        assert_vec(east, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn stationary_leaves_grid_east_unset() {
        assert_eq!(grid_east(LatLon::new(5.0, 5.0), LatLon::new(5.0, 5.0)), None);
    }

    #[test]
    fn open_water_falls_back_to_longitude() {
        let at = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let offset = utc_offset_hours(&LongitudeApproximation, at, LatLon::new(0.0, -35.0));
        assert_eq!(offset, -3.0);
        assert_eq!(utc_offset_hours(&FixedOffset(5.5), at, LatLon::new(0.0, -35.0)), 5.5);
    }

    #[test]
    fn solar_load_uses_local_start_and_month() {
        let start = Utc.with_ymd_and_hms(2021, 6, 30, 23, 30, 0).unwrap();
        let segment = Segment {
            index: 0,
            start_s: 0.0,
            end_s: 3600.0,
            timestamp: start,
            from: LatLon::new(53.5, 9.9),
            to: LatLon::new(53.5, 10.0),
            ambient_k: 290.0,
            speed_mps: 1.0,
            on_sea: false,
        };
        let load = solar_load(start, &segment, &FixedOffset(2.0));
        // 01:30 local on July 1st.
        assert_eq!(load.start_day, Some(182));
        assert_eq!(load.start_hour, Some(1.5));
        assert_eq!(load.solar_intensity_w_per_m2, 1088.0);
        assert_eq!(load.extinction_coefficient, 0.205);
        assert!(load.grid_east.is_some());
    }
}
