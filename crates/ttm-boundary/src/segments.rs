//! Route segments derived from the weather series.

use chrono::{DateTime, Utc};
use ttm_core::{LatLon, great_circle_distance};
use ttm_project::WeatherSample;

/// One solver invocation between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    /// Simulated time at segment start, seconds since the first waypoint.
    pub start_s: f64,
    pub end_s: f64,
    /// UTC time of the start waypoint.
    pub timestamp: DateTime<Utc>,
    pub from: LatLon,
    pub to: LatLon,
    /// Ambient temperature at the start waypoint.
    pub ambient_k: f64,
    pub speed_mps: f64,
    pub on_sea: bool,
}

impl Segment {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

fn offset_s(start: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - start).num_milliseconds() as f64 / 1000.0
}

/// Simulated length of the route.
pub fn route_duration_s(samples: &[WeatherSample]) -> f64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => offset_s(first.timestamp, last.timestamp),
        _ => 0.0,
    }
}

/// One segment per consecutive pair of samples.
///
/// For car transport the car rides inside a ship on sea legs, so the
/// relative air speed is zero there.
pub fn derive_segments(samples: &[WeatherSample], car_transport: bool) -> Vec<Segment> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let origin = first.timestamp;
    samples
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let (a, b) = (&pair[0], &pair[1]);
            let start_s = offset_s(origin, a.timestamp);
            let end_s = offset_s(origin, b.timestamp);
            let on_sea = a.on_sea.unwrap_or(false);
            let distance_m = great_circle_distance(a.location, b.location).value;
            let speed_mps = if car_transport && on_sea {
                0.0
            } else {
                distance_m / (end_s - start_s)
            };
            Segment {
                index,
                start_s,
                end_s,
                timestamp: a.timestamp,
                from: a.location,
                to: b.location,
                ambient_k: a.ambient_k(),
                speed_mps,
                on_sea,
            }
        })
        .collect()
}

/// Segment to continue with after restarting at `resume_s`: the one whose
/// start is nearest. `None` once the route is complete.
pub fn resume_index(segments: &[Segment], resume_s: f64) -> Option<usize> {
    let last = segments.last()?;
    if resume_s >= last.end_s {
        return None;
    }
    segments
        .iter()
        .min_by(|a, b| {
            (a.start_s - resume_s)
                .abs()
                .total_cmp(&(b.start_s - resume_s).abs())
        })
        .map(|s| s.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn sample(offset_s: i64, lat: f64, lon: f64, t_c: f64, on_sea: Option<bool>) -> WeatherSample {
        WeatherSample {
            timestamp: Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_s),
            location: LatLon::new(lat, lon),
            ambient_c: t_c,
            on_sea,
        }
    }

    #[test]
    fn three_waypoints_give_two_segments() {
        let samples = [
            sample(0, 53.5, 9.9, 11.85, None),
            sample(3600, 53.5, 9.91, 12.85, None),
            sample(7200, 53.5, 9.92, 13.85, None),
        ];
        let segments = derive_segments(&samples, false);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start_s, 3600.0);
        assert_eq!(segments[1].end_s, 7200.0);
        assert!((segments[1].ambient_k - 286.0).abs() < 1e-9);
        // ~660 m per hour
        assert!(segments[0].speed_mps > 0.1 && segments[0].speed_mps < 0.3);
        assert_eq!(route_duration_s(&samples), 7200.0);
    }

    #[test]
    fn car_on_sea_has_zero_speed() {
        let samples = [
            sample(0, 54.0, 10.0, 10.0, Some(true)),
            sample(3600, 55.0, 11.0, 10.0, Some(false)),
            sample(7200, 56.0, 12.0, 10.0, None),
        ];
        let car = derive_segments(&samples, true);
        assert_eq!(car[0].speed_mps, 0.0);
        assert!(car[1].speed_mps > 0.0);
        let truck = derive_segments(&samples, false);
        assert!(truck[0].speed_mps > 0.0);
    }

    #[test]
    fn resume_picks_nearest_start() {
        let samples = [
            sample(0, 0.0, 0.0, 10.0, None),
            sample(3600, 0.0, 0.1, 10.0, None),
            sample(7200, 0.0, 0.2, 10.0, None),
        ];
        let segments = derive_segments(&samples, false);
        assert_eq!(resume_index(&segments, 0.0), Some(0));
        assert_eq!(resume_index(&segments, 3600.0), Some(1));
        assert_eq!(resume_index(&segments, 3599.5), Some(1));
        assert_eq!(resume_index(&segments, 7200.0), None);
    }

    proptest! {
        #[test]
        fn segments_tile_the_route(steps in proptest::collection::vec(1i64..86_400, 1..40)) {
            let mut offset = 0;
            let mut samples = vec![sample(0, 10.0, 10.0, 15.0, None)];
            for (i, step) in steps.iter().enumerate() {
                offset += step;
                samples.push(sample(offset, 10.0 + i as f64 * 0.01, 10.0, 15.0, None));
            }
            let segments = derive_segments(&samples, false);
            prop_assert_eq!(segments.len(), steps.len());
            for w in segments.windows(2) {
                prop_assert_eq!(w[0].end_s, w[1].start_s);
            }
            let total: f64 = segments.iter().map(Segment::duration_s).sum();
            prop_assert!((total - route_duration_s(&samples)).abs() <= 1.0);
        }
    }
}
