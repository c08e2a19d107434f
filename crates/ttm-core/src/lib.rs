//! ttm-core: shared foundation for the transport temperature model.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - geo (great-circle distance, antimeridian-safe waypoint direction)
//! - region (stable region names)
//! - error (shared error types)

pub mod error;
pub mod geo;
pub mod numeric;
pub mod region;
pub mod units;

pub use error::{TtmError, TtmResult};
pub use geo::{LatLon, WaypointDirection, direction, great_circle_distance};
pub use numeric::*;
pub use region::RegionName;
pub use units::*;
