//! Boundary condition synthesis.
//!
//! Before every segment the convective coefficient, ambient temperature
//! and solar load parameters of the border region are re-derived from the
//! solver's previous output and the route, and written to the solver
//! configuration. Coefficient and travel speed are appended to audit logs.

pub mod audit;
pub mod coefficient;
pub mod error;
pub mod segments;
pub mod solar;
pub mod synthesize;
pub mod wall;

pub use audit::AuditLog;
pub use coefficient::{Coefficient, CoefficientSource, WallGeometry, plausible_coefficient};
pub use error::{BoundaryError, BoundaryResult};
pub use segments::{Segment, derive_segments, resume_index, route_duration_s};
pub use solar::{
    EXTINCTION_COEFFICIENT, FixedOffset, LongitudeApproximation, SOLAR_INTENSITY_W_PER_M2,
    TimezoneResolver, grid_east, solar_load, utc_offset_hours,
};
pub use synthesize::{SynthesisContext, SynthesizedBoundary, Synthesizer};
pub use wall::prior_wall_temperature;
