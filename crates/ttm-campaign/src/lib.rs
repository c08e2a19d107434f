//! ttm-campaign: drives a transport campaign through the external solver.
//!
//! Contains:
//! - solver (step interface + process runner)
//! - mesh (one-time mesh build guarded by an input fingerprint)
//! - controller (segment loop, resume, cpu cores, reconstruct, postprocess)
//! - arrival (post-transport relaxation to ambient)
//! - probe (point sampling)
//! - logs (non-overwriting log archive)

pub mod arrival;
pub mod controller;
pub mod error;
pub mod logs;
pub mod mesh;
pub mod probe;
pub mod solver;

pub use arrival::ArrivalSummary;
pub use controller::{
    Campaign, CampaignEvent, CampaignOptions, CampaignState, Route, TransportSummary,
};
pub use error::{CampaignError, CampaignResult};
pub use mesh::{MeshStatus, ensure_mesh, fingerprint, mesh_exists};
pub use probe::ProbeTable;
pub use solver::{ProcessSolver, Solver, SolverStep};
