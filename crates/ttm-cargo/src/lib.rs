//! Cargo layout and thermal homogenization.
//!
//! Places discrete freight elements (cells, modules, packs) into the
//! packages of a pallet or car, yielding one [`BatteryRegion`] per
//! package, and mixes freight and packaging into homogenized density,
//! heat capacity and anisotropic conductivity.

pub mod error;
pub mod freight;
pub mod homogenize;
pub mod layout;
pub mod template;

pub use error::{CargoError, CargoResult};
pub use freight::{Freight, FreightType};
pub use homogenize::{HomogenizedProperties, PACKAGING, PackagingMaterial};
pub use layout::{BatteryRegion, CargoLayout, CargoPlacement, lay_out, lay_out_all};
pub use template::PackageTemplate;
