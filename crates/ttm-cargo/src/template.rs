//! Package templates: footprint of one package and how packages stack on a pallet.

use nalgebra::Vector3;

use crate::error::{CargoError, CargoResult};

#[derive(Clone, Debug, PartialEq)]
pub struct PackageTemplate {
    pub name: String,
    /// Outer dimensions of one package (x, y, z) in meters.
    pub package_dimensions_m: Vector3<f64>,
    /// Number of vertical package layers.
    pub layers: usize,
    /// Packages per layer along x.
    pub columns: usize,
    /// Packages per layer along y.
    pub rows: usize,
}

/// (name, package dimensions, layers, packages per layer)
const BUILTIN: &[(&str, [f64; 3], usize, usize)] = &[
    ("batterypack", [1.2, 0.7, 0.175], 1, 1),
    ("pallet1x1", [1.2, 0.8, 0.4], 1, 1),
    ("pallet3x1", [1.2, 0.8, 0.4], 3, 1),
    ("pallet1x4", [0.6, 0.4, 0.4], 1, 4),
    ("pallet2x4", [0.6, 0.4, 0.4], 2, 4),
    ("pallet3x4", [0.6, 0.4, 0.4], 3, 4),
    ("industrial_pallet1x1", [1.2, 1.0, 0.4], 1, 1),
    ("industrial_pallet1x4", [0.6, 0.5, 0.4], 1, 4),
    ("industrial_pallet2x4", [0.6, 0.5, 0.4], 2, 4),
    ("package", [0.425, 0.335, 0.260], 1, 1),
    ("Modul", [0.355, 0.240, 0.160], 1, 1),
];

impl PackageTemplate {
    /// Look up a built-in template; a trailing `.stl` is ignored.
    pub fn builtin(name: &str) -> CargoResult<Self> {
        let key = name.strip_suffix(".stl").unwrap_or(name);
        let (_, dims, layers, per_layer) = BUILTIN
            .iter()
            .find(|(n, ..)| *n == key)
            .ok_or_else(|| CargoError::UnknownTemplate {
                name: name.to_string(),
            })?;
        // Packages per layer form a square grid on the pallet.
        let side = (*per_layer as f64).sqrt().round() as usize;
        Ok(Self {
            name: key.to_string(),
            package_dimensions_m: Vector3::from(*dims),
            layers: *layers,
            columns: side,
            rows: side,
        })
    }

    pub fn packages(&self) -> usize {
        self.layers * self.columns * self.rows
    }
}
