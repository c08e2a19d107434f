//! Freight descriptor: the physical payload placed into packages.

use std::str::FromStr;

use nalgebra::{Rotation3, Vector3};
use ttm_core::snap;

use crate::error::{CargoError, CargoResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreightType {
    Cells,
    Modules,
    Pack,
}

impl FromStr for FreightType {
    type Err = CargoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cells" => Ok(FreightType::Cells),
            "modules" => Ok(FreightType::Modules),
            "pack" => Ok(FreightType::Pack),
            other => Err(CargoError::UnknownFreightType {
                name: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Freight {
    pub freight_type: FreightType,
    /// Dimensions of one freight element (x, y, z) in meters.
    pub dimensions_m: Vector3<f64>,
    /// Weight of one freight element.
    pub weight_kg: f64,
    /// Explicit element counts per axis, bypassing floor division.
    pub elements_in_package: Option<[usize; 3]>,
    pub heat_capacity_j_per_kgk: f64,
    /// Per-axis thermal conductivity, aligned with `dimensions_m`.
    pub conductivity_w_per_mk: Vector3<f64>,
}

impl Freight {
    pub const DEFAULT_HEAT_CAPACITY: f64 = 1243.0;
    pub const DEFAULT_CONDUCTIVITY_AXIAL: f64 = 21.0;
    pub const DEFAULT_CONDUCTIVITY_RADIAL: f64 = 0.48;

    /// Freight with the default heat capacity and cell-like conductivity
    /// (radial in x/y, axial in z).
    pub fn new(freight_type: FreightType, dimensions_m: [f64; 3], weight_kg: f64) -> Self {
        Self {
            freight_type,
            dimensions_m: Vector3::from(dimensions_m),
            weight_kg,
            elements_in_package: None,
            heat_capacity_j_per_kgk: Self::DEFAULT_HEAT_CAPACITY,
            conductivity_w_per_mk: Vector3::new(
                Self::DEFAULT_CONDUCTIVITY_RADIAL,
                Self::DEFAULT_CONDUCTIVITY_RADIAL,
                Self::DEFAULT_CONDUCTIVITY_AXIAL,
            ),
        }
    }

    pub fn volume_m3(&self) -> f64 {
        self.dimensions_m.product()
    }

    pub fn density_kg_per_m3(&self) -> CargoResult<f64> {
        let volume = self.volume_m3();
        if volume <= 0.0 || !volume.is_finite() {
            return Err(CargoError::ZeroFreightVolume);
        }
        Ok(self.weight_kg / volume)
    }

    /// Re-orient dimensions, conductivity and explicit counts so they stay
    /// aligned with the rotated package axes.
    pub fn rotated(&self, rotation: &Rotation3<f64>) -> Self {
        let abs_rotate = |v: &Vector3<f64>| (rotation * v).map(|c| snap(c.abs()));
        let elements_in_package = self.elements_in_package.map(|counts| {
            let v = Vector3::new(counts[0] as f64, counts[1] as f64, counts[2] as f64);
            let r = abs_rotate(&v);
            [r.x.round() as usize, r.y.round() as usize, r.z.round() as usize]
        });
        Self {
            freight_type: self.freight_type,
            dimensions_m: abs_rotate(&self.dimensions_m),
            weight_kg: self.weight_kg,
            elements_in_package,
            heat_capacity_j_per_kgk: self.heat_capacity_j_per_kgk,
            conductivity_w_per_mk: abs_rotate(&self.conductivity_w_per_mk),
        }
    }

    /// Number of freight elements per axis inside one package.
    pub fn elements_per_axis(&self, package_m: &Vector3<f64>) -> CargoResult<[usize; 3]> {
        if let Some(counts) = self.elements_in_package {
            if counts.contains(&0) {
                return Err(CargoError::InvalidArg {
                    what: "elements_in_package must be nonzero on every axis",
                });
            }
            return Ok(counts);
        }
        if self.volume_m3() <= 0.0 {
            return Err(CargoError::ZeroFreightVolume);
        }
        let mut counts = [0usize; 3];
        for axis in 0..3 {
            // Tolerate 0.6 / 0.2 = 2.9999999999999996
            let n = (package_m[axis] / self.dimensions_m[axis] + 1e-9).floor();
            if !(n >= 1.0) {
                return Err(CargoError::FreightDoesNotFit {
                    axis,
                    package_m: package_m[axis],
                    freight_m: self.dimensions_m[axis],
                });
            }
            counts[axis] = n as usize;
        }
        Ok(counts)
    }

    pub fn elements_in_package_count(&self, package_m: &Vector3<f64>) -> CargoResult<usize> {
        Ok(self.elements_per_axis(package_m)?.iter().product())
    }

    /// Centres of every freight element of one package, relative to the
    /// package centre.
    pub fn element_centres(&self, package_m: &Vector3<f64>) -> CargoResult<Vec<Vector3<f64>>> {
        let counts = self.elements_per_axis(package_m)?;
        let axis_points = |axis: usize| -> Vec<f64> {
            let n = counts[axis];
            let d = package_m[axis];
            let step = d / (3 * n + 1) as f64;
            (0..n)
                .map(|i| -d / 2.0 + (2 + 3 * i) as f64 * step)
                .collect()
        };
        let xs = axis_points(0);
        let ys = axis_points(1);
        let zs = axis_points(2);

        let mut points = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for y in &ys {
            for x in &xs {
                for z in &zs {
                    points.push(Vector3::new(*x, *y, *z));
                }
            }
        }
        Ok(points)
    }
}
