//! Placement of packages on pallets / in cars.

use std::sync::Arc;

use nalgebra::{Rotation3, Vector3};
use tracing::debug;
use ttm_core::{RegionName, snap};

use crate::error::CargoResult;
use crate::freight::Freight;
use crate::homogenize::{self, HomogenizedProperties, PACKAGING, PackagingMaterial};
use crate::template::PackageTemplate;

/// Where and how a cargo item sits inside the carrier.
#[derive(Clone, Debug, PartialEq)]
pub enum CargoPlacement {
    /// Packages tiled on a pallet; `orientation_deg` is a rotation vector in degrees.
    Pallet {
        template: PackageTemplate,
        position_m: Vector3<f64>,
        orientation_deg: Vector3<f64>,
    },
    /// One package strapped into a car, at a fixed offset from the car origin.
    Car { template: PackageTemplate },
}

/// One discretized cargo sub-volume.
#[derive(Clone, Debug)]
pub struct BatteryRegion {
    pub name: RegionName,
    /// Centre of the region in carrier coordinates.
    pub position_m: Vector3<f64>,
    /// Bounding dimensions after rotation.
    pub dimensions_m: Vector3<f64>,
    pub freight: Arc<Freight>,
    /// Centres of the freight elements in carrier coordinates.
    pub element_positions_m: Vec<Vector3<f64>>,
}

impl BatteryRegion {
    pub fn volume_m3(&self) -> f64 {
        self.dimensions_m.product()
    }

    pub fn freight_volume_m3(&self) -> CargoResult<f64> {
        let count = self.freight.elements_in_package_count(&self.dimensions_m)?;
        Ok(self.freight.volume_m3() * count as f64)
    }

    pub fn properties(&self) -> CargoResult<HomogenizedProperties> {
        self.properties_with(&PACKAGING)
    }

    pub fn properties_with(
        &self,
        packaging: &PackagingMaterial,
    ) -> CargoResult<HomogenizedProperties> {
        homogenize::homogenize(&self.dimensions_m, &self.freight, packaging)
    }

    /// Mean packaging thickness over the three axes.
    pub fn packaging_thickness_m(&self) -> CargoResult<f64> {
        let t = homogenize::packaging_thickness(&self.dimensions_m, &self.freight)?;
        Ok(t.mean())
    }
}

/// A laid-out cargo item.
#[derive(Clone, Debug)]
pub struct CargoLayout {
    pub index: usize,
    /// Overall dimensions of the item (all packages).
    pub dimensions_m: Vector3<f64>,
    pub regions: Vec<BatteryRegion>,
}

fn orientation(orientation_deg: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::new(orientation_deg.map(f64::to_radians))
}

/// Lay out one cargo item. Fails before creating any region when the
/// freight does not fit its packaging.
pub fn lay_out(
    index: usize,
    placement: &CargoPlacement,
    freight: &Freight,
) -> CargoResult<CargoLayout> {
    match placement {
        CargoPlacement::Pallet {
            template,
            position_m,
            orientation_deg,
        } => lay_out_pallet(index, template, position_m, orientation_deg, freight),
        CargoPlacement::Car { template } => lay_out_car(index, template, freight),
    }
}

fn lay_out_pallet(
    index: usize,
    template: &PackageTemplate,
    position_m: &Vector3<f64>,
    orientation_deg: &Vector3<f64>,
    freight: &Freight,
) -> CargoResult<CargoLayout> {
    let rotation = orientation(orientation_deg);
    let package = (rotation * template.package_dimensions_m).map(|c| snap(c.abs()));
    let freight = Arc::new(freight.rotated(&rotation));

    // Validate once; every package of the pallet is identical.
    freight.density_kg_per_m3()?;
    let element_offsets = freight.element_centres(&package)?;

    let footprint_x = package.x * template.columns as f64;
    let footprint_y = package.y * template.rows as f64;
    let centre = |extent: f64, n: usize, i: usize| -extent / 2.0 + (2 * i + 1) as f64 * extent / (2 * n) as f64;

    let mut regions = Vec::with_capacity(template.packages());
    for layer in 0..template.layers {
        let z = package.z / 2.0 + package.z * layer as f64;
        for row in 0..template.rows {
            for column in 0..template.columns {
                let offset = Vector3::new(
                    centre(footprint_x, template.columns, column),
                    centre(footprint_y, template.rows, row),
                    z,
                );
                let position = position_m + offset;
                let name = RegionName::battery(index, regions.len());
                regions.push(BatteryRegion {
                    name,
                    position_m: position,
                    dimensions_m: package,
                    freight: Arc::clone(&freight),
                    element_positions_m: element_offsets.iter().map(|e| position + e).collect(),
                });
            }
        }
    }
    debug!(
        cargo = index,
        template = %template.name,
        regions = regions.len(),
        "laid out pallet"
    );

    Ok(CargoLayout {
        index,
        dimensions_m: Vector3::new(footprint_x, footprint_y, package.z * template.layers as f64),
        regions,
    })
}

/// Gap between car origin and package, and between package corner and region centre.
const CAR_OFFSET_X_M: f64 = 0.2;
const CAR_OFFSET_Z_M: f64 = 0.1;
const CAR_REGION_OFFSET_M: f64 = 0.05;

fn lay_out_car(
    index: usize,
    template: &PackageTemplate,
    freight: &Freight,
) -> CargoResult<CargoLayout> {
    let dims = template.package_dimensions_m;
    let freight = Arc::new(freight.clone());
    freight.density_kg_per_m3()?;
    freight.elements_per_axis(&dims)?;

    let position = Vector3::new(dims.x / 2.0 + CAR_OFFSET_X_M, 0.0, CAR_OFFSET_Z_M)
        .add_scalar(CAR_REGION_OFFSET_M);
    let region = BatteryRegion {
        name: RegionName::battery(index, 0),
        position_m: position,
        dimensions_m: dims,
        freight,
        element_positions_m: vec![position],
    };
    Ok(CargoLayout {
        index,
        dimensions_m: dims,
        regions: vec![region],
    })
}

/// Lay out every cargo item; names are `battery<item>_<package>`.
pub fn lay_out_all(items: &[(CargoPlacement, Freight)]) -> CargoResult<Vec<CargoLayout>> {
    items
        .iter()
        .enumerate()
        .map(|(i, (placement, freight))| lay_out(i, placement, freight))
        .collect()
}
