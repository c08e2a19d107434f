//! Volume-fraction mixing of freight and packaging.
//!
//! Density and heat capacity are volume (resp. mass) weighted; conductivity
//! combines packaging and freight as layered resistances in series per axis.

use nalgebra::Vector3;

use crate::error::CargoResult;
use crate::freight::Freight;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackagingMaterial {
    pub density_kg_per_m3: f64,
    pub heat_capacity_j_per_kgk: f64,
    pub conductivity_w_per_mk: f64,
}

/// Cardboard and foam filler.
pub const PACKAGING: PackagingMaterial = PackagingMaterial {
    density_kg_per_m3: 24.0,
    heat_capacity_j_per_kgk: 1300.0,
    conductivity_w_per_mk: 0.053,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomogenizedProperties {
    pub density_kg_per_m3: f64,
    pub heat_capacity_j_per_kgk: f64,
    pub conductivity_w_per_mk: Vector3<f64>,
}

/// Volumes of one region split into freight and packaging.
#[derive(Clone, Copy, Debug)]
pub(crate) struct VolumeSplit {
    pub region_m3: f64,
    pub freight_m3: f64,
}

impl VolumeSplit {
    pub fn packaging_m3(&self) -> f64 {
        self.region_m3 - self.freight_m3
    }
}

pub(crate) fn volume_split(
    region_m: &Vector3<f64>,
    freight: &Freight,
) -> CargoResult<VolumeSplit> {
    let count = freight.elements_in_package_count(region_m)?;
    Ok(VolumeSplit {
        region_m3: region_m.product(),
        freight_m3: freight.volume_m3() * count as f64,
    })
}

pub(crate) fn density(
    split: VolumeSplit,
    freight: &Freight,
    packaging: &PackagingMaterial,
) -> CargoResult<f64> {
    let rho_f = freight.density_kg_per_m3()?;
    Ok((split.packaging_m3() * packaging.density_kg_per_m3 + split.freight_m3 * rho_f)
        / split.region_m3)
}

pub(crate) fn heat_capacity(
    split: VolumeSplit,
    freight: &Freight,
    packaging: &PackagingMaterial,
) -> CargoResult<f64> {
    let rho_f = freight.density_kg_per_m3()?;
    let rho = density(split, freight, packaging)?;
    let packaging_heat =
        split.packaging_m3() * packaging.density_kg_per_m3 * packaging.heat_capacity_j_per_kgk;
    let freight_heat = split.freight_m3 * rho_f * freight.heat_capacity_j_per_kgk;
    Ok((packaging_heat + freight_heat) / (split.region_m3 * rho))
}

/// Packaging thickness per axis: region extent not filled by freight.
pub(crate) fn packaging_thickness(
    region_m: &Vector3<f64>,
    freight: &Freight,
) -> CargoResult<Vector3<f64>> {
    let counts = freight.elements_per_axis(region_m)?;
    Ok(Vector3::from_fn(|i, _| {
        region_m[i] - freight.dimensions_m[i] * counts[i] as f64
    }))
}

pub(crate) fn conductivity(
    region_m: &Vector3<f64>,
    freight: &Freight,
    packaging: &PackagingMaterial,
) -> CargoResult<Vector3<f64>> {
    let thickness = packaging_thickness(region_m, freight)?;
    Ok(Vector3::from_fn(|i, _| {
        let t = thickness[i];
        let f = freight.dimensions_m[i];
        (t + f) / (t / packaging.conductivity_w_per_mk + f / freight.conductivity_w_per_mk[i])
    }))
}

pub(crate) fn homogenize(
    region_m: &Vector3<f64>,
    freight: &Freight,
    packaging: &PackagingMaterial,
) -> CargoResult<HomogenizedProperties> {
    let split = volume_split(region_m, freight)?;
    Ok(HomogenizedProperties {
        density_kg_per_m3: density(split, freight, packaging)?,
        heat_capacity_j_per_kgk: heat_capacity(split, freight, packaging)?,
        conductivity_w_per_mk: conductivity(region_m, freight, packaging)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freight::FreightType;

    #[test]
    fn tightly_packed_freight_keeps_its_own_properties() {
        let region = Vector3::new(0.4, 0.4, 0.4);
        let mut f = Freight::new(FreightType::Pack, [0.4, 0.4, 0.4], 64.0 * 0.4 * 0.4 * 0.4);
        f.conductivity_w_per_mk = Vector3::new(1.0, 2.0, 3.0);
        let p = homogenize(&region, &f, &PACKAGING).unwrap();
        assert!((p.density_kg_per_m3 - 64.0).abs() < 1e-9);
        assert!((p.heat_capacity_j_per_kgk - Freight::DEFAULT_HEAT_CAPACITY).abs() < 1e-9);
        assert!((p.conductivity_w_per_mk - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
    }

    #[test]
    fn series_conductivity_is_bounded_by_both_materials() {
        let region = Vector3::new(0.6, 0.4, 0.4);
        let f = Freight::new(FreightType::Cells, [0.25, 0.15, 0.35], 5.0);
        let k = conductivity(&region, &f, &PACKAGING).unwrap();
        for i in 0..3 {
            let lo = PACKAGING.conductivity_w_per_mk.min(f.conductivity_w_per_mk[i]);
            let hi = PACKAGING.conductivity_w_per_mk.max(f.conductivity_w_per_mk[i]);
            assert!(k[i] >= lo && k[i] <= hi, "axis {i}: {}", k[i]);
        }
    }

    #[test]
    fn heat_capacity_is_mass_weighted() {
        let region = Vector3::new(0.6, 0.4, 0.4);
        let f = Freight::new(FreightType::Cells, [0.25, 0.35, 0.35], 12.0);
        let split = volume_split(&region, &f).unwrap();
        let m_pack = split.packaging_m3() * PACKAGING.density_kg_per_m3;
        let m_freight = 2.0 * 12.0;
        let expected = (m_pack * PACKAGING.heat_capacity_j_per_kgk
            + m_freight * Freight::DEFAULT_HEAT_CAPACITY)
            / (m_pack + m_freight);
        let cp = heat_capacity(split, &f, &PACKAGING).unwrap();
        assert!((cp - expected).abs() < 1e-9);
    }
}
