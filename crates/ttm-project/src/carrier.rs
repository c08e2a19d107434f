//! Carrier geometry and wall properties.

use serde::{Deserialize, Serialize};

/// Edge length of a background mesh cell.
pub const CELL_SIZE_M: f64 = 0.32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CarrierKind {
    /// 20 ft container.
    Container,
    /// 40 ft container.
    Container40,
    /// Curtain-sided truck trailer.
    Carrier,
    /// Passenger car; the cargo region itself is the outer boundary.
    Car,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierSpec {
    pub length_m: f64,
    pub width_m: f64,
    pub height_m: f64,
    /// Conductivity of the wall layer.
    pub wall_conductivity_w_per_mk: f64,
    pub wall_thickness_m: f64,
    /// Solar absorptivity, also used as emissivity.
    pub absorptivity: f64,
}

impl CarrierKind {
    pub fn spec(self) -> CarrierSpec {
        match self {
            CarrierKind::Container => CarrierSpec {
                length_m: 6.0585,
                width_m: 2.4390,
                height_m: 2.3855,
                wall_conductivity_w_per_mk: 44.0,
                wall_thickness_m: 0.005,
                absorptivity: 0.65,
            },
            CarrierKind::Container40 => CarrierSpec {
                length_m: 12.19205,
                width_m: 2.4390,
                height_m: 2.3855,
                wall_conductivity_w_per_mk: 44.0,
                wall_thickness_m: 0.005,
                absorptivity: 0.65,
            },
            CarrierKind::Carrier => CarrierSpec {
                length_m: 13.0005,
                width_m: 2.4610,
                height_m: 2.5505,
                wall_conductivity_w_per_mk: 0.5,
                wall_thickness_m: 0.01,
                absorptivity: 0.1,
            },
            CarrierKind::Car => CarrierSpec {
                length_m: 5.0,
                width_m: 3.0,
                height_m: 3.0,
                wall_conductivity_w_per_mk: 1.0,
                wall_thickness_m: 1.0,
                absorptivity: 0.3,
            },
        }
    }

    pub fn is_car(self) -> bool {
        matches!(self, CarrierKind::Car)
    }
}

impl CarrierSpec {
    /// Background mesh block counts along (x, y, z).
    pub fn block_counts(&self) -> [usize; 3] {
        [self.length_m, self.width_m, self.height_m].map(|d| (d / CELL_SIZE_M).ceil() as usize)
    }

    /// Background mesh extents, a whole number of cells per axis.
    pub fn background_extent_m(&self) -> [f64; 3] {
        self.block_counts().map(|n| n as f64 * CELL_SIZE_M)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_blocks_cover_carrier() {
        let spec = CarrierKind::Container.spec();
        assert_eq!(spec.block_counts(), [19, 8, 8]);
        let extent = spec.background_extent_m();
        assert!(extent[0] >= spec.length_m);
        assert!(extent[1] >= spec.width_m);
        assert!(extent[2] >= spec.height_m);
    }

    #[test]
    fn kind_names_are_lowercase() {
        let yaml = serde_yaml::to_string(&CarrierKind::Container40).unwrap();
        assert_eq!(yaml.trim(), "container40");
    }
}
