use core::fmt;

use crate::TtmError;

/// Name of the interior air region of the carrier.
pub const INTERIOR_AIR: &str = "airInside";

/// Stable name of a physical sub-domain.
///
/// Cargo regions are named `battery<cargo>_<package>`, assigned once when
/// the cargo is laid out.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionName(String);

impl RegionName {
    pub fn interior_air() -> Self {
        Self(INTERIOR_AIR.to_string())
    }

    pub fn battery(cargo_index: usize, package_index: usize) -> Self {
        Self(format!("battery{cargo_index}_{package_index}"))
    }

    pub fn parse(name: &str) -> Result<Self, TtmError> {
        let region = Self(name.to_string());
        if region.is_interior_air() || region.battery_indices().is_some() {
            Ok(region)
        } else {
            Err(TtmError::InvalidRegion {
                name: name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_interior_air(&self) -> bool {
        self.0 == INTERIOR_AIR
    }

    pub fn is_cargo(&self) -> bool {
        !self.is_interior_air()
    }

    /// `(cargo index, package index)` for cargo regions.
    pub fn battery_indices(&self) -> Option<(usize, usize)> {
        let rest = self.0.strip_prefix("battery")?;
        let (cargo, package) = rest.split_once('_')?;
        Some((cargo.parse().ok()?, package.parse().ok()?))
    }
}

impl fmt::Debug for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region({})", self.0)
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RegionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
