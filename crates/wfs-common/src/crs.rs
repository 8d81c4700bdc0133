//! Coordinate reference system codes as exchanged with the WFS.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// BC Albers, the projection datasets are stored in.
pub const DEFAULT_OUTPUT_CRS: Crs = Crs { srid: 3005 };

/// Bounds supplied without an explicit CRS are read as BC Albers.
pub const DEFAULT_BOUNDS_CRS: Crs = Crs { srid: 3005 };

/// An EPSG coded CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    srid: u32,
}

impl Crs {
    pub const fn epsg(srid: u32) -> Self {
        Self { srid }
    }

    /// Numeric EPSG code, used as the PostGIS SRID.
    pub fn srid(&self) -> u32 {
        self.srid
    }

    /// Plain WGS84 output is the GeoJSON default and needs no `crs` member.
    pub fn is_wgs84(&self) -> bool {
        self.srid == 4326
    }

    /// OGC URN form used in legacy GeoJSON `crs` members.
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.srid)
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    /// Accepts `EPSG:3005`, `epsg:3005` and the URN form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        let code = normalized
            .strip_prefix("EPSG:")
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        code.parse()
            .map(Crs::epsg)
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.srid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!("EPSG:3005".parse::<Crs>().unwrap(), Crs::epsg(3005));
        assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::epsg(4326));
        assert_eq!(
            "urn:ogc:def:crs:EPSG::3857".parse::<Crs>().unwrap(),
            Crs::epsg(3857)
        );
        assert!("CRS:84".parse::<Crs>().is_err());
        assert!("EPSG:abc".parse::<Crs>().is_err());
    }

    #[test]
    fn test_display_and_urn() {
        assert_eq!(DEFAULT_OUTPUT_CRS.to_string(), "EPSG:3005");
        assert_eq!(DEFAULT_OUTPUT_CRS.urn(), "urn:ogc:def:crs:EPSG::3005");
        assert!(Crs::epsg(4326).is_wgs84());
    }
}
