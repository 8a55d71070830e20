//! Coordinate Reference System codes used by the parcel datasets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known CRS codes the server knows how to reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// Web Mercator (meters), the MVT tile grid
    Epsg3857,
    /// Korea 2000 / Central Belt 2010 (meters)
    Epsg5186,
    /// Korea 2000 / Unified CS (meters)
    Epsg5179,
    /// Korea 2000 / Central Belt (meters)
    Epsg5174,
}

impl CrsCode {
    /// Look up a CRS by its numeric EPSG code.
    pub fn from_srid(srid: i32) -> Result<Self, CrsParseError> {
        match srid {
            4326 => Ok(CrsCode::Epsg4326),
            3857 => Ok(CrsCode::Epsg3857),
            5186 => Ok(CrsCode::Epsg5186),
            5179 => Ok(CrsCode::Epsg5179),
            5174 => Ok(CrsCode::Epsg5174),
            _ => Err(CrsParseError::UnsupportedSrid(srid)),
        }
    }

    /// Numeric EPSG code.
    pub fn srid(&self) -> i32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Epsg5186 => 5186,
            CrsCode::Epsg5179 => 5179,
            CrsCode::Epsg5174 => 5174,
        }
    }

    /// Check if this is a geographic (angular) CRS.
    ///
    /// Distances measured in a geographic CRS are in degrees and vary with
    /// latitude, so buffering must never happen in one.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.srid())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported SRID: {0}")]
    UnsupportedSrid(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srid_round_trip_and_kind() {
        for code in [
            CrsCode::Epsg4326,
            CrsCode::Epsg3857,
            CrsCode::Epsg5186,
            CrsCode::Epsg5179,
            CrsCode::Epsg5174,
        ] {
            assert_eq!(CrsCode::from_srid(code.srid()).unwrap(), code);
        }
        assert!(CrsCode::Epsg4326.is_geographic());
        assert!(!CrsCode::Epsg5186.is_geographic());
        assert_eq!(CrsCode::Epsg5179.to_string(), "EPSG:5179");
    }
}
