//! Bounding box and viewport envelope types.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, MapResult};

/// A rectangle in some coordinate reference system.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, EPSG:5186, ...), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Grow the box by `dx` horizontally and `dy` vertically on every side.
    pub fn expand(&self, dx: f64, dy: f64) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x - dx,
            min_y: self.min_y - dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

}

/// A validated map viewport in geographic coordinates (EPSG:4326).
///
/// Built from the `bbox=west,south,east,north` query parameter. The
/// rectangle is never compared against stored geometries directly; it is
/// first reprojected into the native SRID of whichever table gets queried
/// (see [`Envelope::in_srid`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Envelope {
    /// Build an envelope from already-parsed edges, validating them.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> MapResult<Self> {
        for (name, value) in [
            ("west", west),
            ("south", south),
            ("east", east),
            ("north", north),
        ] {
            if !value.is_finite() {
                return Err(MapError::InvalidBounds(format!("{} is not finite", name)));
            }
        }

        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return Err(MapError::InvalidBounds(
                "longitude must be within [-180, 180]".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(MapError::InvalidBounds(
                "latitude must be within [-90, 90]".to_string(),
            ));
        }
        if west >= east {
            return Err(MapError::InvalidBounds(format!(
                "west ({}) must be less than east ({})",
                west, east
            )));
        }
        if south >= north {
            return Err(MapError::InvalidBounds(format!(
                "south ({}) must be less than north ({})",
                south, north
            )));
        }

        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Parse a bbox parameter string: "west,south,east,north".
    pub fn parse(s: &str) -> MapResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(MapError::InvalidBounds(format!(
                "'{}': expected 'west,south,east,north'",
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| MapError::InvalidBounds(format!("invalid number '{}'", part)))?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Resolve an optional bbox parameter.
    ///
    /// An absent or blank parameter is the unbounded state and yields
    /// `Ok(None)`; anything else must parse.
    pub fn resolve(param: Option<&str>) -> MapResult<Option<Self>> {
        match param.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    /// Defer reprojection of this envelope into `srid`.
    pub fn in_srid(&self, srid: i32) -> ProjectedEnvelope {
        ProjectedEnvelope {
            envelope: *self,
            target_srid: srid,
        }
    }

    pub fn as_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.west, self.south, self.east, self.north)
    }

    /// Cache key fragment.
    ///
    /// Uses the shortest round-trip form of each edge, so two envelopes share
    /// a key only when they bind identical values.
    pub fn cache_key(&self) -> String {
        format!("{}_{}_{}_{}", self.west, self.south, self.east, self.north)
    }
}

/// An envelope paired with the SRID it has to be reprojected into.
///
/// The reprojection itself runs inside the database
/// (`ST_Transform(ST_MakeEnvelope(..., 4326), srid)`), so this only records
/// the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedEnvelope {
    pub envelope: Envelope,
    pub target_srid: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let env = Envelope::parse("126.80,36.50,126.90,36.60").unwrap();
        assert_eq!(env.west, 126.80);
        assert_eq!(env.south, 36.50);
        assert_eq!(env.east, 126.90);
        assert_eq!(env.north, 36.60);
    }

    #[test]
    fn test_parse_bbox_with_spaces() {
        let env = Envelope::parse(" 126.8, 36.5 ,126.9,36.6 ").unwrap();
        assert_eq!(env.west, 126.8);
        assert_eq!(env.north, 36.6);
    }

    #[test]
    fn test_resolve_absent_is_unbounded() {
        assert_eq!(Envelope::resolve(None).unwrap(), None);
        assert_eq!(Envelope::resolve(Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_in_srid_keeps_envelope() {
        let env = Envelope::parse("126.8,36.5,126.9,36.6").unwrap();
        let projected = env.in_srid(5186);
        assert_eq!(projected.target_srid, 5186);
        assert_eq!(projected.envelope, env);
    }

    #[test]
    fn test_expand() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0).expand(1.0, 2.0);
        assert_eq!(b, BoundingBox::new(-1.0, -2.0, 11.0, 12.0));
        assert_eq!(b.width(), 12.0);
    }
}
