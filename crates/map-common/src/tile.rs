//! Slippy-map tile coordinates on the Web Mercator grid.

use crate::error::{MapError, MapResult};
use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Half the width of the Web Mercator world in meters.
pub const WEB_MERCATOR_MAX_EXTENT: f64 = 20037508.342789244;

/// Highest zoom level accepted on tile endpoints.
pub const MAX_TILE_ZOOM: u32 = 22;

/// MVT tile extent (integer grid units per tile edge).
pub const MVT_EXTENT: u32 = 4096;

/// MVT buffer around the tile, in extent units.
pub const MVT_BUFFER: u32 = 64;

/// A tile coordinate (z/x/y, XYZ scheme with origin at the top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Build a coordinate and check it lies on the grid.
    pub fn checked(z: u32, x: u32, y: u32) -> MapResult<Self> {
        if z > MAX_TILE_ZOOM {
            return Err(MapError::InvalidTile(format!(
                "zoom {} exceeds maximum {}",
                z, MAX_TILE_ZOOM
            )));
        }
        let n = 1u32 << z;
        if x >= n || y >= n {
            return Err(MapError::InvalidTile(format!(
                "{}/{}/{} is outside the tile grid",
                z, x, y
            )));
        }
        Ok(Self { z, x, y })
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Tile bounds in Web Mercator meters (EPSG:3857).
    pub fn mercator_bounds(&self) -> BoundingBox {
        let n = 2u32.pow(self.z) as f64;
        let tile_span = 2.0 * WEB_MERCATOR_MAX_EXTENT / n;

        let min_x = -WEB_MERCATOR_MAX_EXTENT + self.x as f64 * tile_span;
        let max_y = WEB_MERCATOR_MAX_EXTENT - self.y as f64 * tile_span;

        BoundingBox::new(min_x, max_y - tile_span, min_x + tile_span, max_y)
    }

    /// Tile bounds grown by the MVT buffer, used to select candidate rows so
    /// that features just outside the tile still reach the buffer area.
    pub fn buffered_mercator_bounds(&self) -> BoundingBox {
        let bounds = self.mercator_bounds();
        let margin = bounds.width() * MVT_BUFFER as f64 / MVT_EXTENT as f64;
        bounds.expand(margin, margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_tile_bounds() {
        let b = TileCoord::new(0, 0, 0).mercator_bounds();
        assert!((b.min_x + WEB_MERCATOR_MAX_EXTENT).abs() < 1e-6);
        assert!((b.max_y - WEB_MERCATOR_MAX_EXTENT).abs() < 1e-6);
        assert!((b.width() - 2.0 * WEB_MERCATOR_MAX_EXTENT).abs() < 1e-6);
    }

    #[test]
    fn test_korea_tile_contains_point() {
        // z10 tile covering Daejeon area (127.4E, 36.35N in EPSG:3857)
        let (x, y) = (14_182_103.1, 4_348_888.3);
        let b = TileCoord::new(10, 874, 400).mercator_bounds();
        assert!(b.min_x <= x && x <= b.max_x, "{:?}", b);
        assert!(b.min_y <= y && y <= b.max_y, "{:?}", b);
    }

    #[test]
    fn test_buffered_bounds_margin() {
        let tile = TileCoord::new(12, 3500, 1600);
        let b = tile.mercator_bounds();
        let buffered = tile.buffered_mercator_bounds();
        let expected = b.width() * 64.0 / 4096.0;
        assert!((b.min_x - buffered.min_x - expected).abs() < 1e-6);
        assert!((buffered.max_y - b.max_y - expected).abs() < 1e-6);
    }

    #[test]
    fn test_checked_rejects_off_grid() {
        assert!(TileCoord::checked(0, 0, 0).is_ok());
        assert!(TileCoord::checked(1, 1, 1).is_ok());
        assert!(TileCoord::checked(1, 2, 0).is_err());
        assert!(TileCoord::checked(23, 0, 0).is_err());
    }
}
