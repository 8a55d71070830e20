//! Zoom-based choice between a layer's simplified and full-detail tables.

use map_common::{LayerDescriptor, ResolutionVariant};

/// Highest zoom level served from a simplified table.
pub const DEFAULT_SIMPLIFIED_MAX_ZOOM: u32 = 11;

/// Catalog-wide resolution cut point. One value applies to every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPolicy {
    pub simplified_max_zoom: u32,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            simplified_max_zoom: DEFAULT_SIMPLIFIED_MAX_ZOOM,
        }
    }
}

/// Select the table that backs `layer` for a request at `zoom`.
///
/// `None` means full detail was requested (GeoJSON slices, setbacks). The
/// simplified table is used only when one is registered and the zoom is at
/// or below the cut point.
pub fn select_variant(
    layer: &LayerDescriptor,
    zoom: Option<u32>,
    policy: ResolutionPolicy,
) -> &ResolutionVariant {
    match (zoom, layer.simplified.as_ref()) {
        (Some(z), Some(simplified)) if z <= policy.simplified_max_zoom => simplified,
        _ => &layer.full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road() -> LayerDescriptor {
        serde_yaml::from_str(
            r#"
id: road
geometry: multi_line
tile_fields: [gid]
full:
  table: { name: road }
  srid: 5186
simplified:
  table: { name: road_s10 }
  srid: 5186
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_low_zoom_uses_simplified() {
        let layer = road();
        for z in 0..=11 {
            let v = select_variant(&layer, Some(z), ResolutionPolicy::default());
            assert_eq!(v.table.name, "road_s10", "zoom {}", z);
        }
    }

    #[test]
    fn test_high_zoom_uses_full() {
        let layer = road();
        for z in 12..=22 {
            let v = select_variant(&layer, Some(z), ResolutionPolicy::default());
            assert_eq!(v.table.name, "road", "zoom {}", z);
        }
    }

    #[test]
    fn test_cut_point_boundary_differs() {
        let layer = road();
        let policy = ResolutionPolicy::default();
        assert_ne!(
            select_variant(&layer, Some(11), policy),
            select_variant(&layer, Some(12), policy)
        );
    }

    #[test]
    fn test_unset_zoom_is_full_detail() {
        let layer = road();
        let v = select_variant(&layer, None, ResolutionPolicy::default());
        assert_eq!(v.table.name, "road");
    }

    #[test]
    fn test_unregistered_simplified_falls_back() {
        let mut layer = road();
        layer.simplified = None;
        for z in [0, 5, 11, 12, 18] {
            let v = select_variant(&layer, Some(z), ResolutionPolicy::default());
            assert_eq!(v.table.name, "road");
        }
    }

    #[test]
    fn test_custom_cut_point() {
        let layer = road();
        let policy = ResolutionPolicy {
            simplified_max_zoom: 13,
        };
        assert_eq!(select_variant(&layer, Some(13), policy).table.name, "road_s10");
        assert_eq!(select_variant(&layer, Some(14), policy).table.name, "road");
    }
}
