//! Mapbox Vector Tile queries.

use map_common::tile::{MVT_BUFFER, MVT_EXTENT};
use map_common::{CrsCode, LayerDescriptor, ResolutionVariant, TileCoord};

use crate::filter::AttributeFilter;
use crate::sql::{
    conjunction, from_table, id_column, intersects_predicates, quote_ident, repaired_geometry,
    text_column, transform, BindValue, QueryBuilder, SqlQuery,
};

/// Build the query encoding one MVT layer for `coord`.
///
/// Candidates are selected against the tile bounds grown by the MVT buffer
/// (reprojected into the table's SRID) and clipped against the exact tile
/// bounds. The query yields a single `bytea` column; zero matching rows
/// produce an empty tile.
pub fn tile_query(
    layer: &LayerDescriptor,
    variant: &ResolutionVariant,
    coord: TileCoord,
    filter: &AttributeFilter,
) -> SqlQuery {
    let mercator = CrsCode::Epsg3857.srid();
    let mut qb = QueryBuilder::new();

    let clip = qb.make_envelope(&coord.mercator_bounds(), mercator);
    let search = transform(
        &qb.make_envelope(&coord.buffered_mercator_bounds(), mercator),
        mercator,
        variant.srid,
    );

    let mut predicates = intersects_predicates(variant, &search).to_vec();
    predicates.extend(qb.filter_predicates(variant, filter));

    let mut columns = vec![format!("{} AS {}", id_column(variant), quote_ident(&variant.id_column))];
    columns.extend(
        layer
            .attribute_fields()
            .map(|field| format!("{} AS {}", text_column(variant, field), quote_ident(field))),
    );

    let layer_name = qb.bind(BindValue::Text(layer.id.clone()));

    let sql = format!(
        r#"WITH mvtgeom AS (
    SELECT ST_AsMVTGeom({geom}, {clip}, {extent}, {buffer}, true) AS geom,
           {columns}
    FROM {table}
    WHERE {predicates}
    ORDER BY t.{id}
)
SELECT ST_AsMVT(mvtgeom, {layer_name}, {extent}, 'geom')
FROM mvtgeom
WHERE geom IS NOT NULL"#,
        geom = transform(
            &repaired_geometry(variant, layer.geometry),
            variant.srid,
            mercator
        ),
        clip = clip,
        extent = MVT_EXTENT,
        buffer = MVT_BUFFER,
        columns = columns.join(",\n           "),
        table = from_table(variant),
        predicates = conjunction(&predicates),
        id = quote_ident(&variant.id_column),
        layer_name = layer_name,
    );

    qb.finish(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{select_variant, ResolutionPolicy};

    fn road() -> LayerDescriptor {
        serde_yaml::from_str(
            r#"
id: road
geometry: multi_line
tile_fields: [gid]
full:
  table: { schema: filter, name: road }
  srid: 5186
simplified:
  table: { schema: filter, name: road_s10 }
  srid: 5186
"#,
        )
        .unwrap()
    }

    fn owner() -> LayerDescriptor {
        serde_yaml::from_str(
            r#"
id: owner
geometry: polygon
tile_fields: [gid, a20, a8]
filters:
  - { param: jm, column: a20 }
  - { param: own, column: a8 }
full:
  table: { schema: filter, name: owner_subdiv }
  srid: 5186
  columns: [a20, a8]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_tile_query_shape() {
        let layer = road();
        let coord = TileCoord::new(14, 13980, 6413);
        let variant = select_variant(&layer, Some(coord.z), ResolutionPolicy::default());
        let q = tile_query(&layer, variant, coord, &AttributeFilter::none());

        assert!(q.sql.contains("FROM \"filter\".\"road\" AS t"));
        assert!(q.sql.contains(
            "ST_AsMVTGeom(ST_Transform(ST_CollectionExtract(ST_MakeValid(t.\"geom\"), 2), 3857), \
             ST_MakeEnvelope($1, $2, $3, $4, 3857), 4096, 64, true)"
        ));
        assert!(q.sql.contains(
            "t.\"geom\" && ST_Transform(ST_MakeEnvelope($5, $6, $7, $8, 3857), 5186)"
        ));
        assert!(q.sql.contains("ST_AsMVT(mvtgeom, $9, 4096, 'geom')"));
        assert!(q.sql.contains("WHERE geom IS NOT NULL"));
        assert_eq!(q.binds.len(), 9);
        assert_eq!(q.binds[8], BindValue::Text("road".to_string()));
    }

    #[test]
    fn test_low_zoom_reads_simplified_table() {
        let layer = road();
        let coord = TileCoord::new(11, 1747, 801);
        let variant = select_variant(&layer, Some(coord.z), ResolutionPolicy::default());
        let q = tile_query(&layer, variant, coord, &AttributeFilter::none());
        assert!(q.sql.contains("\"road_s10\""));
    }

    #[test]
    fn test_search_bounds_are_buffered() {
        let layer = road();
        let coord = TileCoord::new(12, 3495, 1603);
        let q = tile_query(&layer, &layer.full, coord, &AttributeFilter::none());

        let clip = coord.mercator_bounds();
        match (&q.binds[0], &q.binds[4]) {
            (BindValue::Float(clip_min_x), BindValue::Float(search_min_x)) => {
                assert_eq!(*clip_min_x, clip.min_x);
                assert!(search_min_x < clip_min_x);
            }
            other => panic!("unexpected binds {:?}", other),
        }
    }

    #[test]
    fn test_tile_attributes_and_filters() {
        let layer = owner();
        let filter = AttributeFilter::from_params(&layer, [("jm", "08"), ("jm", "09"), ("own", "02")]);
        let q = tile_query(&layer, &layer.full, TileCoord::new(16, 55920, 25654), &filter);

        assert!(q.sql.contains("t.\"gid\"::bigint AS \"gid\""));
        assert!(q.sql.contains("t.\"a20\"::text AS \"a20\""));
        assert!(q.sql.contains("t.\"a20\"::text = ANY($9)"));
        assert!(q.sql.contains("t.\"a8\"::text = ANY($10)"));
        assert_eq!(
            q.binds[8],
            BindValue::TextArray(vec!["08".to_string(), "09".to_string()])
        );
        assert_eq!(q.binds[10], BindValue::Text("owner".to_string()));
    }
}
