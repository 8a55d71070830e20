//! GeoJSON viewport slices.

use map_common::{CrsCode, LayerDescriptor, ProjectedEnvelope, ResolutionVariant};

use crate::filter::AttributeFilter;
use crate::sql::{
    conjunction, from_table, id_column, intersects_predicates, properties_object,
    repaired_geometry, transform, QueryBuilder, SqlQuery,
};

/// Number of decimal places in emitted GeoJSON coordinates.
pub const GEOJSON_PRECISION: u32 = 6;

/// Build the query returning every feature of `variant` that intersects
/// `envelope` and satisfies `filter`.
///
/// Result columns: `gid bigint`, `geometry text` (GeoJSON in EPSG:4326),
/// `properties text` (a JSON object). Rows are ordered by `gid`.
pub fn slice_query(
    layer: &LayerDescriptor,
    variant: &ResolutionVariant,
    envelope: &ProjectedEnvelope,
    filter: &AttributeFilter,
) -> SqlQuery {
    let mut qb = QueryBuilder::new();

    let env = qb.projected_envelope(envelope);
    let mut predicates = intersects_predicates(variant, &env).to_vec();
    predicates.extend(qb.filter_predicates(variant, filter));

    let geographic = transform("c.geom", variant.srid, CrsCode::Epsg4326.srid());

    let sql = format!(
        r#"WITH candidates AS (
    SELECT {id} AS gid,
           {geom} AS geom,
           {props} AS properties
    FROM {table}
    WHERE {predicates}
)
SELECT c.gid,
       ST_AsGeoJSON({geographic}, {precision}) AS geometry,
       c.properties
FROM candidates AS c
WHERE NOT ST_IsEmpty(c.geom)
ORDER BY c.gid"#,
        id = id_column(variant),
        geom = repaired_geometry(variant, layer.geometry),
        props = properties_object(layer, variant),
        table = from_table(variant),
        predicates = conjunction(&predicates),
        geographic = geographic,
        precision = GEOJSON_PRECISION,
    );

    qb.finish(sql)
}
