//! Buffer (setback) zones around road and residential features.
//!
//! Every candidate feature is buffered on its own; overlapping buffers are
//! not merged, so each output feature keeps the id of its source record.
//! Distances are meters, so buffering always happens in a planar CRS: the
//! table's own SRID when it is planar, the layer's `metric_srid` otherwise.

use map_common::{
    CrsCode, LayerDescriptor, MapError, MapResult, ProjectedEnvelope, ResolutionVariant,
    SetbackConfig,
};

use crate::slice::GEOJSON_PRECISION;
use crate::sql::{
    conjunction, from_table, id_column, intersects_predicates, repaired_geometry, transform,
    BindValue, QueryBuilder, SqlQuery,
};

/// A validated buffer distance in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetbackRequest {
    distance: f64,
}

impl SetbackRequest {
    pub fn new(distance: f64) -> MapResult<Self> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(MapError::InvalidDistance(format!(
                "distance must be a positive number of meters, got {}",
                distance
            )));
        }
        Ok(Self { distance })
    }

    /// Parse the `dist` query parameter, falling back to the layer default
    /// when it is absent or blank.
    pub fn from_param(param: Option<&str>, config: &SetbackConfig) -> MapResult<Self> {
        match param.map(str::trim) {
            None | Some("") => Self::new(config.default_distance),
            Some(raw) => {
                let distance: f64 = raw.parse().map_err(|_| {
                    MapError::InvalidDistance(format!("'{}' is not a number", raw))
                })?;
                Self::new(distance)
            }
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn cache_key(&self) -> String {
        format!("{}", self.distance)
    }
}

/// Build the buffer query for `layer` over `envelope`.
///
/// Result columns match [`crate::slice_query`]: `gid`, `geometry` (GeoJSON
/// in EPSG:4326) and `properties` (`{"gid": .., "dist": ..}`).
pub fn setback_query(
    layer: &LayerDescriptor,
    variant: &ResolutionVariant,
    envelope: &ProjectedEnvelope,
    request: &SetbackRequest,
) -> MapResult<SqlQuery> {
    let config = layer.setback.as_ref().ok_or_else(|| {
        MapError::Config(format!("layer {} has no setback definition", layer.id))
    })?;

    let buffer_srid = if variant.crs()?.is_geographic() {
        config.metric_srid
    } else {
        variant.srid
    };

    let mut qb = QueryBuilder::new();
    let env = qb.projected_envelope(envelope);
    let predicates = intersects_predicates(variant, &env);
    let dist = qb.bind(BindValue::Float(request.distance()));

    let buffered = format!(
        "ST_Buffer({}, {})",
        transform("c.geom", variant.srid, buffer_srid),
        dist
    );
    let geographic = transform(&buffered, buffer_srid, CrsCode::Epsg4326.srid());

    let sql = format!(
        r#"WITH candidates AS (
    SELECT {id} AS gid,
           {geom} AS geom
    FROM {table}
    WHERE {predicates}
)
SELECT c.gid,
       ST_AsGeoJSON({geographic}, {precision}) AS geometry,
       jsonb_build_object('gid', c.gid, 'dist', {dist}::float8)::text AS properties
FROM candidates AS c
WHERE NOT ST_IsEmpty(c.geom)
ORDER BY c.gid"#,
        id = id_column(variant),
        geom = repaired_geometry(variant, layer.geometry),
        table = from_table(variant),
        predicates = conjunction(&predicates),
        geographic = geographic,
        precision = GEOJSON_PRECISION,
        dist = dist,
    );

    Ok(qb.finish(sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_common::Envelope;

    fn road() -> LayerDescriptor {
        serde_yaml::from_str(
            r#"
id: road
geometry: multi_line
tile_fields: [gid]
full:
  table: { schema: filter, name: road }
  srid: 5186
setback:
  endpoint: road_setback
"#,
        )
        .unwrap()
    }

    fn config() -> SetbackConfig {
        road().setback.unwrap()
    }

    #[test]
    fn test_rejects_non_positive_distance() {
        for d in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SetbackRequest::new(d),
                Err(MapError::InvalidDistance(_))
            ));
        }
    }

    #[test]
    fn test_param_parsing() {
        let cfg = config();
        assert_eq!(SetbackRequest::from_param(None, &cfg).unwrap().distance(), 50.0);
        assert_eq!(SetbackRequest::from_param(Some(" "), &cfg).unwrap().distance(), 50.0);
        assert_eq!(SetbackRequest::from_param(Some("12.5"), &cfg).unwrap().distance(), 12.5);
        assert!(matches!(
            SetbackRequest::from_param(Some("abc"), &cfg),
            Err(MapError::InvalidDistance(_))
        ));
        assert!(matches!(
            SetbackRequest::from_param(Some("-5"), &cfg),
            Err(MapError::InvalidDistance(_))
        ));
    }

    #[test]
    fn test_buffers_in_native_planar_srid() {
        let layer = road();
        let env = Envelope::parse("127.3,36.3,127.4,36.4").unwrap();
        let q = setback_query(
            &layer,
            &layer.full,
            &env.in_srid(5186),
            &SetbackRequest::new(30.0).unwrap(),
        )
        .unwrap();

        assert!(q.sql.contains("ST_Transform(ST_Buffer(c.geom, $5), 4326)"));
        assert!(q.sql.contains("ST_CollectionExtract(ST_MakeValid(t.\"geom\"), 2)"));
        assert!(q.sql.contains("'dist', $5::float8"));
        assert!(!q.sql.contains("ST_Union"));
        assert_eq!(q.binds.len(), 5);
        assert_eq!(q.binds[4], BindValue::Float(30.0));
    }

    #[test]
    fn test_geographic_table_buffers_in_metric_srid() {
        let mut layer = road();
        layer.full.srid = 4326;
        let env = Envelope::parse("127.3,36.3,127.4,36.4").unwrap();
        let q = setback_query(
            &layer,
            &layer.full,
            &env.in_srid(4326),
            &SetbackRequest::new(50.0).unwrap(),
        )
        .unwrap();

        assert!(q
            .sql
            .contains("ST_Transform(ST_Buffer(ST_Transform(c.geom, 5186), $5), 4326)"));
    }

    #[test]
    fn test_layer_without_setback_is_config_error() {
        let mut layer = road();
        layer.setback = None;
        let env = Envelope::parse("127.3,36.3,127.4,36.4").unwrap();
        let result = setback_query(
            &layer,
            &layer.full,
            &env.in_srid(5186),
            &SetbackRequest::new(50.0).unwrap(),
        );
        assert!(matches!(result, Err(MapError::Config(_))));
    }
}
