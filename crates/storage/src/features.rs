//! Rows returned by slice and setback queries.

use serde_json::{Map, Value};
use sqlx::FromRow;

use map_common::{Feature, FeatureCollection, MapError, MapResult};

/// One output feature as produced by the database: the id plus GeoJSON
/// geometry and a properties object, both still as JSON text.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FeatureRow {
    pub gid: i64,
    pub geometry: String,
    pub properties: String,
}

impl FeatureRow {
    pub fn into_feature(self) -> MapResult<Feature> {
        let geometry: Value = serde_json::from_str(&self.geometry)?;
        let properties: Map<String, Value> = match serde_json::from_str(&self.properties)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(MapError::QueryExecution(format!(
                    "feature {} has non-object properties: {}",
                    self.gid, other
                )))
            }
        };

        Ok(Feature::new(geometry)
            .with_id(self.gid)
            .with_properties(properties))
    }
}

/// Assemble rows into a collection, keeping their order.
pub fn feature_collection(rows: Vec<FeatureRow>) -> MapResult<FeatureCollection> {
    let features = rows
        .into_iter()
        .map(FeatureRow::into_feature)
        .collect::<MapResult<Vec<_>>>()?;
    Ok(FeatureCollection::new().with_features(features))
}
