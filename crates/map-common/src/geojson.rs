//! GeoJSON response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Array of features; serialized as `[]` when empty, never `null`.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature.
///
/// The geometry is carried as an opaque JSON value because it is produced
/// by the database (`ST_AsGeoJSON`), already reprojected and rounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// Feature identifier (the record's `gid`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    pub geometry: Value,

    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Value) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: None,
            geometry,
            properties: Map::new(),
        }
    }

    /// Set the feature ID.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the properties.
    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_collection_serialization() {
        let json = serde_json::to_string(&FeatureCollection::new()).unwrap();
        assert_eq!(json, r#"{"type":"FeatureCollection","features":[]}"#);
    }

    #[test]
    fn test_feature_serialization() {
        let feature = Feature::new(json!({"type": "Point", "coordinates": [126.8, 36.5]}))
            .with_id(7)
            .with_properties(json!({"gid": 7, "a20": "08"}).as_object().unwrap().clone());

        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["id"], 7);
        assert_eq!(value["properties"]["a20"], "08");
        assert_eq!(value["geometry"]["type"], "Point");
    }
}
