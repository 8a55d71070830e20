//! Layer descriptors and their backing tables.
//!
//! A [`LayerDescriptor`] is one logical dataset (owner parcels, zoning,
//! roads, ...). Each layer is backed by a full-detail [`ResolutionVariant`]
//! and, optionally, a pre-simplified variant used at low zoom. Descriptors
//! are loaded once at startup and shared immutably between requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::crs::CrsCode;
use crate::error::{MapError, MapResult};

/// Geometry dimension stored in a layer's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Polygon,
    MultiLine,
}

impl GeometryKind {
    /// `ST_CollectionExtract` type code that keeps this dimension.
    pub fn collection_type(&self) -> u8 {
        match self {
            GeometryKind::MultiLine => 2,
            GeometryKind::Polygon => 3,
        }
    }
}

/// A schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// One physical table backing a layer at a given zoom band.
///
/// `columns` is the capability descriptor: the attribute columns this table
/// actually has. Attributes a layer exposes but a variant lacks are emitted
/// as empty strings instead of failing the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionVariant {
    pub table: TableRef,

    /// Native SRID of the geometry column.
    pub srid: i32,

    #[serde(default = "default_id_column")]
    pub id_column: String,

    #[serde(default = "default_geom_column")]
    pub geom_column: String,

    #[serde(default)]
    pub columns: BTreeSet<String>,
}

impl ResolutionVariant {
    pub fn has_column(&self, name: &str) -> bool {
        name == self.id_column || self.columns.contains(name)
    }

    pub fn crs(&self) -> MapResult<CrsCode> {
        CrsCode::from_srid(self.srid)
            .map_err(|e| MapError::Config(format!("table {}: {}", self.table, e)))
    }
}

/// Maps a repeated query parameter (`jm`, `own`) onto a column (`a20`, `a8`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterBinding {
    pub param: String,
    pub column: String,
}

/// Exposes a layer as a buffer/setback source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetbackConfig {
    /// Name under `/geojson/` that serves the buffers (e.g. `road_setback`).
    pub endpoint: String,

    /// Planar CRS the buffer distance is measured in.
    #[serde(default = "default_metric_srid")]
    pub metric_srid: i32,

    /// Distance in meters used when the request has no `dist`.
    #[serde(default = "default_setback_distance")]
    pub default_distance: f64,
}

/// A logical map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: String,

    #[serde(default)]
    pub title: String,

    pub geometry: GeometryKind,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: u32,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: u32,

    /// Attributes emitted in tiles and GeoJSON properties.
    #[serde(default)]
    pub tile_fields: Vec<String>,

    #[serde(default)]
    pub filters: Vec<FilterBinding>,

    pub full: ResolutionVariant,

    #[serde(default)]
    pub simplified: Option<ResolutionVariant>,

    #[serde(default)]
    pub setback: Option<SetbackConfig>,
}

impl LayerDescriptor {
    /// Whether tiles are emitted for this layer at zoom `z`.
    pub fn emits_at_zoom(&self, z: u32) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&z)
    }

    /// Exposed attributes other than the record identifier.
    pub fn attribute_fields(&self) -> impl Iterator<Item = &str> {
        self.tile_fields
            .iter()
            .map(String::as_str)
            .filter(move |f| *f != self.full.id_column)
    }

    /// Check the descriptor for settings that would only fail at query time.
    pub fn validate(&self) -> MapResult<()> {
        if self.id.trim().is_empty() {
            return Err(MapError::Config("layer id must not be empty".to_string()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::Config(format!(
                "layer {}: min_zoom {} exceeds max_zoom {}",
                self.id, self.min_zoom, self.max_zoom
            )));
        }

        self.full.crs()?;
        if let Some(simplified) = &self.simplified {
            simplified.crs()?;
            if simplified.id_column != self.full.id_column {
                return Err(MapError::Config(format!(
                    "layer {}: variants disagree on id column ({} vs {})",
                    self.id, self.full.id_column, simplified.id_column
                )));
            }
        }

        if let Some(setback) = &self.setback {
            let metric = CrsCode::from_srid(setback.metric_srid)
                .map_err(|e| MapError::Config(format!("layer {}: {}", self.id, e)))?;
            if metric.is_geographic() {
                return Err(MapError::Config(format!(
                    "layer {}: setback metric_srid {} is not a planar CRS",
                    self.id, setback.metric_srid
                )));
            }
            if !(setback.default_distance.is_finite() && setback.default_distance > 0.0) {
                return Err(MapError::Config(format!(
                    "layer {}: setback default_distance must be positive",
                    self.id
                )));
            }
        }

        Ok(())
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_id_column() -> String {
    "gid".to_string()
}

fn default_geom_column() -> String {
    "geom".to_string()
}

fn default_metric_srid() -> i32 {
    CrsCode::Epsg5186.srid()
}

fn default_setback_distance() -> f64 {
    50.0
}

fn default_min_zoom() -> u32 {
    10
}

fn default_max_zoom() -> u32 {
    crate::tile::MAX_TILE_ZOOM
}
