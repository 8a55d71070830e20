//! Common types shared by the parcel map services.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geojson;
pub mod layer;
pub mod tile;

pub use bbox::{BoundingBox, Envelope, ProjectedEnvelope};
pub use crs::CrsCode;
pub use error::{MapError, MapResult};
pub use geojson::{Feature, FeatureCollection};
pub use layer::{
    FilterBinding, GeometryKind, LayerDescriptor, ResolutionVariant, SetbackConfig, TableRef,
};
pub use tile::TileCoord;
