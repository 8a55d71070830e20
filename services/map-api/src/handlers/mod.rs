//! HTTP request handlers.

pub mod common;
pub mod geojson;
pub mod health;
pub mod proxy;
pub mod tiles;

pub use geojson::geojson_handler;
pub use health::{health_handler, metrics_handler, ready_handler};
pub use proxy::{geocode_handler, vwtiles_handler};
pub use tiles::{
    group_tile_handler, group_tilejson_handler, layer_tile_handler, layer_tilejson_handler,
};
