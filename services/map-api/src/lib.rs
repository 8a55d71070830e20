//! Map API Service Library
//!
//! HTTP server for parcel, zoning and road layers: Mapbox Vector Tiles,
//! bbox-bounded GeoJSON slices, road and residential setback buffers, and a
//! key-holding proxy in front of the VWorld geocoder and raster tiles.

pub mod config;
pub mod handlers;
pub mod layer_config;
pub mod metrics;
pub mod state;
pub mod upstream;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the full router over `state`.
///
/// `prometheus` is absent in tests, where no global recorder is installed.
pub fn build_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        // Vector tiles
        .route(
            "/tiles/:layer/:z/:x/:y",
            get(handlers::tiles::layer_tile_handler),
        )
        .route("/tiles/:file", get(handlers::tiles::layer_tilejson_handler))
        // GeoJSON slices and setbacks
        .route("/geojson/:name", get(handlers::geojson::geojson_handler))
        // VWorld proxy
        .route("/api/geocode", get(handlers::proxy::geocode_handler))
        .route("/api/geocode/", get(handlers::proxy::geocode_handler))
        .route(
            "/vwtiles/:layer/:z/:y/:x",
            get(handlers::proxy::vwtiles_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler));

    // Composed group tiles live at the root: /{group}/{z}/{x}/{y}.pbf
    for group in state.catalog.groups() {
        let tile_group = group.id.clone();
        let json_group = group.id.clone();
        app = app
            .route(
                &format!("/{}/:z/:x/:y", group.id),
                get(move |ext, path, query| {
                    handlers::tiles::group_tile_handler(tile_group.clone(), ext, path, query)
                }),
            )
            .route(
                &format!("/{}/tiles.json", group.id),
                get(move |ext, headers| {
                    handlers::tiles::group_tilejson_handler(json_group.clone(), ext, headers)
                }),
            );
    }

    if let Some(handle) = prometheus {
        app = app.layer(Extension(handle));
    }

    app.layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
