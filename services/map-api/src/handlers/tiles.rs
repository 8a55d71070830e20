//! Vector tile and TileJSON handlers.
//!
//! Routes:
//! - `/tiles/{layer}/{z}/{x}/{y}.pbf`: one MVT layer
//! - `/tiles/{layer}.json`: TileJSON for one layer
//! - `/{group}/{z}/{x}/{y}.pbf`, `/{group}/tiles.json`: composed group tiles

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::Response,
    Json,
};
use bytes::Bytes;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use map_common::{LayerDescriptor, MapError, MapResult, TileCoord};
use spatial_query::{select_variant, tile_query, AttributeFilter};

use super::common::{
    base_url, body_response, respond_cached, run_tile_query, split_extension,
    tile_error_response, ApiError, QueryPairs, MVT_CONTENT_TYPE,
};
use crate::layer_config::LayerGroup;
use crate::state::AppState;

/// GET /tiles/:layer/:z/:x/:y
pub async fn layer_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((layer_id, z, x, y)): Path<(String, String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    state.metrics.record_request("tiles");

    match layer_tile(&state, &layer_id, &z, &x, &y, &params).await {
        Ok(response) => response,
        Err(e) => tile_error_response(&e),
    }
}

async fn layer_tile(
    state: &AppState,
    layer_id: &str,
    z: &str,
    x: &str,
    y: &str,
    params: &[(String, String)],
) -> MapResult<Response> {
    let coord = parse_tile_path(z, x, y)?;
    let layer = state
        .catalog
        .layer(layer_id)
        .ok_or_else(|| MapError::LayerNotFound(layer_id.to_string()))?;

    if !layer.emits_at_zoom(coord.z) {
        debug!(layer = %layer.id, z = coord.z, "Zoom outside layer range; empty tile");
        return Ok(body_response(MVT_CONTENT_TYPE, Bytes::new(), None));
    }

    let filter = AttributeFilter::from_params(layer, params.borrowed_pairs());
    let key = format!(
        "tile:{}:{}:{}",
        layer.id,
        filter.cache_key(),
        coord.cache_key()
    );

    let filter = &filter;
    respond_cached(state, key, MVT_CONTENT_TYPE, None, || async move {
        let tile = render_layer(state, layer, coord, filter).await?;
        Ok(Bytes::from(tile))
    })
    .await
}

/// GET /{group}/:z/:x/:y
pub async fn group_tile_handler(
    group_id: String,
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y)): Path<(String, String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    state.metrics.record_request("group_tiles");

    match group_tile(&state, &group_id, &z, &x, &y, &params).await {
        Ok(response) => response,
        Err(e) => tile_error_response(&e),
    }
}

async fn group_tile(
    state: &AppState,
    group_id: &str,
    z: &str,
    x: &str,
    y: &str,
    params: &[(String, String)],
) -> MapResult<Response> {
    let coord = parse_tile_path(z, x, y)?;
    let group = state
        .catalog
        .group(group_id)
        .ok_or_else(|| MapError::LayerNotFound(group_id.to_string()))?;

    let pairs = params.borrowed_pairs();
    let members: Vec<(&LayerDescriptor, AttributeFilter)> = state
        .catalog
        .group_layers(group)
        .filter(|layer| layer.emits_at_zoom(coord.z))
        .map(|layer| (layer, AttributeFilter::from_params(layer, pairs.iter().copied())))
        .collect();

    if members.is_empty() {
        return Ok(body_response(MVT_CONTENT_TYPE, Bytes::new(), None));
    }

    let filter_key = members
        .iter()
        .map(|(layer, filter)| format!("{}={}", layer.id, filter.cache_key()))
        .collect::<Vec<_>>()
        .join("|");
    let key = format!("group:{}:{}:{}", group.id, filter_key, coord.cache_key());

    let members = &members;
    respond_cached(state, key, MVT_CONTENT_TYPE, None, || async move {
        // Each member is a complete MVT layer; concatenated layers form one
        // valid multi-layer tile.
        let tiles = try_join_all(
            members
                .iter()
                .map(|(layer, filter)| render_layer(state, layer, coord, filter)),
        )
        .await?;
        Ok(Bytes::from(tiles.concat()))
    })
    .await
}

async fn render_layer(
    state: &AppState,
    layer: &LayerDescriptor,
    coord: TileCoord,
    filter: &AttributeFilter,
) -> MapResult<Vec<u8>> {
    let variant = select_variant(layer, Some(coord.z), state.catalog.policy());
    let query = tile_query(layer, variant, coord, filter);
    debug!(
        layer = %layer.id,
        table = %variant.table,
        tile = %coord.cache_key(),
        "Rendering tile"
    );
    run_tile_query(state, &query).await
}

/// Parse `z`, `x` and `y.pbf` path segments into a grid coordinate.
pub fn parse_tile_path(z: &str, x: &str, y: &str) -> MapResult<TileCoord> {
    let (y, ext) = split_extension(y)
        .ok_or_else(|| MapError::InvalidTile(format!("missing extension in '{}'", y)))?;
    if ext != "pbf" && ext != "mvt" {
        return Err(MapError::InvalidTile(format!("unsupported extension '{}'", ext)));
    }

    let parse = |name: &str, value: &str| {
        value
            .parse::<u32>()
            .map_err(|_| MapError::InvalidTile(format!("{} '{}' is not a tile index", name, value)))
    };
    TileCoord::checked(parse("z", z)?, parse("x", x)?, parse("y", y)?)
}

/// TileJSON 3.0.0 document.
#[derive(Debug, Serialize)]
pub struct TileJson {
    pub tilejson: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheme: &'static str,
    pub tiles: Vec<String>,
    pub minzoom: u32,
    pub maxzoom: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    pub vector_layers: Vec<VectorLayer>,
}

#[derive(Debug, Serialize)]
pub struct VectorLayer {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub minzoom: u32,
    pub maxzoom: u32,
    pub fields: BTreeMap<String, &'static str>,
}

impl VectorLayer {
    fn from_layer(layer: &LayerDescriptor) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(layer.full.id_column.clone(), "Number");
        for field in layer.attribute_fields() {
            fields.insert(field.to_string(), "String");
        }

        Self {
            id: layer.id.clone(),
            description: layer.title.clone(),
            minzoom: layer.min_zoom,
            maxzoom: layer.max_zoom,
            fields,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// GET /tiles/:layer.json
pub async fn layer_tilejson_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(file): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TileJson>, ApiError> {
    state.metrics.record_request("tilejson");

    let layer = file
        .strip_suffix(".json")
        .and_then(|id| state.catalog.layer(id))
        .ok_or_else(|| MapError::LayerNotFound(file.clone()))?;

    let base = base_url(state.public_url.as_deref(), &headers);
    Ok(Json(TileJson {
        tilejson: "3.0.0",
        name: layer.id.clone(),
        description: non_empty(&layer.title),
        scheme: "xyz",
        tiles: vec![format!("{}/tiles/{}/{{z}}/{{x}}/{{y}}.pbf", base, layer.id)],
        minzoom: layer.min_zoom,
        maxzoom: layer.max_zoom,
        attribution: state.catalog.attribution().map(str::to_string),
        vector_layers: vec![VectorLayer::from_layer(layer)],
    }))
}

/// GET /{group}/tiles.json
pub async fn group_tilejson_handler(
    group_id: String,
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TileJson>, ApiError> {
    state.metrics.record_request("tilejson");

    let group: &LayerGroup = state
        .catalog
        .group(&group_id)
        .ok_or_else(|| MapError::LayerNotFound(group_id.clone()))?;
    let vector_layers: Vec<VectorLayer> = state
        .catalog
        .group_layers(group)
        .map(VectorLayer::from_layer)
        .collect();

    let minzoom = vector_layers.iter().map(|l| l.minzoom).min().unwrap_or(0);
    let maxzoom = vector_layers.iter().map(|l| l.maxzoom).max().unwrap_or(0);

    let base = base_url(state.public_url.as_deref(), &headers);
    Ok(Json(TileJson {
        tilejson: "3.0.0",
        name: group.id.clone(),
        description: non_empty(&group.title),
        scheme: "xyz",
        tiles: vec![format!("{}/{}/{{z}}/{{x}}/{{y}}.pbf", base, group.id)],
        minzoom,
        maxzoom,
        attribution: state.catalog.attribution().map(str::to_string),
        vector_layers,
    }))
}
