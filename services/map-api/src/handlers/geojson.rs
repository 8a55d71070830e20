//! GeoJSON slice and setback handlers.
//!
//! `/geojson/{name}` serves either a setback endpoint (buffers around a
//! layer's features) or a plain layer slice, both bounded by `bbox`.

use axum::{
    extract::{Extension, Path, Query},
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use map_common::{Envelope, FeatureCollection, LayerDescriptor, MapError, MapResult};
use spatial_query::{select_variant, setback_query, slice_query, AttributeFilter, SetbackRequest};

use super::common::{
    body_response, respond_cached, run_feature_query, ApiError, QueryPairs, JSON_CONTENT_TYPE,
};
use crate::state::AppState;

/// GET /geojson/:name
pub async fn geojson_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    if let Some(layer) = state.catalog.setback_layer(&name) {
        state.metrics.record_request("setback");
        return Ok(setback(&state, &name, layer, &params).await?);
    }

    state.metrics.record_request("geojson");
    let layer = state
        .catalog
        .layer(&name)
        .ok_or_else(|| MapError::LayerNotFound(name.clone()))?;
    Ok(slice(&state, layer, &params).await?)
}

async fn slice(
    state: &AppState,
    layer: &LayerDescriptor,
    params: &[(String, String)],
) -> MapResult<Response> {
    let Some(envelope) = Envelope::resolve(params.param("bbox"))? else {
        debug!(layer = %layer.id, "No bbox; empty collection");
        return empty_collection();
    };

    let filter = AttributeFilter::from_params(layer, params.borrowed_pairs());
    let key = format!(
        "geojson:{}:{}:{}",
        layer.id,
        filter.cache_key(),
        envelope.cache_key()
    );

    let filter = &filter;
    respond_cached(state, key, JSON_CONTENT_TYPE, None, || async move {
        let variant = select_variant(layer, None, state.catalog.policy());
        let query = slice_query(layer, variant, &envelope.in_srid(variant.srid), filter);
        run_feature_query(state, "slice", &query).await
    })
    .await
}

async fn setback(
    state: &AppState,
    endpoint: &str,
    layer: &LayerDescriptor,
    params: &[(String, String)],
) -> MapResult<Response> {
    let config = layer
        .setback
        .as_ref()
        .ok_or_else(|| MapError::Config(format!("layer {} has no setback definition", layer.id)))?;

    // A bad distance is rejected even when the bbox is missing.
    let request = SetbackRequest::from_param(params.param("dist"), config)?;
    let Some(envelope) = Envelope::resolve(params.param("bbox"))? else {
        debug!(endpoint = %endpoint, "No bbox; empty collection");
        return empty_collection();
    };

    let key = format!(
        "setback:{}:{}:{}",
        endpoint,
        request.cache_key(),
        envelope.cache_key()
    );

    let request = &request;
    respond_cached(state, key, JSON_CONTENT_TYPE, None, || async move {
        let variant = &layer.full;
        let query = setback_query(layer, variant, &envelope.in_srid(variant.srid), request)?;
        run_feature_query(state, "setback", &query).await
    })
    .await
}

fn empty_collection() -> MapResult<Response> {
    let body = serde_json::to_vec(&FeatureCollection::new())?;
    Ok(body_response(JSON_CONTENT_TYPE, body, None))
}
