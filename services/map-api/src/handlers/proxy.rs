//! VWorld geocoding and raster tile proxy handlers.

use axum::{
    body::Body,
    extract::{Extension, Path, Query},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use map_common::{MapError, MapResult};
use storage::CachedResponse;

use super::common::{split_extension, ApiError, CacheStatus, QueryPairs, X_CACHE};
use crate::state::AppState;
use crate::upstream::{RasterFormat, UpstreamTile, WmtsLayer};

const DEFAULT_ADDRESS_TYPE: &str = "ROAD";

/// GET /api/geocode/?q=...&type=ROAD|PARCEL
pub async fn geocode_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    state.metrics.record_request("geocode");

    // Key first, so an unconfigured server answers 500 regardless of input.
    state.vworld.key()?;

    let address = params
        .param("q")
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| MapError::MissingParameter("q".to_string()))?;
    let address_type = params
        .param("type")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_ADDRESS_TYPE);

    debug!(address_type = %address_type, "Geocoding address");
    let body = state.vworld.geocode(address, address_type).await?;
    Ok(Json(body))
}

/// GET /vwtiles/:layer/:z/:y/:x.{png|jpeg}
pub async fn vwtiles_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((layer, z, y, x)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    state.metrics.record_request("vwtiles");
    state.vworld.key()?;

    let (layer, z, y, x, format) = parse_raster_path(&layer, &z, &y, &x)?;
    let key = format!("vw:{}:{}/{}/{}.{}", layer, z, y, x, format.extension());

    if let Some(cached) = state.cache.get(&key).await {
        state.metrics.record_cache_hit();
        return Ok(raster_response(
            StatusCode::OK,
            &cached.content_type,
            cached.body,
            CacheStatus::Hit,
        ));
    }
    state.metrics.record_cache_miss();

    let UpstreamTile {
        status,
        content_type,
        body,
    } = state.vworld.wmts_tile(layer, z, y, x, format).await?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);

    // Only successful provider answers are kept.
    if status.is_success() {
        state
            .cache
            .put(
                &key,
                CachedResponse::new(content_type.clone(), body.clone()),
                Some(state.proxy_ttl),
            )
            .await;
    }

    Ok(raster_response(status, &content_type, body, CacheStatus::Miss))
}

/// Validate the raster path against the layer and format whitelists.
pub fn parse_raster_path(
    layer: &str,
    z: &str,
    y: &str,
    x: &str,
) -> MapResult<(WmtsLayer, u32, u32, u32, RasterFormat)> {
    let layer: WmtsLayer = layer.parse()?;
    let (x, ext) = split_extension(x).ok_or_else(|| MapError::UnsupportedParameter {
        param: "ext".to_string(),
        value: String::new(),
    })?;
    let format: RasterFormat = ext.parse()?;

    let index = |name: &str, value: &str| {
        value
            .parse::<u32>()
            .map_err(|_| MapError::InvalidTile(format!("{} '{}' is not a tile index", name, value)))
    };
    Ok((layer, index("z", z)?, index("y", y)?, index("x", x)?, format))
}

fn raster_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Body>,
    cache: CacheStatus,
) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=300"),
    );
    headers.insert(X_CACHE, cache.header_value());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raster_path() {
        let (layer, z, y, x, format) =
            parse_raster_path("Satellite", "14", "6413", "13980.jpeg").unwrap();
        assert_eq!(layer, WmtsLayer::Satellite);
        assert_eq!((z, y, x), (14, 6413, 13980));
        assert_eq!(format, RasterFormat::Jpeg);
    }

    #[test]
    fn test_parse_raster_path_rejects() {
        assert!(matches!(
            parse_raster_path("Midnight", "14", "6413", "13980.png"),
            Err(MapError::UnsupportedParameter { .. })
        ));
        assert!(matches!(
            parse_raster_path("Base", "14", "6413", "13980.gif"),
            Err(MapError::UnsupportedParameter { .. })
        ));
        assert!(matches!(
            parse_raster_path("Base", "14", "6413", "13980"),
            Err(MapError::UnsupportedParameter { .. })
        ));
        assert!(matches!(
            parse_raster_path("Base", "fourteen", "6413", "13980.png"),
            Err(MapError::InvalidTile(_))
        ));
    }
}
