//! Response helpers shared by the handlers.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use map_common::{MapError, MapResult};
use spatial_query::SqlQuery;
use storage::{feature_collection, CachedResponse};

use crate::state::AppState;

pub const MVT_CONTENT_TYPE: &str = "application/x-protobuf";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Marks whether a response came from the response cache.
pub const X_CACHE: &str = "x-cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn header_value(&self) -> HeaderValue {
        match self {
            CacheStatus::Hit => HeaderValue::from_static("HIT"),
            CacheStatus::Miss => HeaderValue::from_static("MISS"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// A [`MapError`] rendered as `{"error": "..."}` with its mapped status.
#[derive(Debug)]
pub struct ApiError(pub MapError);

impl From<MapError> for ApiError {
    fn from(err: MapError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = log_error(&self.0);
        let body = ErrorBody {
            error: self.0.public_message(),
        };
        let json = serde_json::to_vec(&body).unwrap_or_default();

        let mut response = Response::new(Body::from(json));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        response
    }
}

/// Log `err` at a level matching who is at fault and return its status.
pub fn log_error(err: &MapError) -> StatusCode {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if err.is_client_error() {
        warn!(status = status.as_u16(), error = %err, "Request rejected");
    } else {
        error!(status = status.as_u16(), error = %err, "Request failed");
    }
    status
}

/// Tile endpoints answer errors with the mapped status and an empty MVT body.
pub fn tile_error_response(err: &MapError) -> Response {
    let status = log_error(err);
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(MVT_CONTENT_TYPE),
    );
    response
}

/// 200 response with a body, its media type and an optional cache marker.
pub fn body_response(
    content_type: &str,
    body: impl Into<Bytes>,
    cache: Option<CacheStatus>,
) -> Response {
    let mut response = Response::new(Body::from(body.into()));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(status) = cache {
        headers.insert(X_CACHE, status.header_value());
    }
    response
}

pub fn cached_response(cached: CachedResponse, status: CacheStatus) -> Response {
    body_response(&cached.content_type, cached.body, Some(status))
}

/// Serve `key` from the response cache, or produce, store and serve it.
///
/// Failures are returned to the caller and never cached.
pub async fn respond_cached<F, Fut>(
    state: &AppState,
    key: String,
    content_type: &str,
    ttl: Option<Duration>,
    produce: F,
) -> MapResult<Response>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = MapResult<Bytes>>,
{
    if let Some(cached) = state.cache.get(&key).await {
        state.metrics.record_cache_hit();
        debug!(key = %key, "Response cache hit");
        return Ok(cached_response(cached, CacheStatus::Hit));
    }
    state.metrics.record_cache_miss();

    let body = produce().await?;
    state
        .cache
        .put(&key, CachedResponse::new(content_type, body.clone()), ttl)
        .await;
    Ok(body_response(content_type, body, Some(CacheStatus::Miss)))
}

/// Run a tile query through the backend, recording its latency.
pub async fn run_tile_query(state: &AppState, query: &SqlQuery) -> MapResult<Vec<u8>> {
    let start = Instant::now();
    let result = state.backend.fetch_tile(query).await;
    state
        .metrics
        .record_query("tile", start.elapsed(), result.is_ok());
    result
}

/// Run a slice or setback query and encode the FeatureCollection.
pub async fn run_feature_query(
    state: &AppState,
    kind: &'static str,
    query: &SqlQuery,
) -> MapResult<Bytes> {
    let start = Instant::now();
    let result = state.backend.fetch_features(query).await;
    state.metrics.record_query(kind, start.elapsed(), result.is_ok());

    let collection = feature_collection(result?)?;
    Ok(Bytes::from(serde_json::to_vec(&collection)?))
}

/// Lookup helpers over raw query pairs, which may repeat keys.
pub trait QueryPairs {
    /// First value for `key`.
    fn param(&self, key: &str) -> Option<&str>;

    /// Pairs as borrowed strings.
    fn borrowed_pairs(&self) -> Vec<(&str, &str)>;
}

impl QueryPairs for [(String, String)] {
    fn param(&self, key: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn borrowed_pairs(&self) -> Vec<(&str, &str)> {
        self.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// Split `"400.pbf"` into `("400", "pbf")`.
pub fn split_extension(segment: &str) -> Option<(&str, &str)> {
    segment.rsplit_once('.')
}

/// Scheme and authority for absolute URLs, preferring the configured value.
pub fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = configured {
        return url.to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs() {
        let pairs = vec![
            ("jm".to_string(), "08".to_string()),
            ("jm".to_string(), "09".to_string()),
            ("bbox".to_string(), "1,2,3,4".to_string()),
        ];
        assert_eq!(pairs.param("jm"), Some("08"));
        assert_eq!(pairs.param("own"), None);
        assert_eq!(pairs.borrowed_pairs().len(), 3);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("400.pbf"), Some(("400", "pbf")));
        assert_eq!(split_extension("874.png"), Some(("874", "png")));
        assert_eq!(split_extension("400"), None);
    }

    #[test]
    fn test_base_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("maps.example.kr"));
        assert_eq!(base_url(None, &headers), "http://maps.example.kr");
        assert_eq!(
            base_url(Some("https://tiles.example.kr"), &headers),
            "https://tiles.example.kr"
        );
    }

    #[test]
    fn test_query_error_hides_details() {
        let response =
            ApiError(MapError::QueryExecution("relation \"x\" does not exist".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
