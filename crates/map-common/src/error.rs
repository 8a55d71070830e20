//! Error types for the parcel map services.

use thiserror::Error;

/// Result type alias using MapError.
pub type MapResult<T> = Result<T, MapError>;

/// Primary error type for map operations.
#[derive(Debug, Error)]
pub enum MapError {
    // === Request validation ===
    #[error("Invalid bbox: {0}")]
    InvalidBounds(String),

    #[error("Invalid buffer distance: {0}")]
    InvalidDistance(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Unsupported value for '{param}': {value}")]
    UnsupportedParameter { param: String, value: String },

    #[error("Invalid tile coordinate: {0}")]
    InvalidTile(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    // === Backend ===
    #[error("Spatial query failed: {0}")]
    QueryExecution(String),

    // === External provider ===
    #[error("Upstream provider error: {0}")]
    UpstreamProvider(String),

    #[error("Upstream provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MapError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            MapError::InvalidBounds(_)
            | MapError::InvalidDistance(_)
            | MapError::MissingParameter(_)
            | MapError::UnsupportedParameter { .. }
            | MapError::InvalidTile(_) => 400,

            MapError::LayerNotFound(_) => 404,

            MapError::UpstreamProvider(_) => 502,

            MapError::QueryExecution(_)
            | MapError::ProviderNotConfigured(_)
            | MapError::Config(_) => 500,
        }
    }

    /// Message that is safe to show to a client.
    ///
    /// Validation errors are echoed verbatim. Backend failures are reduced to
    /// a fixed string so SQL text and driver details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            MapError::QueryExecution(_) => "spatial query failed".to_string(),
            MapError::Config(_) => "server misconfiguration".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::QueryExecution(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MapError::InvalidBounds("x".into()).http_status_code(), 400);
        assert_eq!(MapError::InvalidDistance("x".into()).http_status_code(), 400);
        assert_eq!(MapError::LayerNotFound("x".into()).http_status_code(), 404);
        assert_eq!(MapError::QueryExecution("x".into()).http_status_code(), 500);
        assert_eq!(
            MapError::ProviderNotConfigured("x".into()).http_status_code(),
            500
        );
        assert_eq!(MapError::UpstreamProvider("x".into()).http_status_code(), 502);
    }

    #[test]
    fn test_query_errors_are_not_leaked() {
        let err = MapError::QueryExecution("relation \"secret\".\"owner\" does not exist".into());
        assert_eq!(err.public_message(), "spatial query failed");
        assert!(!err.is_client_error());

        let err = MapError::InvalidBounds("west (2) must be less than east (1)".into());
        assert!(err.public_message().contains("west"));
        assert!(err.is_client_error());
    }
}
