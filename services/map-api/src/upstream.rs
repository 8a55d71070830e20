//! VWorld geocoding and WMTS client.
//!
//! The API key is part of the WMTS URL path, so error messages from this
//! module never carry request URLs.

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use map_common::{MapError, MapResult};

use crate::metrics::MapMetrics;

pub const DEFAULT_VWORLD_BASE_URL: &str = "https://api.vworld.kr";

const GEOCODE_TIMEOUT: Duration = Duration::from_secs(5);
const WMTS_TIMEOUT: Duration = Duration::from_secs(6);

/// Raster layers offered by the VWorld WMTS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WmtsLayer {
    Base,
    Satellite,
    Hybrid,
}

impl WmtsLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            WmtsLayer::Base => "Base",
            WmtsLayer::Satellite => "Satellite",
            WmtsLayer::Hybrid => "Hybrid",
        }
    }
}

impl FromStr for WmtsLayer {
    type Err = MapError;

    fn from_str(s: &str) -> MapResult<Self> {
        match s {
            "Base" => Ok(WmtsLayer::Base),
            "Satellite" => Ok(WmtsLayer::Satellite),
            "Hybrid" => Ok(WmtsLayer::Hybrid),
            other => Err(MapError::UnsupportedParameter {
                param: "layer".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for WmtsLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raster encodings accepted on the proxy route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for RasterFormat {
    type Err = MapError;

    fn from_str(s: &str) -> MapResult<Self> {
        match s {
            "png" => Ok(RasterFormat::Png),
            "jpeg" => Ok(RasterFormat::Jpeg),
            other => Err(MapError::UnsupportedParameter {
                param: "ext".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// A raster tile as returned by the provider, passed through untouched.
#[derive(Debug, Clone)]
pub struct UpstreamTile {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct VworldClient {
    http: Client,
    base_url: String,
    key: Option<String>,
    metrics: MapMetrics,
}

impl VworldClient {
    pub fn new(base_url: impl Into<String>, key: Option<String>, metrics: MapMetrics) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
            metrics,
        })
    }

    /// The configured API key.
    pub fn key(&self) -> MapResult<&str> {
        self.key
            .as_deref()
            .ok_or_else(|| MapError::ProviderNotConfigured("VWORLD_KEY is not set".to_string()))
    }

    /// Resolve an address through the VWorld address API.
    pub async fn geocode(&self, address: &str, address_type: &str) -> MapResult<Value> {
        let key = self.key()?;
        let url = format!("{}/req/address", self.base_url);

        let start = Instant::now();
        let result = async {
            self.http
                .get(&url)
                .query(&[
                    ("service", "address"),
                    ("request", "getCoord"),
                    ("version", "2.0"),
                    ("crs", "EPSG:4326"),
                    ("format", "json"),
                    ("type", address_type),
                    ("address", address),
                    ("key", key),
                ])
                .timeout(GEOCODE_TIMEOUT)
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        }
        .await;
        self.metrics.record_upstream_duration("geocode", start.elapsed());

        result.map_err(|e| {
            let e = e.without_url();
            warn!(error = %e, "Geocode request failed");
            MapError::UpstreamProvider(e.to_string())
        })
    }

    /// Fetch one WMTS raster tile. Any HTTP status is passed through.
    pub async fn wmts_tile(
        &self,
        layer: WmtsLayer,
        z: u32,
        y: u32,
        x: u32,
        format: RasterFormat,
    ) -> MapResult<UpstreamTile> {
        let key = self.key()?;
        let url = format!(
            "{}/req/wmts/1.0.0/{}/{}/{}/{}/{}.{}",
            self.base_url,
            key,
            layer,
            z,
            y,
            x,
            format.extension()
        );

        let start = Instant::now();
        let result = async {
            let response = self.http.get(&url).timeout(WMTS_TIMEOUT).send().await?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(format.mime_type())
                .to_string();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(UpstreamTile {
                status,
                content_type,
                body,
            })
        }
        .await;
        self.metrics.record_upstream_duration("wmts", start.elapsed());

        match result {
            Ok(tile) => {
                debug!(
                    layer = %layer,
                    z = z,
                    status = tile.status,
                    bytes = tile.body.len(),
                    "WMTS tile fetched"
                );
                Ok(tile)
            }
            Err(e) => {
                let e = e.without_url();
                warn!(layer = %layer, z = z, error = %e, "WMTS request failed");
                Err(MapError::UpstreamProvider(e.to_string()))
            }
        }
    }
}
