//! Application state shared by all handlers.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use storage::{PostgisStore, ResponseCache, SpatialBackend};

use crate::config::{Args, CacheSettings};
use crate::layer_config::LayerCatalog;
use crate::metrics::MapMetrics;
use crate::upstream::VworldClient;

pub struct AppState {
    pub backend: Arc<dyn SpatialBackend>,
    pub catalog: LayerCatalog,
    pub cache: ResponseCache,
    pub vworld: VworldClient,
    pub metrics: MapMetrics,

    /// Base URL for TileJSON tile templates; derived from `Host` when unset.
    pub public_url: Option<String>,

    pub proxy_ttl: Duration,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn SpatialBackend>,
        catalog: LayerCatalog,
        vworld: VworldClient,
        metrics: MapMetrics,
        public_url: Option<String>,
        cache: CacheSettings,
    ) -> Self {
        Self {
            backend,
            catalog,
            cache: ResponseCache::new(cache.size_mb, cache.tile_ttl),
            vworld,
            metrics,
            public_url: public_url.map(|u| u.trim_end_matches('/').to_string()),
            proxy_ttl: cache.proxy_ttl,
        }
    }

    /// Load the catalog, connect to PostGIS and build the provider client.
    pub async fn from_args(args: &Args) -> Result<Self> {
        let catalog = LayerCatalog::load_from_file(&args.layers_config)?;

        let store = PostgisStore::connect(&args.postgis())
            .await
            .context("Failed to connect to PostGIS")?;

        let metrics = MapMetrics::new();
        let vworld_key = args.vworld_key();
        if vworld_key.is_none() {
            info!("VWORLD_KEY not set; geocoding and raster proxy will answer 500");
        }
        let vworld = VworldClient::new(&args.vworld_base_url, vworld_key, metrics.clone())?;

        Ok(Self::new(
            Arc::new(store),
            catalog,
            vworld,
            metrics,
            args.public_url.clone(),
            args.cache_settings(),
        ))
    }
}
