//! Command-line and environment configuration.

use clap::Parser;
use std::time::Duration;

use storage::PostgisConfig;

/// Parcel map server
#[derive(Parser, Debug, Clone)]
#[command(name = "map-api")]
#[command(about = "Vector tile and GeoJSON server for parcel, zoning and road layers")]
pub struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "MAP_LISTEN_ADDR")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Number of worker threads
    #[arg(long, env = "MAP_WORKER_THREADS")]
    pub worker_threads: Option<usize>,

    /// PostgreSQL/PostGIS connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = 10, env = "MAP_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    /// Per-statement timeout in milliseconds
    #[arg(long, default_value_t = 10_000, env = "MAP_DB_STATEMENT_TIMEOUT_MS")]
    pub db_statement_timeout_ms: u64,

    /// Layer catalog file
    #[arg(long, default_value = "config/layers.yaml", env = "MAP_LAYERS_CONFIG")]
    pub layers_config: String,

    /// Public base URL used in TileJSON tile templates
    #[arg(long, env = "MAP_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// VWorld API key; geocoding and raster proxying are disabled without it
    #[arg(long, env = "VWORLD_KEY", hide_env_values = true)]
    pub vworld_key: Option<String>,

    /// VWorld API base URL
    #[arg(long, default_value = "https://api.vworld.kr", env = "VWORLD_BASE_URL")]
    pub vworld_base_url: String,

    /// Response cache size in megabytes
    #[arg(long, default_value_t = 256, env = "MAP_CACHE_SIZE_MB")]
    pub cache_size_mb: usize,

    /// TTL for cached tiles and GeoJSON slices, in seconds
    #[arg(long, default_value_t = 600, env = "MAP_TILE_CACHE_TTL_SECS")]
    pub tile_cache_ttl_secs: u64,

    /// TTL for cached raster proxy tiles, in seconds
    #[arg(long, default_value_t = 300, env = "MAP_PROXY_CACHE_TTL_SECS")]
    pub proxy_cache_ttl_secs: u64,
}

impl Args {
    pub fn postgis(&self) -> PostgisConfig {
        PostgisConfig {
            database_url: self.database_url.clone(),
            max_connections: self.db_max_connections,
            statement_timeout: Duration::from_millis(self.db_statement_timeout_ms),
        }
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            size_mb: self.cache_size_mb,
            tile_ttl: Duration::from_secs(self.tile_cache_ttl_secs),
            proxy_ttl: Duration::from_secs(self.proxy_cache_ttl_secs),
        }
    }

    /// The VWorld key, with a blank value treated as unset.
    pub fn vworld_key(&self) -> Option<String> {
        self.vworld_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

/// Response cache sizing and lifetimes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    pub size_mb: usize,
    pub tile_ttl: Duration,
    pub proxy_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            size_mb: 256,
            tile_ttl: Duration::from_secs(600),
            proxy_ttl: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from([
            "map-api",
            "--database-url",
            "postgres://map@localhost/parcels",
        ])
        .unwrap();

        assert_eq!(args.listen, "0.0.0.0:8080");
        assert_eq!(args.layers_config, "config/layers.yaml");
        assert_eq!(args.cache_settings(), CacheSettings::default());

        let pg = args.postgis();
        assert_eq!(pg.max_connections, 10);
        assert_eq!(pg.statement_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_blank_vworld_key_is_unset() {
        let args = Args::try_parse_from([
            "map-api",
            "--database-url",
            "postgres://map@localhost/parcels",
            "--vworld-key",
            "  ",
        ])
        .unwrap();
        assert_eq!(args.vworld_key(), None);
    }
}
