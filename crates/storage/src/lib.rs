//! Storage for the parcel map services.
//!
//! Provides:
//! - [`SpatialBackend`], the seam between HTTP handlers and the database
//! - [`PostgisStore`], the PostgreSQL/PostGIS implementation on `sqlx`
//! - [`ResponseCache`], an in-memory LRU for encoded tiles and slices

pub mod backend;
pub mod features;
pub mod postgres;
pub mod response_cache;

pub use backend::SpatialBackend;
pub use features::{feature_collection, FeatureRow};
pub use postgres::{PostgisConfig, PostgisStore};
pub use response_cache::{CacheStats, CachedResponse, ResponseCache};
