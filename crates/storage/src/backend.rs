//! Query execution trait.

use async_trait::async_trait;

use map_common::MapResult;
use spatial_query::SqlQuery;

use crate::features::FeatureRow;

/// Executes assembled spatial queries.
///
/// Implementations run each query exactly once; a failure is reported as
/// [`map_common::MapError::QueryExecution`] and never retried.
#[async_trait]
pub trait SpatialBackend: Send + Sync {
    /// Run a tile query and return the encoded MVT bytes.
    ///
    /// A query that matches nothing yields an empty buffer, which is a valid
    /// empty tile.
    async fn fetch_tile(&self, query: &SqlQuery) -> MapResult<Vec<u8>>;

    /// Run a slice or setback query.
    async fn fetch_features(&self, query: &SqlQuery) -> MapResult<Vec<FeatureRow>>;

    /// Check that the database answers.
    async fn ping(&self) -> MapResult<()>;
}
