//! Query assembly for map layers.
//!
//! Everything in this crate is pure: given a layer descriptor, a viewport
//! and the request's attribute filter it produces a [`SqlQuery`] (SQL text
//! plus a typed bind list). Executing the query is the job of the
//! `storage` crate.
//!
//! - [`selector`] picks the simplified or full-detail table for a zoom level
//! - [`filter`] normalises repeated `jm=` / `own=` parameters
//! - [`slice`] builds GeoJSON viewport queries
//! - [`tile`] builds `ST_AsMVT` queries for one z/x/y tile
//! - [`setback`] builds per-feature buffer queries

pub mod filter;
pub mod selector;
pub mod setback;
pub mod slice;
pub mod sql;
pub mod tile;

pub use filter::AttributeFilter;
pub use selector::{select_variant, ResolutionPolicy, DEFAULT_SIMPLIFIED_MAX_ZOOM};
pub use setback::{setback_query, SetbackRequest};
pub use slice::slice_query;
pub use sql::{BindValue, QueryBuilder, SqlQuery};
pub use tile::tile_query;
