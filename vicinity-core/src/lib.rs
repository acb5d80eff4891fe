//! Vicinity core library: exact and approximate nearest-neighbour indexes
//! over dense `f32` vectors.
//!
//! [`FlatIndex`] scans every entry and returns exact results.
//! [`HnswIndex`] navigates a layered proximity graph for sub-linear
//! approximate search. Both are safe to share across threads, support
//! filtered and weighted queries, and persist to a compact little-endian
//! binary format.

mod columns;
mod distance;
mod error;
mod flat;
mod hnsw;
mod lock;
mod persist;
mod pool;
mod types;
mod validate;

pub use crate::{
    distance::{Metric, dot, norm, squared_l2},
    error::{IndexError, IndexErrorCode, Result},
    flat::FlatIndex,
    hnsw::{HnswIndex, HnswParams},
    persist::{DefaultIdCodec, FORMAT_VERSION, FnIdCodec, IdCodec, IndexKind, MAGIC, probe},
    types::{IndexId, SearchOptions, SearchResult, WeightedQuery, combine_weighted},
};
