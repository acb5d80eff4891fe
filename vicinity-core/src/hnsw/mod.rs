//! Hierarchical navigable small-world index.
//!
//! The graph is an arena of nodes addressed by stable positions. Insertion
//! samples a level, descends greedily through the upper layers, and links
//! the node on each remaining layer to the nearest candidates of a bounded
//! beam search. Neighbours pushed over their degree cap keep only their
//! closest links. This local pruning is simpler than the diversity-aware
//! selection heuristic and trades some recall on clustered data for cheaper
//! inserts.

mod graph;
mod index;
mod insert;
mod node;
mod params;
mod rng;
mod search;

pub use self::{index::HnswIndex, params::HnswParams};

pub(crate) use self::{graph::Graph, node::Node};

#[cfg(test)]
mod tests;
