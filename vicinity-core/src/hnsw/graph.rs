//! Arena-backed graph representation for the HNSW index.
//!
//! Nodes are addressed by their position in the arena and never move;
//! deletion only sets a tombstone. The id map covers live nodes only.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    error::{IndexError, Result},
    types::IndexId,
};

use super::{
    node::Node,
    params::HnswParams,
    search::{LayerSearcher, Query},
};

/// Entry point into the hierarchy: the node and the graph's top layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EntryPoint {
    pub(crate) node: usize,
    pub(crate) level: usize,
}

#[derive(Debug)]
pub(crate) struct Graph<Id> {
    params: HnswParams,
    dim: usize,
    nodes: Vec<Node<Id>>,
    positions: HashMap<Id, usize>,
    entry: Option<EntryPoint>,
}

impl<Id: IndexId> Graph<Id> {
    pub(crate) fn new(dim: usize, params: HnswParams) -> Self {
        Self {
            params,
            dim,
            nodes: Vec::new(),
            positions: HashMap::new(),
            entry: None,
        }
    }

    /// Rebuilds a graph from decoded parts, checking the structural
    /// invariants a saved index must satisfy.
    pub(crate) fn from_parts(
        dim: usize,
        params: HnswParams,
        nodes: Vec<Node<Id>>,
        entry: Option<usize>,
        max_level: usize,
    ) -> Result<Self> {
        let count = nodes.len();
        let entry_point = match entry {
            None if count == 0 => {
                if max_level != 0 {
                    return Err(IndexError::invalid_format(format!(
                        "empty graph declares max level {max_level}"
                    )));
                }
                None
            }
            None => {
                return Err(IndexError::invalid_format(format!(
                    "graph with {count} nodes has no entry point"
                )));
            }
            Some(node) => {
                let level = nodes.get(node).map(Node::level).ok_or_else(|| {
                    IndexError::invalid_format(format!(
                        "entry point {node} is out of range for {count} nodes"
                    ))
                })?;
                if level != max_level {
                    return Err(IndexError::invalid_format(format!(
                        "entry point level {level} differs from max level {max_level}"
                    )));
                }
                Some(EntryPoint { node, level })
            }
        };

        let mut positions = HashMap::with_capacity(count);
        for (position, node) in nodes.iter().enumerate() {
            if node.vector.len() != dim {
                return Err(IndexError::invalid_format(format!(
                    "node {position} has {} components, expected {dim}",
                    node.vector.len()
                )));
            }
            if let Some(&neighbour) = node
                .layers()
                .iter()
                .flatten()
                .find(|&&neighbour| neighbour >= count)
            {
                return Err(IndexError::invalid_format(format!(
                    "node {position} links to {neighbour}, outside {count} nodes"
                )));
            }
            if !node.deleted && positions.insert(node.id.clone(), position).is_some() {
                return Err(IndexError::invalid_format(format!(
                    "live id {:?} appears more than once",
                    node.id
                )));
            }
        }

        Ok(Self {
            params,
            dim,
            nodes,
            positions,
            entry: entry_point,
        })
    }

    pub(crate) const fn params(&self) -> &HnswParams {
        &self.params
    }

    pub(crate) const fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) const fn set_dim(&mut self, dim: usize) {
        self.dim = dim;
    }

    pub(crate) const fn entry(&self) -> Option<EntryPoint> {
        self.entry
    }

    pub(crate) fn max_level(&self) -> usize {
        self.entry.map_or(0, |entry| entry.level)
    }

    pub(crate) fn node(&self, position: usize) -> Option<&Node<Id>> {
        self.nodes.get(position)
    }

    pub(crate) fn node_mut(&mut self, position: usize) -> Option<&mut Node<Id>> {
        self.nodes.get_mut(position)
    }

    pub(crate) fn nodes(&self) -> &[Node<Id>] {
        &self.nodes
    }

    pub(crate) fn position(&self, id: &Id) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub(crate) fn live_len(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn live_ids(&self) -> Vec<Id> {
        self.nodes
            .iter()
            .filter(|node| !node.deleted)
            .map(|node| node.id.clone())
            .collect()
    }

    pub(crate) fn query<'q>(&self, vector: &'q [f32]) -> Query<'q> {
        Query::new(self.params.metric(), vector)
    }

    /// Distance from `query` to the node at `position`; infinite when the
    /// position is unknown.
    pub(crate) fn distance(&self, query: &Query<'_>, position: usize) -> f32 {
        self.nodes.get(position).map_or(f32::INFINITY, |node| {
            self.params.metric().distance_with_norms(
                query.vector,
                query.norm,
                &node.vector,
                node.norm,
            )
        })
    }

    pub(crate) fn searcher(&self) -> LayerSearcher<'_, Id> {
        LayerSearcher::new(self)
    }

    /// Appends a node and registers its id, returning its position.
    pub(crate) fn push(&mut self, node: Node<Id>) -> usize {
        let position = self.nodes.len();
        self.positions.insert(node.id.clone(), position);
        self.nodes.push(node);
        position
    }

    /// Marks the live node for `id` as deleted, returning whether one
    /// existed.
    pub(crate) fn tombstone(&mut self, id: &Id) -> bool {
        let Some(position) = self.positions.remove(id) else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(position) {
            node.deleted = true;
        }
        true
    }

    /// Makes `node` the entry point when the graph is empty or `level`
    /// exceeds the current top layer.
    pub(crate) fn promote_entry(&mut self, node: usize, level: usize) {
        match self.entry {
            None => self.entry = Some(EntryPoint { node, level }),
            Some(current) if level > current.level => {
                debug!(
                    node,
                    level,
                    previous = current.level,
                    "promoting hnsw entry point"
                );
                self.entry = Some(EntryPoint { node, level });
            }
            Some(_) => {}
        }
    }

    pub(crate) fn reset(&mut self, keep_capacity: bool) {
        if keep_capacity {
            self.nodes.clear();
            self.positions.clear();
        } else {
            self.nodes = Vec::new();
            self.positions = HashMap::new();
        }
        self.entry = None;
    }
}

#[cfg(test)]
impl<Id: IndexId> Graph<Id> {
    /// Asserts the invariants every mutation must preserve.
    pub(crate) fn assert_invariants(&self) {
        let count = self.nodes.len();
        assert_eq!(self.entry.is_none(), count == 0, "entry set iff nodes exist");
        if let Some(entry) = self.entry {
            let top = self
                .nodes
                .iter()
                .map(Node::level)
                .max()
                .unwrap_or_default();
            assert_eq!(entry.level, top, "entry sits on the highest layer");
            assert_eq!(self.nodes[entry.node].level(), entry.level);
        }
        for (position, node) in self.nodes.iter().enumerate() {
            for (level, layer) in node.layers().iter().enumerate() {
                assert!(
                    layer.len() <= self.params.max_neighbours(level),
                    "node {position} exceeds degree cap on layer {level}"
                );
                for &neighbour in layer {
                    assert_ne!(neighbour, position, "self loop on node {position}");
                    assert!(neighbour < count, "dangling link from {position}");
                    assert!(
                        self.nodes[neighbour].level() >= level,
                        "link from {position} to {neighbour} above its level"
                    );
                }
            }
        }
        let live = self.nodes.iter().filter(|node| !node.deleted).count();
        assert_eq!(live, self.positions.len(), "id map covers live nodes");
    }
}
