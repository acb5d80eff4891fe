//! Node storage for the HNSW graph.
//!
//! A node owns a copy of its vector and one neighbour list per layer from 0
//! up to its level. Positions in these lists are arena indices.

#[derive(Clone, Debug)]
pub(crate) struct Node<Id> {
    pub(crate) id: Id,
    pub(crate) vector: Vec<f32>,
    /// Cached Euclidean norm; `0` unless the metric needs it.
    pub(crate) norm: f32,
    pub(crate) deleted: bool,
    neighbours: Vec<Vec<usize>>,
}

impl<Id> Node<Id> {
    pub(crate) fn new(id: Id, vector: Vec<f32>, norm: f32, level: usize) -> Self {
        let mut neighbours = Vec::with_capacity(level + 1);
        neighbours.resize_with(level + 1, Vec::new);
        Self {
            id,
            vector,
            norm,
            deleted: false,
            neighbours,
        }
    }

    /// Rebuilds a node from persisted parts; `neighbours` holds one list per
    /// layer.
    pub(crate) fn from_parts(
        id: Id,
        vector: Vec<f32>,
        norm: f32,
        deleted: bool,
        neighbours: Vec<Vec<usize>>,
    ) -> Self {
        Self {
            id,
            vector,
            norm,
            deleted,
            neighbours,
        }
    }

    pub(crate) fn level(&self) -> usize {
        self.neighbours.len().saturating_sub(1)
    }

    /// Neighbours on `level`; empty above the node's level.
    pub(crate) fn neighbours(&self, level: usize) -> &[usize] {
        self.neighbours.get(level).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn neighbours_mut(&mut self, level: usize) -> Option<&mut Vec<usize>> {
        self.neighbours.get_mut(level)
    }

    pub(crate) fn layers(&self) -> &[Vec<usize>] {
        &self.neighbours
    }
}
