//! Layer search routines for the HNSW graph.
//!
//! Greedy descent moves to the single best neighbour until no neighbour is
//! closer. The best-first layer search keeps a min-heap of candidates to
//! expand and a bounded max-heap of the `ef` closest nodes seen so far.

use std::collections::BinaryHeap;

use crate::{
    distance::{Metric, norm},
    pool::{Pool, VisitedSet},
    types::{IndexId, Neighbour, ReverseNeighbour},
};

use super::graph::Graph;

/// Query vector with its norm pre-computed when the metric needs it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Query<'q> {
    pub(crate) vector: &'q [f32],
    pub(crate) norm: f32,
}

impl<'q> Query<'q> {
    pub(crate) fn new(metric: Metric, vector: &'q [f32]) -> Self {
        let norm = if metric.uses_norm() { norm(vector) } else { 0.0 };
        Self { vector, norm }
    }
}

/// Reusable buffers for a single layer search.
#[derive(Debug)]
pub(crate) struct SearchBuffers<'b> {
    pub(crate) visited: &'b mut VisitedSet,
    pub(crate) results: Vec<Neighbour>,
}

#[derive(Debug)]
pub(crate) struct LayerSearcher<'graph, Id> {
    graph: &'graph Graph<Id>,
}

impl<'graph, Id: IndexId> LayerSearcher<'graph, Id> {
    pub(crate) const fn new(graph: &'graph Graph<Id>) -> Self {
        Self { graph }
    }

    /// Walks `level` from `entry`, always moving to the closest neighbour
    /// that improves on the current distance.
    pub(crate) fn greedy_search_layer(&self, query: &Query<'_>, entry: usize, level: usize) -> usize {
        let mut current = entry;
        let mut current_dist = self.graph.distance(query, current);
        loop {
            let Some(node) = self.graph.node(current) else {
                return current;
            };
            let best = node
                .neighbours(level)
                .iter()
                .map(|&candidate| Neighbour {
                    id: candidate,
                    distance: self.graph.distance(query, candidate),
                })
                .min();
            match best {
                Some(next) if next.distance < current_dist => {
                    current = next.id;
                    current_dist = next.distance;
                }
                _ => return current,
            }
        }
    }

    /// Descends greedily from the entry point down to `target_level + 1`,
    /// returning the node the layer search should start from.
    pub(crate) fn descend(&self, query: &Query<'_>, target_level: usize) -> Option<usize> {
        let entry = self.graph.entry()?;
        let mut current = entry.node;
        for level in ((target_level + 1)..=entry.level).rev() {
            current = self.greedy_search_layer(query, current, level);
        }
        Some(current)
    }

    /// Best-first search of `level` with beam width `ef`.
    ///
    /// Returns up to `ef` nodes sorted nearest first. The result vector is
    /// built in `buffers.results` so pooled allocations are reused.
    pub(crate) fn search_layer(
        &self,
        query: &Query<'_>,
        entry: usize,
        level: usize,
        ef: usize,
        buffers: SearchBuffers<'_>,
    ) -> Vec<Neighbour> {
        let SearchBuffers { visited, results } = buffers;
        let width = ef.max(1);
        visited.clear();
        visited.ensure_capacity(self.graph.node_count());
        visited.insert(entry);

        let entry_dist = self.graph.distance(query, entry);
        let mut candidates = BinaryHeap::new();
        candidates.push(ReverseNeighbour::new(entry, entry_dist));
        let mut best = BinaryHeap::from(results);
        best.push(Neighbour {
            id: entry,
            distance: entry_dist,
        });

        while let Some(ReverseNeighbour { inner }) = candidates.pop() {
            let saturated = best.len() >= width;
            if saturated
                && best
                    .peek()
                    .is_some_and(|furthest| inner.distance > furthest.distance)
            {
                break;
            }
            let Some(node) = self.graph.node(inner.id) else {
                continue;
            };
            for &candidate in node.neighbours(level) {
                if !visited.insert(candidate) {
                    continue;
                }
                let distance = self.graph.distance(query, candidate);
                let admits = best.len() < width
                    || best
                        .peek()
                        .is_some_and(|furthest| distance < furthest.distance);
                if !admits {
                    continue;
                }
                candidates.push(ReverseNeighbour::new(candidate, distance));
                best.push(Neighbour {
                    id: candidate,
                    distance,
                });
                if best.len() > width {
                    best.pop();
                }
            }
        }
        best.into_sorted_vec()
    }
}

/// Pooled buffers shared by searches and insertions on one index.
#[derive(Debug)]
pub(crate) struct Scratch {
    visited: Pool<VisitedSet>,
    results: Pool<Vec<Neighbour>>,
}

impl Scratch {
    pub(crate) fn new() -> Self {
        Self {
            visited: Pool::new(VisitedSet::default),
            results: Pool::new(Vec::new).with_reset(Vec::clear),
        }
    }

    pub(crate) fn take_visited(&mut self) -> VisitedSet {
        self.visited.get()
    }

    pub(crate) fn put_visited(&mut self, visited: VisitedSet) {
        self.visited.put(visited);
    }

    pub(crate) fn take_results(&mut self) -> Vec<Neighbour> {
        self.results.get()
    }

    pub(crate) fn put_results(&mut self, results: Vec<Neighbour>) {
        self.results.put(results);
    }

    pub(crate) fn drain(&mut self) {
        self.visited.drain();
        self.results.drain();
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> (usize, usize) {
        (self.visited.idle(), self.results.idle())
    }
}
