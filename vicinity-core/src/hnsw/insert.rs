//! Two-phase insertion: plan against an immutable graph, then apply the plan.
//!
//! Planning runs the greedy descent and per-layer beam searches. Applying
//! writes the new node's neighbour lists, adds reciprocal links, and prunes
//! any neighbour pushed over its degree cap.

use crate::types::{IndexId, Neighbour};

use super::{
    graph::Graph,
    search::{Query, Scratch, SearchBuffers},
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LayerPlan {
    pub(crate) level: usize,
    pub(crate) neighbours: Vec<Neighbour>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct InsertionPlan {
    pub(crate) layers: Vec<LayerPlan>,
}

#[derive(Debug)]
pub(crate) struct InsertionPlanner<'graph, Id> {
    graph: &'graph Graph<Id>,
}

impl<'graph, Id: IndexId> InsertionPlanner<'graph, Id> {
    pub(crate) const fn new(graph: &'graph Graph<Id>) -> Self {
        Self { graph }
    }

    /// Plans the links for a node of `level` without mutating the graph.
    ///
    /// An empty graph yields an empty plan.
    pub(crate) fn plan(&self, query: &Query<'_>, level: usize, scratch: &mut Scratch) -> InsertionPlan {
        let Some(entry) = self.graph.entry() else {
            return InsertionPlan::default();
        };
        let params = self.graph.params();
        let target_level = level.min(entry.level);
        let searcher = self.graph.searcher();
        let Some(mut current) = searcher.descend(query, target_level) else {
            return InsertionPlan::default();
        };

        let mut visited = scratch.take_visited();
        let mut layers = Vec::with_capacity(target_level + 1);
        for layer in (0..=target_level).rev() {
            let found = searcher.search_layer(
                query,
                current,
                layer,
                params.ef_construction(),
                SearchBuffers {
                    visited: &mut visited,
                    results: scratch.take_results(),
                },
            );
            if let Some(nearest) = found.first() {
                current = nearest.id;
            }
            let neighbours = found
                .iter()
                .take(params.max_neighbours(layer))
                .copied()
                .collect();
            scratch.put_results(found);
            layers.push(LayerPlan {
                level: layer,
                neighbours,
            });
        }
        scratch.put_visited(visited);
        InsertionPlan { layers }
    }
}

#[derive(Debug)]
pub(crate) struct InsertionExecutor<'graph, Id> {
    graph: &'graph mut Graph<Id>,
}

impl<'graph, Id: IndexId> InsertionExecutor<'graph, Id> {
    pub(crate) const fn new(graph: &'graph mut Graph<Id>) -> Self {
        Self { graph }
    }

    /// Links `node` according to `plan`.
    pub(crate) fn apply(mut self, node: usize, plan: InsertionPlan) {
        for LayerPlan { level, neighbours } in plan.layers {
            if let Some(list) = self
                .graph
                .node_mut(node)
                .and_then(|slot| slot.neighbours_mut(level))
            {
                list.clear();
                list.extend(neighbours.iter().map(|neighbour| neighbour.id));
            }
            let cap = self.graph.params().max_neighbours(level);
            for neighbour in &neighbours {
                self.link(neighbour.id, node, level, cap);
            }
        }
    }

    fn link(&mut self, from: usize, to: usize, level: usize, cap: usize) {
        let Some(list) = self
            .graph
            .node_mut(from)
            .and_then(|slot| slot.neighbours_mut(level))
        else {
            return;
        };
        if list.contains(&to) {
            return;
        }
        list.push(to);
        if list.len() > cap {
            self.prune(from, level, cap);
        }
    }

    /// Keeps the `cap` neighbours of `from` closest to it on `level`.
    fn prune(&mut self, from: usize, level: usize, cap: usize) {
        let Some(owner) = self.graph.node(from) else {
            return;
        };
        let query = Query {
            vector: &owner.vector,
            norm: owner.norm,
        };
        let mut ranked: Vec<Neighbour> = owner
            .neighbours(level)
            .iter()
            .map(|&id| Neighbour {
                id,
                distance: self.graph.distance(&query, id),
            })
            .collect();
        ranked.sort_unstable();
        ranked.truncate(cap);
        if let Some(list) = self
            .graph
            .node_mut(from)
            .and_then(|slot| slot.neighbours_mut(level))
        {
            list.clear();
            list.extend(ranked.iter().map(|neighbour| neighbour.id));
        }
    }
}
