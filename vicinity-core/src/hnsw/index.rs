//! Public HNSW index type wrapping the graph in a reader-writer lock.

use std::{
    fmt,
    io::{Read, Write},
    sync::{Arc, Mutex, RwLock},
};

use rand::{RngCore, SeedableRng, rngs::SmallRng};
use tracing::{debug, instrument};

use crate::{
    columns::ColumnNames,
    distance::Metric,
    error::{IndexError, Result},
    lock,
    persist::{self, DefaultIdCodec, IdCodec},
    types::{IndexId, SearchOptions, SearchResult, WeightedQuery, combine_weighted},
    validate::{check_batch, check_vector},
};

use super::{
    graph::Graph,
    insert::{InsertionExecutor, InsertionPlanner},
    node::Node,
    params::HnswParams,
    rng::sample_level,
    search::{Scratch, SearchBuffers},
};

const RESOURCE: &str = "hnsw index";

pub(crate) struct HnswState<Id> {
    pub(crate) graph: Graph<Id>,
    columns: ColumnNames,
    scratch: Mutex<Scratch>,
    rng: Box<dyn RngCore + Send + Sync>,
}

impl<Id: IndexId> HnswState<Id> {
    fn new(dim: usize, params: HnswParams) -> Self {
        let rng = SmallRng::seed_from_u64(params.rng_seed());
        Self {
            graph: Graph::new(dim, params),
            columns: ColumnNames::default(),
            scratch: Mutex::new(Scratch::new()),
            rng: Box::new(rng),
        }
    }

    /// Inserts a validated vector as a fresh node.
    fn insert(&mut self, id: Id, vector: &[f32]) {
        if self.graph.dim() == 0 {
            self.graph.set_dim(vector.len());
        }
        let level = sample_level(self.rng.as_mut(), self.graph.params());
        let query = self.graph.query(vector);
        let scratch = lock::scratch_mut(&mut self.scratch);
        let plan = InsertionPlanner::new(&self.graph).plan(&query, level, scratch);
        let node = Node::new(id, vector.to_vec(), query.norm, level);
        let position = self.graph.push(node);
        InsertionExecutor::new(&mut self.graph).apply(position, plan);
        self.graph.promote_entry(position, level);
    }

    fn replace(&mut self, id: Id, vector: &[f32]) {
        self.graph.tombstone(&id);
        self.insert(id, vector);
    }

    fn search(&self, k: usize, query: &[f32], options: SearchOptions<'_, Id>) -> Vec<SearchResult<Id>> {
        let graph = &self.graph;
        if k == 0 || query.len() != graph.dim() || graph.live_len() == 0 {
            return Vec::new();
        }
        let ef = options
            .ef()
            .unwrap_or_else(|| graph.params().ef_search())
            .max(k);
        let prepared = graph.query(query);
        let searcher = graph.searcher();
        let Some(start) = searcher.descend(&prepared, 0) else {
            return Vec::new();
        };

        let (mut visited, results) = {
            let mut scratch = lock::scratch(&self.scratch);
            (scratch.take_visited(), scratch.take_results())
        };
        let found = searcher.search_layer(
            &prepared,
            start,
            0,
            ef,
            SearchBuffers {
                visited: &mut visited,
                results,
            },
        );
        let hits = found
            .iter()
            .filter_map(|hit| {
                graph
                    .node(hit.id)
                    .filter(|node| !node.deleted && options.accepts(&node.id))
                    .map(|node| SearchResult {
                        id: node.id.clone(),
                        score: hit.distance,
                    })
            })
            .take(k)
            .collect();

        let mut scratch = lock::scratch(&self.scratch);
        scratch.put_visited(visited);
        scratch.put_results(found);
        hits
    }

    fn reset(&mut self, keep_capacity: bool) {
        self.graph.reset(keep_capacity);
        if !keep_capacity {
            lock::scratch_mut(&mut self.scratch).drain();
        }
    }
}

/// Thread-safe approximate nearest-neighbour index backed by a hierarchical
/// navigable small-world graph.
///
/// Deletion is soft: removed entries stay in the graph as tombstones so
/// existing links remain navigable, and are filtered out of results.
///
/// # Examples
/// ```
/// use vicinity_core::{HnswIndex, HnswParams};
///
/// let index = HnswIndex::new(2, HnswParams::default());
/// index.add("a", &[0.0, 0.0]).expect("add a");
/// index.add("b", &[1.0, 0.0]).expect("add b");
/// index.add("c", &[5.0, 5.0]).expect("add c");
///
/// let hits = index.search(1, &[0.1, 0.0]);
/// assert_eq!(hits[0].id, "a");
///
/// assert!(index.delete(&"a").expect("delete a"));
/// assert_eq!(index.len(), 2);
/// assert_eq!(index.node_count(), 3);
/// ```
pub struct HnswIndex<Id> {
    state: RwLock<HnswState<Id>>,
    codec: Arc<dyn IdCodec<Id>>,
}

impl<Id: IndexId> HnswIndex<Id> {
    /// Creates an empty index. `dim == 0` leaves the dimension to be fixed by
    /// the first insert.
    #[must_use]
    pub fn new(dim: usize, params: HnswParams) -> Self {
        Self {
            state: RwLock::new(HnswState::new(dim, params)),
            codec: Arc::new(DefaultIdCodec),
        }
    }

    /// Replaces the codec used by [`HnswIndex::save`] and [`HnswIndex::load`].
    #[must_use]
    pub fn with_id_codec(mut self, codec: impl IdCodec<Id> + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Replaces the level-sampling generator seeded from the parameters.
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        lock::exclusive(&mut self.state).rng = Box::new(rng);
        self
    }

    /// Inserts a new entry.
    ///
    /// # Errors
    /// Returns [`IndexError::IdExists`] when `id` is live,
    /// [`IndexError::EmptyVector`] for an empty vector, and
    /// [`IndexError::DimMismatch`] when the length differs from the index
    /// dimension.
    #[instrument(
        name = "index.hnsw.add",
        err,
        skip(self, vector),
        fields(dim = vector.len()),
    )]
    pub fn add(&self, id: Id, vector: &[f32]) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        if state.graph.position(&id).is_some() {
            return Err(IndexError::id_exists(&id));
        }
        check_vector(state.graph.dim(), vector)?;
        state.insert(id, vector);
        Ok(())
    }

    /// Inserts `id`, tombstoning and re-inserting it when already live.
    ///
    /// # Errors
    /// Returns [`IndexError::EmptyVector`] or [`IndexError::DimMismatch`]
    /// for an invalid vector; the index is unchanged on error.
    #[instrument(
        name = "index.hnsw.upsert",
        err,
        skip(self, vector),
        fields(dim = vector.len()),
    )]
    pub fn upsert(&self, id: Id, vector: &[f32]) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        check_vector(state.graph.dim(), vector)?;
        state.replace(id, vector);
        Ok(())
    }

    /// Upserts every pair, validating the whole batch before writing.
    ///
    /// # Errors
    /// Returns [`IndexError::BatchSizeMismatch`] when the slices differ in
    /// length, or the first vector validation error. The index is unchanged
    /// on error.
    #[instrument(
        name = "index.hnsw.batch_upsert",
        err,
        skip(self, ids, vectors),
        fields(batch = ids.len()),
    )]
    pub fn batch_upsert(&self, ids: &[Id], vectors: &[Vec<f32>]) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        check_batch(state.graph.dim(), ids, vectors)?;
        for (id, vector) in ids.iter().zip(vectors) {
            state.replace(id.clone(), vector);
        }
        Ok(())
    }

    /// Tombstones `id`, returning whether it was live.
    ///
    /// # Errors
    /// Returns [`IndexError::LockPoisoned`] when a writer panicked earlier.
    #[instrument(name = "index.hnsw.delete", err, skip(self))]
    pub fn delete(&self, id: &Id) -> Result<bool> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        Ok(state.graph.tombstone(id))
    }

    /// Removes every node, tombstones included. Dimension, parameters, and
    /// column names are kept.
    ///
    /// # Errors
    /// Returns [`IndexError::LockPoisoned`] when a writer panicked earlier.
    #[instrument(name = "index.hnsw.clear", err, skip(self))]
    pub fn clear(&self, keep_capacity: bool) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        state.reset(keep_capacity);
        Ok(())
    }

    /// Returns a copy of the vector stored for live `id`.
    #[must_use]
    pub fn vector(&self, id: &Id) -> Option<Vec<f32>> {
        let state = lock::read(&self.state);
        state
            .graph
            .position(id)
            .and_then(|position| state.graph.node(position))
            .map(|node| node.vector.clone())
    }

    /// Returns whether `id` is live.
    #[must_use]
    pub fn contains(&self, id: &Id) -> bool {
        lock::read(&self.state).graph.position(id).is_some()
    }

    /// Returns the live ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<Id> {
        lock::read(&self.state).graph.live_ids()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock::read(&self.state).graph.live_len()
    }

    /// Returns `true` when there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of graph nodes, tombstones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        lock::read(&self.state).graph.node_count()
    }

    /// Recorded dimension, `0` while unset.
    #[must_use]
    pub fn dim(&self) -> usize {
        lock::read(&self.state).graph.dim()
    }

    /// Distance metric of the index.
    #[must_use]
    pub fn metric(&self) -> Metric {
        lock::read(&self.state).graph.params().metric()
    }

    /// Returns the active parameters.
    #[must_use]
    pub fn params(&self) -> HnswParams {
        lock::read(&self.state).graph.params().clone()
    }

    /// Returns up to `k` live entries near `query`, closest first.
    ///
    /// An empty list is returned when `k == 0`, the index has no live
    /// entries, or the query length differs from the index dimension.
    #[must_use]
    pub fn search(&self, k: usize, query: &[f32]) -> Vec<SearchResult<Id>> {
        self.search_with_options(k, query, SearchOptions::new())
    }

    /// Like [`HnswIndex::search`] with a beam width override and filter.
    ///
    /// The beam width is `max(ef, k)`, where `ef` defaults to the
    /// parameters' `ef_search`. Filtered ids and tombstones are dropped
    /// after the beam search, so fewer than `k` results may be returned.
    #[must_use]
    pub fn search_with_options(
        &self,
        k: usize,
        query: &[f32],
        options: SearchOptions<'_, Id>,
    ) -> Vec<SearchResult<Id>> {
        lock::read(&self.state).search(k, query, options)
    }

    /// Searches with the normalised weighted combination of `queries`.
    #[must_use]
    pub fn search_weighted(&self, k: usize, queries: &[WeightedQuery]) -> Vec<SearchResult<Id>> {
        self.search_weighted_with_options(k, queries, SearchOptions::new())
    }

    /// Weighted search honouring `options`.
    #[must_use]
    pub fn search_weighted_with_options(
        &self,
        k: usize,
        queries: &[WeightedQuery],
        options: SearchOptions<'_, Id>,
    ) -> Vec<SearchResult<Id>> {
        combine_weighted(queries)
            .map(|query| self.search_with_options(k, &query, options))
            .unwrap_or_default()
    }

    /// Labels each vector component.
    ///
    /// # Errors
    /// Returns [`IndexError::ColumnNamesMismatch`] when `names` is empty or
    /// its length differs from the recorded dimension.
    pub fn set_column_names(&self, names: Vec<String>) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        let current = state.graph.dim();
        let dim = state.columns.assign(current, names)?;
        state.graph.set_dim(dim);
        Ok(())
    }

    /// Returns the configured column names, if any.
    #[must_use]
    pub fn column_names(&self) -> Option<Vec<String>> {
        lock::read(&self.state).columns.to_vec()
    }

    /// Returns the name of column `index`.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidColumnIndex`] when no such column is
    /// named.
    pub fn column_name(&self, index: usize) -> Result<String> {
        lock::read(&self.state).columns.get(index).map(str::to_owned)
    }

    /// Serialises the graph, tombstones included, to `writer`.
    ///
    /// # Errors
    /// Returns codec errors for unsupported ids and [`IndexError::Io`] when
    /// the writer fails.
    #[instrument(name = "index.persist.save", err, skip(self, writer), fields(kind = "hnsw"))]
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let state = lock::read(&self.state);
        persist::hnsw::write(&mut writer, self.codec.as_ref(), &state.graph)?;
        writer.flush()?;
        debug!(
            nodes = state.graph.node_count(),
            live = state.graph.live_len(),
            "hnsw index saved"
        );
        Ok(())
    }

    /// Replaces the graph with one read from `reader`.
    ///
    /// Graph parameters and metric come from the stream; the level cap, RNG,
    /// and pools are kept. The stream is decoded and validated completely
    /// before the swap, so a failed load leaves the index untouched. Column
    /// names are reset.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidFormat`] or
    /// [`IndexError::UnsupportedVersion`] for malformed input.
    #[instrument(name = "index.persist.load", err, skip(self, reader), fields(kind = "hnsw"))]
    pub fn load<R: Read>(&self, mut reader: R) -> Result<()> {
        let params = self.params();
        let graph = persist::hnsw::read(&mut reader, self.codec.as_ref(), &params)?;
        let mut state = lock::write(&self.state, RESOURCE)?;
        state.graph = graph;
        state.columns = ColumnNames::default();
        debug!(
            nodes = state.graph.node_count(),
            live = state.graph.live_len(),
            "hnsw index loaded"
        );
        Ok(())
    }

    /// Builds a new index from `reader` using the default id codec and
    /// default level cap and seed.
    ///
    /// # Errors
    /// As for [`HnswIndex::load`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let index = Self::new(0, HnswParams::default());
        index.load(reader)?;
        Ok(index)
    }

    #[cfg(test)]
    pub(crate) fn with_state<T>(&self, inspect: impl FnOnce(&HnswState<Id>) -> T) -> T {
        inspect(&lock::read(&self.state))
    }
}

#[cfg(test)]
impl<Id: IndexId> HnswState<Id> {
    pub(crate) fn scratch_idle(&self) -> (usize, usize) {
        lock::scratch(&self.scratch).idle()
    }
}

impl<Id: IndexId> fmt::Debug for HnswIndex<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock::read(&self.state);
        f.debug_struct("HnswIndex")
            .field("dim", &state.graph.dim())
            .field("params", state.graph.params())
            .field("len", &state.graph.live_len())
            .field("nodes", &state.graph.node_count())
            .finish_non_exhaustive()
    }
}
