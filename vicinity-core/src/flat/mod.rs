//! Exact brute-force index.
//!
//! Entries live in parallel `ids`/`vectors` arrays with an id → position map.
//! Deletion swap-removes the entry and repoints the moved id, so every
//! mutation stays O(1) apart from validation and searches stay a linear scan.

use std::{
    collections::{BinaryHeap, HashMap},
    fmt,
    io::{Read, Write},
    sync::{Arc, Mutex, RwLock},
};

use tracing::{debug, instrument};

use crate::{
    columns::ColumnNames,
    distance::Metric,
    error::{IndexError, Result},
    lock,
    persist::{self, DefaultIdCodec, IdCodec, flat::FlatSnapshot},
    pool::Pool,
    types::{IndexId, Neighbour, SearchOptions, SearchResult, WeightedQuery, combine_weighted},
    validate::{check_batch, check_vector},
};

const RESOURCE: &str = "flat index";

/// Lock-guarded contents of a [`FlatIndex`].
pub(crate) struct FlatState<Id> {
    pub(crate) dim: usize,
    pub(crate) metric: Metric,
    pub(crate) ids: Vec<Id>,
    pub(crate) vectors: Vec<Vec<f32>>,
    positions: HashMap<Id, usize>,
    columns: ColumnNames,
    scratch: Mutex<Pool<Vec<Neighbour>>>,
}

impl<Id: IndexId> FlatState<Id> {
    fn new(dim: usize, metric: Metric) -> Self {
        Self {
            dim,
            metric,
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
            columns: ColumnNames::default(),
            scratch: Mutex::new(Pool::new(Vec::new).with_reset(Vec::clear)),
        }
    }

    fn position(&self, id: &Id) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Writes a validated entry, replacing the vector when `id` is present.
    fn put(&mut self, id: Id, vector: &[f32]) {
        if self.dim == 0 {
            self.dim = vector.len();
        }
        if let Some(slot) = self
            .position(&id)
            .and_then(|position| self.vectors.get_mut(position))
        {
            slot.clear();
            slot.extend_from_slice(vector);
            return;
        }
        self.positions.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        self.vectors.push(vector.to_vec());
    }

    fn remove(&mut self, id: &Id) -> bool {
        let Some(position) = self.positions.remove(id) else {
            return false;
        };
        self.ids.swap_remove(position);
        self.vectors.swap_remove(position);
        if let Some(moved) = self.ids.get(position) {
            self.positions.insert(moved.clone(), position);
        }
        true
    }

    fn rank(&self, k: usize, query: &[f32], options: SearchOptions<'_, Id>) -> Vec<SearchResult<Id>> {
        if k == 0 || self.ids.is_empty() || query.len() != self.dim {
            return Vec::new();
        }
        // The pool guard is released before scanning so concurrent readers and
        // filters that search this index are not serialised behind it.
        let buffer = lock::scratch(&self.scratch).get();
        let mut heap = BinaryHeap::from(buffer);
        for (position, (id, vector)) in self.ids.iter().zip(&self.vectors).enumerate() {
            if !options.accepts(id) {
                continue;
            }
            let candidate = Neighbour {
                id: position,
                distance: self.metric.distance(query, vector),
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }
        let ranked = heap.into_sorted_vec();
        let results = ranked
            .iter()
            .filter_map(|hit| {
                self.ids.get(hit.id).map(|id| SearchResult {
                    id: id.clone(),
                    score: hit.distance,
                })
            })
            .collect();
        lock::scratch(&self.scratch).put(ranked);
        results
    }

    fn reset(&mut self, keep_capacity: bool) {
        if keep_capacity {
            self.ids.clear();
            self.vectors.clear();
            self.positions.clear();
        } else {
            self.ids = Vec::new();
            self.vectors = Vec::new();
            self.positions = HashMap::new();
            lock::scratch_mut(&mut self.scratch).drain();
        }
    }

    fn restore(&mut self, snapshot: FlatSnapshot<Id>) {
        let FlatSnapshot {
            dim,
            metric,
            ids,
            vectors,
        } = snapshot;
        self.positions = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect();
        self.dim = dim;
        self.metric = metric;
        self.ids = ids;
        self.vectors = vectors;
        self.columns = ColumnNames::default();
    }
}

/// Thread-safe exact nearest-neighbour index.
///
/// # Examples
/// ```
/// use vicinity_core::FlatIndex;
///
/// let index = FlatIndex::new(2);
/// index.add("a", &[0.0, 0.0]).expect("add a");
/// index.add("b", &[1.0, 0.0]).expect("add b");
/// index.add("c", &[5.0, 5.0]).expect("add c");
///
/// let hits = index.search(2, &[0.1, 0.0]);
/// let ids: Vec<_> = hits.iter().map(|hit| hit.id).collect();
/// assert_eq!(ids, ["a", "b"]);
/// ```
pub struct FlatIndex<Id> {
    state: RwLock<FlatState<Id>>,
    codec: Arc<dyn IdCodec<Id>>,
}

impl<Id: IndexId> FlatIndex<Id> {
    /// Creates an empty squared-L2 index. `dim == 0` leaves the dimension to
    /// be fixed by the first insert.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self::with_metric(dim, Metric::default())
    }

    /// Creates an empty index using `metric`.
    #[must_use]
    pub fn with_metric(dim: usize, metric: Metric) -> Self {
        Self {
            state: RwLock::new(FlatState::new(dim, metric)),
            codec: Arc::new(DefaultIdCodec),
        }
    }

    /// Replaces the codec used by [`FlatIndex::save`] and [`FlatIndex::load`].
    #[must_use]
    pub fn with_id_codec(mut self, codec: impl IdCodec<Id> + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Inserts a new entry.
    ///
    /// # Errors
    /// Returns [`IndexError::IdExists`] when `id` is present,
    /// [`IndexError::EmptyVector`] for an empty vector, and
    /// [`IndexError::DimMismatch`] when the length differs from the index
    /// dimension.
    #[instrument(
        name = "index.flat.add",
        err,
        skip(self, vector),
        fields(dim = vector.len()),
    )]
    pub fn add(&self, id: Id, vector: &[f32]) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        if state.positions.contains_key(&id) {
            return Err(IndexError::id_exists(&id));
        }
        check_vector(state.dim, vector)?;
        state.put(id, vector);
        Ok(())
    }

    /// Inserts `id` or replaces its vector in place.
    ///
    /// # Errors
    /// Returns [`IndexError::EmptyVector`] or [`IndexError::DimMismatch`]
    /// for an invalid vector.
    #[instrument(
        name = "index.flat.upsert",
        err,
        skip(self, vector),
        fields(dim = vector.len()),
    )]
    pub fn upsert(&self, id: Id, vector: &[f32]) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        check_vector(state.dim, vector)?;
        state.put(id, vector);
        Ok(())
    }

    /// Upserts every pair, validating the whole batch before writing.
    ///
    /// Later occurrences of a repeated id win.
    ///
    /// # Errors
    /// Returns [`IndexError::BatchSizeMismatch`] when the slices differ in
    /// length, or the first vector validation error. The index is unchanged
    /// on error.
    #[instrument(
        name = "index.flat.batch_upsert",
        err,
        skip(self, ids, vectors),
        fields(batch = ids.len()),
    )]
    pub fn batch_upsert(&self, ids: &[Id], vectors: &[Vec<f32>]) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        check_batch(state.dim, ids, vectors)?;
        for (id, vector) in ids.iter().zip(vectors) {
            state.put(id.clone(), vector);
        }
        Ok(())
    }

    /// Removes `id`, returning whether it was present.
    ///
    /// # Errors
    /// Returns [`IndexError::LockPoisoned`] when a writer panicked earlier.
    #[instrument(name = "index.flat.delete", err, skip(self))]
    pub fn delete(&self, id: &Id) -> Result<bool> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        Ok(state.remove(id))
    }

    /// Removes every entry. Dimension, metric, and column names are kept.
    ///
    /// With `keep_capacity` the storage allocations and pooled buffers are
    /// retained for reuse; otherwise they are released.
    ///
    /// # Errors
    /// Returns [`IndexError::LockPoisoned`] when a writer panicked earlier.
    #[instrument(name = "index.flat.clear", err, skip(self))]
    pub fn clear(&self, keep_capacity: bool) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        state.reset(keep_capacity);
        Ok(())
    }

    /// Returns a copy of the vector stored for `id`.
    #[must_use]
    pub fn vector(&self, id: &Id) -> Option<Vec<f32>> {
        let state = lock::read(&self.state);
        state
            .position(id)
            .and_then(|position| state.vectors.get(position).cloned())
    }

    /// Returns whether `id` is stored.
    #[must_use]
    pub fn contains(&self, id: &Id) -> bool {
        lock::read(&self.state).positions.contains_key(id)
    }

    /// Returns the stored ids in storage order.
    #[must_use]
    pub fn ids(&self) -> Vec<Id> {
        lock::read(&self.state).ids.clone()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock::read(&self.state).ids.len()
    }

    /// Returns `true` when no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded dimension, `0` while unset.
    #[must_use]
    pub fn dim(&self) -> usize {
        lock::read(&self.state).dim
    }

    /// Distance metric of the index.
    #[must_use]
    pub fn metric(&self) -> Metric {
        lock::read(&self.state).metric
    }

    /// Returns up to `k` entries nearest to `query`, closest first.
    ///
    /// Ties are ordered by storage position. An empty list is returned when
    /// `k == 0`, the index is empty, or the query length differs from the
    /// index dimension.
    #[must_use]
    pub fn search(&self, k: usize, query: &[f32]) -> Vec<SearchResult<Id>> {
        self.search_with_options(k, query, SearchOptions::new())
    }

    /// Like [`FlatIndex::search`], skipping ids rejected by the filter
    /// before ranking. The `ef` option is ignored.
    #[must_use]
    pub fn search_with_options(
        &self,
        k: usize,
        query: &[f32],
        options: SearchOptions<'_, Id>,
    ) -> Vec<SearchResult<Id>> {
        lock::read(&self.state).rank(k, query, options)
    }

    /// Searches with the normalised weighted combination of `queries`.
    ///
    /// See [`combine_weighted`] for how components are merged.
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
    /// When the dimension is unset it becomes `names.len()`.
    ///
    /// # Errors
    /// Returns [`IndexError::ColumnNamesMismatch`] when `names` is empty or
    /// its length differs from the recorded dimension.
    pub fn set_column_names(&self, names: Vec<String>) -> Result<()> {
        let mut state = lock::write(&self.state, RESOURCE)?;
        let current = state.dim;
        state.dim = state.columns.assign(current, names)?;
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

    /// Serialises the index to `writer`.
    ///
    /// # Errors
    /// Returns codec errors for unsupported ids and [`IndexError::Io`] when
    /// the writer fails.
    #[instrument(name = "index.persist.save", err, skip(self, writer), fields(kind = "flat"))]
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let state = lock::read(&self.state);
        persist::flat::write(&mut writer, self.codec.as_ref(), &state)?;
        writer.flush()?;
        debug!(entries = state.ids.len(), dim = state.dim, "flat index saved");
        Ok(())
    }

    /// Replaces the contents with an index read from `reader`.
    ///
    /// The stream is decoded completely before the state is swapped, so a
    /// failed load leaves the index untouched. Column names are reset.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidFormat`] or
    /// [`IndexError::UnsupportedVersion`] for malformed input.
    #[instrument(name = "index.persist.load", err, skip(self, reader), fields(kind = "flat"))]
    pub fn load<R: Read>(&self, mut reader: R) -> Result<()> {
        let snapshot = persist::flat::read(&mut reader, self.codec.as_ref())?;
        let mut state = lock::write(&self.state, RESOURCE)?;
        state.restore(snapshot);
        debug!(entries = state.ids.len(), dim = state.dim, "flat index loaded");
        Ok(())
    }

    /// Builds a new index from `reader` using the default id codec.
    ///
    /// # Errors
    /// As for [`FlatIndex::load`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let index = Self::new(0);
        index.load(reader)?;
        Ok(index)
    }
}

impl<Id: IndexId> Default for FlatIndex<Id> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<Id: IndexId> fmt::Debug for FlatIndex<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock::read(&self.state);
        f.debug_struct("FlatIndex")
            .field("dim", &state.dim)
            .field("metric", &state.metric)
            .field("len", &state.ids.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
