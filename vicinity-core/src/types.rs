//! Result, query, and search-option types shared by both index kinds.

use std::{cmp::Ordering, fmt, hash::Hash};

/// Bounds every index identifier type must satisfy.
///
/// Implemented automatically for any comparable, hashable, thread-safe type.
pub trait IndexId: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> IndexId for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// A ranked match returned by a search.
///
/// # Examples
/// ```
/// use vicinity_core::SearchResult;
///
/// let hit = SearchResult { id: "a", score: 0.25 };
/// assert_eq!(hit.id, "a");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult<Id> {
    /// Identifier of the matched entry.
    pub id: Id,
    /// Distance between the query and the entry; lower is closer.
    pub score: f32,
}

/// One weighted component of a multi-vector query.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedQuery {
    /// Contribution of this component; negative weights push results away.
    pub weight: f32,
    /// Query vector for this component.
    pub vector: Vec<f32>,
}

impl WeightedQuery {
    /// Creates a weighted query component.
    #[must_use]
    pub fn new(weight: f32, vector: impl Into<Vec<f32>>) -> Self {
        Self {
            weight,
            vector: vector.into(),
        }
    }
}

/// Combines weighted queries into a single vector.
///
/// The weighted elementwise sum is divided by the total absolute weight so
/// the result does not depend on the overall weight scale. Returns `None`
/// when there are no queries, their lengths disagree, or every weight is
/// zero.
///
/// # Examples
/// ```
/// use vicinity_core::{WeightedQuery, combine_weighted};
///
/// let combined = combine_weighted(&[
///     WeightedQuery::new(1.0, vec![1.0, 0.0]),
///     WeightedQuery::new(3.0, vec![0.0, 1.0]),
/// ])
/// .expect("queries are compatible");
/// assert_eq!(combined, vec![0.25, 0.75]);
/// ```
#[must_use]
#[expect(clippy::float_arithmetic, reason = "weighted sum of float vectors")]
pub fn combine_weighted(queries: &[WeightedQuery]) -> Option<Vec<f32>> {
    let dim = queries.first()?.vector.len();
    if dim == 0 || queries.iter().any(|query| query.vector.len() != dim) {
        return None;
    }
    let total: f32 = queries.iter().map(|query| query.weight.abs()).sum();
    if total == 0.0 || !total.is_finite() {
        return None;
    }
    let mut combined = vec![0.0f32; dim];
    for query in queries {
        for (slot, &value) in combined.iter_mut().zip(&query.vector) {
            *slot += query.weight * value;
        }
    }
    for slot in &mut combined {
        *slot /= total;
    }
    Some(combined)
}

/// Per-call search tuning.
///
/// # Examples
/// ```
/// use vicinity_core::SearchOptions;
///
/// let skip_a = |id: &&str| *id != "a";
/// let options = SearchOptions::new().with_ef(32).with_filter(&skip_a);
/// assert_eq!(options.ef(), Some(32));
/// assert!(!options.accepts(&"a"));
/// ```
pub struct SearchOptions<'a, Id> {
    ef: Option<usize>,
    filter: Option<&'a dyn Fn(&Id) -> bool>,
}

impl<'a, Id> SearchOptions<'a, Id> {
    /// Creates options with no overrides.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ef: None,
            filter: None,
        }
    }

    /// Overrides the beam width for this call. Ignored by the Flat index.
    #[must_use]
    pub const fn with_ef(mut self, ef: usize) -> Self {
        self.ef = Some(ef);
        self
    }

    /// Excludes every id for which `filter` returns `false`.
    #[must_use]
    pub const fn with_filter(mut self, filter: &'a dyn Fn(&Id) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Returns the beam width override, if any.
    #[must_use]
    pub const fn ef(&self) -> Option<usize> {
        self.ef
    }

    /// Returns whether `id` passes the configured filter.
    #[must_use]
    pub fn accepts(&self, id: &Id) -> bool {
        self.filter.is_none_or(|filter| filter(id))
    }
}

impl<Id> Default for SearchOptions<'_, Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> Clone for SearchOptions<'_, Id> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Id> Copy for SearchOptions<'_, Id> {}

impl<Id> fmt::Debug for SearchOptions<'_, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("ef", &self.ef)
            .field("filter", &self.filter.map(|_| "<fn>"))
            .finish()
    }
}

/// Storage position paired with its distance from the current query.
///
/// Ordered by distance, then position, so heaps and sorts stay
/// deterministic when distances tie.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Neighbour {
    pub(crate) id: usize,
    pub(crate) distance: f32,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap adaptor for [`Neighbour`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ReverseNeighbour {
    pub(crate) inner: Neighbour,
}

impl ReverseNeighbour {
    pub(crate) const fn new(id: usize, distance: f32) -> Self {
        Self {
            inner: Neighbour { id, distance },
        }
    }
}

impl Ord for ReverseNeighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        other.inner.cmp(&self.inner)
    }
}

impl PartialOrd for ReverseNeighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
