//! Construction and search parameters for the HNSW index.

use crate::{
    distance::Metric,
    error::{IndexError, Result},
};

const DEFAULT_MAX_CONNECTIONS: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_EF_SEARCH: usize = 64;
const DEFAULT_MAX_LEVEL: usize = 16;
const DEFAULT_RNG_SEED: u64 = 0x5EED_CAFE;

/// Configuration parameters for [`crate::HnswIndex`].
///
/// # Examples
/// ```
/// use vicinity_core::{HnswParams, Metric};
///
/// let params = HnswParams::new(8, 64)
///     .expect("parameters must be valid")
///     .with_ef_search(32)
///     .with_metric(Metric::Cosine);
/// assert_eq!(params.max_connections(), 8);
/// assert_eq!(params.ef_search(), 32);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct HnswParams {
    max_connections: usize,
    ef_construction: usize,
    ef_search: usize,
    metric: Metric,
    max_level: usize,
    rng_seed: u64,
}

impl HnswParams {
    /// Creates a parameter set with explicit fan-out (`M`) and construction
    /// beam width.
    ///
    /// # Errors
    /// Returns [`IndexError::InvalidParameters`] when `max_connections` is
    /// below 2 or `ef_construction` is zero.
    pub fn new(max_connections: usize, ef_construction: usize) -> Result<Self> {
        if max_connections < 2 {
            return Err(IndexError::InvalidParameters {
                reason: format!("max_connections must be at least 2, got {max_connections}"),
            });
        }
        if ef_construction == 0 {
            return Err(IndexError::InvalidParameters {
                reason: "ef_construction must be greater than zero".into(),
            });
        }
        Ok(Self {
            max_connections,
            ef_construction,
            ef_search: DEFAULT_EF_SEARCH,
            metric: Metric::default(),
            max_level: DEFAULT_MAX_LEVEL,
            rng_seed: DEFAULT_RNG_SEED,
        })
    }

    /// Sets the default search beam width. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search.max(1);
        self
    }

    /// Selects the distance metric.
    #[must_use]
    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Seeds the level-sampling RNG to make construction deterministic.
    #[must_use]
    pub const fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Caps the highest layer a new node can be assigned.
    #[must_use]
    pub const fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Returns `M`, the neighbour fan-out on upper layers.
    #[must_use]
    pub const fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Returns the construction beam width.
    #[must_use]
    pub const fn ef_construction(&self) -> usize {
        self.ef_construction
    }

    /// Returns the default search beam width.
    #[must_use]
    pub const fn ef_search(&self) -> usize {
        self.ef_search
    }

    /// Returns the distance metric.
    #[must_use]
    pub const fn metric(&self) -> Metric {
        self.metric
    }

    /// Returns the layer cap applied during level sampling.
    #[must_use]
    pub const fn max_level(&self) -> usize {
        self.max_level
    }

    /// Returns the level-sampling RNG seed.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Neighbour cap for `level`: `2M` on the base layer, `M` above it.
    pub(crate) const fn max_neighbours(&self, level: usize) -> usize {
        if level == 0 {
            self.max_connections.saturating_mul(2)
        } else {
            self.max_connections
        }
    }

    /// Returns the same parameters with the persisted graph settings
    /// replaced.
    pub(crate) fn with_graph_settings(
        &self,
        max_connections: usize,
        ef_construction: usize,
        ef_search: usize,
        metric: Metric,
    ) -> Result<Self> {
        Ok(Self::new(max_connections, ef_construction)?
            .with_ef_search(ef_search)
            .with_metric(metric)
            .with_max_level(self.max_level)
            .with_rng_seed(self.rng_seed))
    }
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            metric: Metric::default(),
            max_level: DEFAULT_MAX_LEVEL,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}
