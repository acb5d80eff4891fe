//! Fixtures shared by the integration suites.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use vicinity_core::{FlatIndex, HnswIndex, HnswParams, SearchResult};

/// Deterministic points with components in `[-1, 1)`.
#[must_use]
pub fn random_points(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

#[must_use]
pub fn ids<Id: Clone>(hits: &[SearchResult<Id>]) -> Vec<Id> {
    hits.iter().map(|hit| hit.id.clone()).collect()
}

#[must_use]
pub fn params() -> HnswParams {
    HnswParams::new(8, 64)
        .expect("parameters must be valid")
        .with_rng_seed(0xDEC0DE)
}

/// The three-entry scenario used across the suites.
#[must_use]
pub fn abc_flat() -> FlatIndex<String> {
    let index = FlatIndex::new(2);
    fill_abc(|id, vector| index.add(id, vector));
    index
}

#[must_use]
pub fn abc_hnsw() -> HnswIndex<String> {
    let index = HnswIndex::new(2, params());
    fill_abc(|id, vector| index.add(id, vector));
    index
}

fn fill_abc(mut add: impl FnMut(String, &[f32]) -> vicinity_core::Result<()>) {
    for (id, vector) in [("a", [0.0, 0.0]), ("b", [1.0, 0.0]), ("c", [5.0, 5.0])] {
        add(id.to_owned(), &vector).expect("scenario insert");
    }
}
