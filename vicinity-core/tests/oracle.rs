//! Property tests comparing the graph index against exhaustive search.

use proptest::prelude::*;
use vicinity_core::{FlatIndex, HnswIndex, HnswParams, Metric, SearchOptions};

fn points_strategy() -> impl Strategy<Value = (usize, Vec<Vec<f32>>, Vec<f32>)> {
    (1_usize..=4).prop_flat_map(|dim| {
        let point = prop::collection::vec(-100.0_f32..100.0, dim);
        (
            Just(dim),
            prop::collection::vec(point.clone(), 1..40),
            point,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wide_beam_matches_flat_results(
        (dim, points, query) in points_strategy(),
        seed in any::<u64>(),
        k in 1_usize..8,
    ) {
        let params = HnswParams::new(8, 32)
            .expect("parameters must be valid")
            .with_rng_seed(seed);
        let hnsw = HnswIndex::new(dim, params);
        let flat = FlatIndex::new(dim);
        for (id, point) in points.iter().enumerate() {
            hnsw.add(id, point).expect("hnsw add");
            flat.add(id, point).expect("flat add");
        }

        let ef = points.len();
        let approx = hnsw.search_with_options(k, &query, SearchOptions::new().with_ef(ef));
        let exact = flat.search(k, &query);
        prop_assert_eq!(approx.len(), exact.len());
        // Ids may swap on exact ties, so compare the ranked distances.
        for (got, want) in approx.iter().zip(&exact) {
            prop_assert!((got.score - want.score).abs() <= 1e-3 * want.score.max(1.0));
        }
    }

    #[test]
    fn flat_results_are_sorted_and_bounded(
        (dim, points, query) in points_strategy(),
        k in 0_usize..50,
        cosine in any::<bool>(),
    ) {
        let metric = if cosine { Metric::Cosine } else { Metric::SquaredL2 };
        let flat = FlatIndex::with_metric(dim, metric);
        for (id, point) in points.iter().enumerate() {
            flat.upsert(id, point).expect("upsert");
        }
        let hits = flat.search(k, &query);
        prop_assert!(hits.len() <= k);
        prop_assert_eq!(hits.len(), k.min(points.len()));
        prop_assert!(hits.windows(2).all(|pair| pair[0].score <= pair[1].score));
    }
}
