use super::*;
use crate::{
    distance::Metric,
    error::IndexError,
    types::{SearchOptions, SearchResult, WeightedQuery},
};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rstest::{fixture, rstest};

fn small_params() -> HnswParams {
    HnswParams::new(4, 32)
        .expect("parameters must be valid")
        .with_rng_seed(7)
}

fn ids_of<Id: Clone>(hits: &[SearchResult<Id>]) -> Vec<Id> {
    hits.iter().map(|hit| hit.id.clone()).collect()
}

fn random_points(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

#[fixture]
fn abc() -> HnswIndex<&'static str> {
    let index = HnswIndex::new(2, small_params());
    index.add("a", &[0.0, 0.0]).expect("add a");
    index.add("b", &[1.0, 0.0]).expect("add b");
    index.add("c", &[5.0, 5.0]).expect("add c");
    index
}

#[rstest]
fn nearest_neighbour_is_found(abc: HnswIndex<&'static str>) {
    let hits = abc.search(1, &[0.1, 0.0]);
    assert_eq!(ids_of(&hits), vec!["a"]);
}

#[rstest]
fn results_are_sorted_ascending(abc: HnswIndex<&'static str>) {
    let hits = abc.search(3, &[0.9, 0.0]);
    assert_eq!(ids_of(&hits), vec!["b", "a", "c"]);
    assert!(hits.windows(2).all(|pair| pair[0].score <= pair[1].score));
}

#[rstest]
fn duplicate_add_is_rejected(abc: HnswIndex<&'static str>) {
    let err = abc.add("b", &[2.0, 2.0]).expect_err("b is live");
    assert!(matches!(err, IndexError::IdExists { .. }));
}

#[rstest]
fn dimension_is_enforced_after_first_insert() {
    let index = HnswIndex::new(0, small_params());
    index.add(1_u64, &[1.0, 2.0]).expect("first add fixes dim");
    let err = index.add(2, &[1.0, 2.0, 3.0]).expect_err("wrong dim");
    assert!(matches!(
        err,
        IndexError::DimMismatch {
            expected: 2,
            got: 3
        }
    ));
    let err = index.upsert(3, &[]).expect_err("empty vector");
    assert!(matches!(err, IndexError::EmptyVector));
}

#[rstest]
fn delete_tombstones_without_shrinking_the_arena(abc: HnswIndex<&'static str>) {
    assert!(abc.delete(&"a").expect("delete a"));
    assert!(!abc.delete(&"a").expect("second delete"));
    assert_eq!(abc.len(), 2);
    assert_eq!(abc.node_count(), 3);
    assert_eq!(abc.vector(&"a"), None);
    assert!(!abc.contains(&"a"));
    let hits = abc.search(3, &[0.0, 0.0]);
    assert_eq!(ids_of(&hits), vec!["b", "c"]);
}

#[rstest]
fn deleted_id_can_be_added_again(abc: HnswIndex<&'static str>) {
    abc.delete(&"a").expect("delete a");
    abc.add("a", &[4.0, 4.0]).expect("re-add a");
    assert_eq!(abc.len(), 3);
    assert_eq!(abc.node_count(), 4);
    assert_eq!(abc.vector(&"a"), Some(vec![4.0, 4.0]));
}

#[rstest]
fn upsert_reinserts_behind_a_tombstone(abc: HnswIndex<&'static str>) {
    abc.upsert("a", &[5.0, 4.0]).expect("upsert a");
    assert_eq!(abc.len(), 3);
    assert_eq!(abc.node_count(), 4);
    let hits = abc.search(1, &[5.0, 4.1]);
    assert_eq!(ids_of(&hits), vec!["a"]);
    assert_eq!(abc.ids(), vec!["b", "c", "a"]);
}

#[rstest]
fn all_tombstoned_index_returns_nothing(abc: HnswIndex<&'static str>) {
    for id in ["a", "b", "c"] {
        abc.delete(&id).expect("delete");
    }
    assert!(abc.is_empty());
    assert!(abc.search(3, &[0.0, 0.0]).is_empty());
}

#[rstest]
#[case::zero_k(0, vec![0.0, 0.0])]
#[case::wrong_dim(2, vec![0.0])]
fn degenerate_searches_are_empty(
    abc: HnswIndex<&'static str>,
    #[case] k: usize,
    #[case] query: Vec<f32>,
) {
    assert!(abc.search(k, &query).is_empty());
}

#[rstest]
fn filter_excludes_nearest(abc: HnswIndex<&'static str>) {
    let skip_a = |id: &&str| *id != "a";
    let hits = abc.search_with_options(3, &[0.0, 0.0], SearchOptions::new().with_filter(&skip_a));
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|hit| hit.id != "a"));
}

#[rstest]
fn negative_weight_flips_the_query() {
    let index = HnswIndex::new(2, small_params());
    index.add("pos", &[1.0, 0.0]).expect("pos");
    index.add("neg", &[-1.0, 0.0]).expect("neg");
    let hits = index.search_weighted(1, &[WeightedQuery::new(-2.0, vec![1.0, 0.0])]);
    assert_eq!(ids_of(&hits), vec!["neg"]);
    assert!(index.search_weighted(1, &[]).is_empty());
}

#[rstest]
fn graph_invariants_hold_after_many_inserts() {
    let index = HnswIndex::new(8, HnswParams::new(3, 16).expect("valid").with_rng_seed(99));
    for (id, point) in random_points(300, 8, 5).iter().enumerate() {
        index.add(id, point).expect("insert");
    }
    for id in (0..300).step_by(7) {
        index.delete(&id).expect("delete");
    }
    for (id, point) in random_points(40, 8, 6).iter().enumerate() {
        index.upsert(id * 3, point).expect("upsert");
    }
    index.with_state(|state| state.graph.assert_invariants());
}

#[rstest]
fn wide_beam_matches_exhaustive_ranking() {
    let points = random_points(120, 4, 17);
    let index = HnswIndex::new(4, small_params());
    for (id, point) in points.iter().enumerate() {
        index.add(id, point).expect("insert");
    }
    let query = [0.2, -0.1, 0.4, 0.0];
    let mut expected: Vec<(usize, f32)> = points
        .iter()
        .enumerate()
        .map(|(id, point)| (id, Metric::SquaredL2.distance(&query, point)))
        .collect();
    expected.sort_by(|a, b| a.1.total_cmp(&b.1));
    let want: Vec<usize> = expected.iter().take(10).map(|(id, _)| *id).collect();

    let hits = index.search_with_options(10, &query, SearchOptions::new().with_ef(points.len()));
    assert_eq!(ids_of(&hits), want);
}

#[rstest]
fn same_seed_builds_identical_graphs() {
    let points = random_points(60, 3, 23);
    let build = || {
        let index = HnswIndex::new(3, HnswParams::default()).with_rng(SmallRng::seed_from_u64(4));
        for (id, point) in points.iter().enumerate() {
            index.add(id, point).expect("insert");
        }
        index.with_state(|state| {
            state
                .graph
                .nodes()
                .iter()
                .map(|node| (node.level(), node.layers().to_vec()))
                .collect::<Vec<_>>()
        })
    };
    assert_eq!(build(), build());
}

#[rstest]
fn entry_point_tracks_highest_layer() {
    let index = HnswIndex::new(2, HnswParams::new(2, 8).expect("valid").with_rng_seed(3));
    for (id, point) in random_points(200, 2, 8).iter().enumerate() {
        index.add(id, point).expect("insert");
    }
    index.with_state(|state| {
        let top = state.graph.nodes().iter().map(Node::level).max();
        assert_eq!(state.graph.entry().map(|entry| entry.level), top);
        assert!(state.graph.max_level() > 0, "M = 2 should grow upper layers");
    });
}

#[rstest]
fn max_level_cap_is_respected() {
    let params = HnswParams::new(2, 8).expect("valid").with_max_level(1);
    let index = HnswIndex::new(2, params);
    for (id, point) in random_points(200, 2, 9).iter().enumerate() {
        index.add(id, point).expect("insert");
    }
    index.with_state(|state| assert!(state.graph.max_level() <= 1));
}

#[rstest]
#[case(true, (1, 1))]
#[case(false, (0, 0))]
fn clear_resets_graph_and_pools(
    abc: HnswIndex<&'static str>,
    #[case] keep_capacity: bool,
    #[case] idle: (usize, usize),
) {
    assert!(!abc.search(1, &[0.0, 0.0]).is_empty());
    abc.clear(keep_capacity).expect("clear");
    assert!(abc.is_empty());
    assert_eq!(abc.node_count(), 0);
    assert_eq!(abc.dim(), 2);
    abc.with_state(|state| {
        assert_eq!(state.graph.entry(), None);
        assert_eq!(state.graph.max_level(), 0);
        assert_eq!(state.scratch_idle(), idle);
    });
    abc.add("z", &[1.0, 1.0]).expect("add after clear");
    assert_eq!(ids_of(&abc.search(1, &[1.0, 1.0])), vec!["z"]);
}

#[rstest]
fn batch_upsert_validates_everything_first(abc: HnswIndex<&'static str>) {
    let err = abc
        .batch_upsert(&["d", "e"], &[vec![1.0, 1.0]])
        .expect_err("length mismatch");
    assert!(matches!(
        err,
        IndexError::BatchSizeMismatch { ids: 2, vectors: 1 }
    ));
    abc.batch_upsert(&["a", "d"], &[vec![3.0, 3.0], vec![4.0, 4.0]])
        .expect("batch");
    assert_eq!(abc.len(), 4);
    assert_eq!(abc.node_count(), 5);
}

#[rstest]
fn cosine_index_ignores_magnitude() {
    let params = small_params().with_metric(Metric::Cosine);
    let index = HnswIndex::new(2, params);
    index.add("east", &[100.0, 1.0]).expect("east");
    index.add("north", &[0.0, 0.5]).expect("north");
    assert_eq!(index.metric(), Metric::Cosine);
    assert_eq!(ids_of(&index.search(1, &[1.0, 0.0])), vec!["east"]);
}

#[rstest]
fn column_names_round_trip(abc: HnswIndex<&'static str>) {
    abc.set_column_names(vec!["x".into(), "y".into()])
        .expect("names");
    assert_eq!(abc.column_name(0).expect("column 0"), "x");
    let err = abc.column_name(2).expect_err("out of range");
    assert!(matches!(err, IndexError::InvalidColumnIndex { .. }));
}
