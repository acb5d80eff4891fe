use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn abc() -> FlatIndex<&'static str> {
    let index = FlatIndex::new(2);
    index.add("a", &[0.0, 0.0]).expect("add a");
    index.add("b", &[1.0, 0.0]).expect("add b");
    index.add("c", &[5.0, 5.0]).expect("add c");
    index
}

fn ids_of<Id: Clone>(hits: &[SearchResult<Id>]) -> Vec<Id> {
    hits.iter().map(|hit| hit.id.clone()).collect()
}

#[rstest]
fn first_insert_fixes_unset_dimension() {
    let index = FlatIndex::new(0);
    index.add(1_u32, &[1.0, 2.0, 3.0]).expect("first add");
    assert_eq!(index.dim(), 3);
    let err = index.add(2, &[1.0]).expect_err("second add has wrong dim");
    assert!(matches!(
        err,
        IndexError::DimMismatch {
            expected: 3,
            got: 1
        }
    ));
}

#[rstest]
fn duplicate_add_is_rejected_before_vector_checks(abc: FlatIndex<&'static str>) {
    let err = abc.add("a", &[]).expect_err("duplicate id");
    assert!(matches!(err, IndexError::IdExists { .. }));
}

#[rstest]
fn upsert_replaces_in_place(abc: FlatIndex<&'static str>) {
    abc.upsert("a", &[9.0, 9.0]).expect("upsert");
    assert_eq!(abc.len(), 3);
    assert_eq!(abc.vector(&"a"), Some(vec![9.0, 9.0]));
    assert_eq!(abc.ids(), vec!["a", "b", "c"]);
}

#[rstest]
fn delete_repoints_swapped_entry(abc: FlatIndex<&'static str>) {
    assert!(abc.delete(&"a").expect("delete a"));
    assert!(!abc.delete(&"a").expect("second delete"));
    assert_eq!(abc.len(), 2);
    assert_eq!(abc.ids(), vec!["c", "b"]);
    assert_eq!(abc.vector(&"c"), Some(vec![5.0, 5.0]));
    assert!(!abc.contains(&"a"));
}

#[rstest]
fn search_orders_ascending_and_truncates(abc: FlatIndex<&'static str>) {
    let hits = abc.search(2, &[0.1, 0.0]);
    assert_eq!(ids_of(&hits), vec!["a", "b"]);
    assert!(hits.windows(2).all(|pair| pair[0].score <= pair[1].score));
}

#[rstest]
fn ties_break_by_storage_position() {
    let index = FlatIndex::new(1);
    index.add("left", &[-1.0]).expect("left");
    index.add("right", &[1.0]).expect("right");
    let hits = index.search(2, &[0.0]);
    assert_eq!(ids_of(&hits), vec!["left", "right"]);
}

#[rstest]
#[case::zero_k(0, vec![0.0, 0.0])]
#[case::wrong_dim(3, vec![0.0])]
fn degenerate_searches_are_empty(
    abc: FlatIndex<&'static str>,
    #[case] k: usize,
    #[case] query: Vec<f32>,
) {
    assert!(abc.search(k, &query).is_empty());
}

#[rstest]
fn empty_index_search_is_empty() {
    let index: FlatIndex<u32> = FlatIndex::new(2);
    assert!(index.search(3, &[0.0, 0.0]).is_empty());
}

#[rstest]
fn filter_runs_before_ranking(abc: FlatIndex<&'static str>) {
    let skip_a = |id: &&str| *id != "a";
    let options = SearchOptions::new().with_filter(&skip_a);
    let hits = abc.search_with_options(1, &[0.0, 0.0], options);
    assert_eq!(ids_of(&hits), vec!["b"]);
}

#[rstest]
fn negative_weight_searches_away_from_vector() {
    let index = FlatIndex::new(2);
    index.add("pos", &[1.0, 0.0]).expect("pos");
    index.add("neg", &[-1.0, 0.0]).expect("neg");
    let hits = index.search_weighted(1, &[WeightedQuery::new(-1.0, vec![1.0, 0.0])]);
    assert_eq!(ids_of(&hits), vec!["neg"]);
}

#[rstest]
fn weighted_search_with_zero_weight_is_empty(abc: FlatIndex<&'static str>) {
    let hits = abc.search_weighted(3, &[WeightedQuery::new(0.0, vec![0.0, 0.0])]);
    assert!(hits.is_empty());
}

#[rstest]
fn batch_validation_leaves_index_untouched(abc: FlatIndex<&'static str>) {
    let err = abc
        .batch_upsert(&["d", "e"], &[vec![1.0, 1.0], vec![1.0]])
        .expect_err("ragged batch");
    assert!(matches!(err, IndexError::DimMismatch { .. }));
    assert_eq!(abc.len(), 3);
    assert!(!abc.contains(&"d"));
}

#[rstest]
fn batch_upsert_inserts_and_replaces(abc: FlatIndex<&'static str>) {
    abc.batch_upsert(&["a", "d"], &[vec![2.0, 2.0], vec![3.0, 3.0]])
        .expect("batch");
    assert_eq!(abc.len(), 4);
    assert_eq!(abc.vector(&"a"), Some(vec![2.0, 2.0]));
    assert_eq!(abc.vector(&"d"), Some(vec![3.0, 3.0]));
}

#[rstest]
#[case(true)]
#[case(false)]
fn clear_retains_configuration(abc: FlatIndex<&'static str>, #[case] keep_capacity: bool) {
    abc.set_column_names(vec!["x".into(), "y".into()])
        .expect("names");
    assert!(!abc.search(1, &[0.0, 0.0]).is_empty());
    abc.clear(keep_capacity).expect("clear");
    assert!(abc.is_empty());
    assert_eq!(abc.dim(), 2);
    assert_eq!(abc.column_name(1).expect("column 1"), "y");

    let state = lock::read(&abc.state);
    let idle = lock::scratch(&state.scratch).idle();
    assert_eq!(idle, usize::from(keep_capacity));
}

#[rstest]
fn column_names_fix_unset_dimension() {
    let index: FlatIndex<u32> = FlatIndex::new(0);
    index
        .set_column_names(vec!["r".into(), "g".into(), "b".into()])
        .expect("names");
    assert_eq!(index.dim(), 3);
    assert_eq!(
        index.column_names(),
        Some(vec!["r".to_owned(), "g".to_owned(), "b".to_owned()])
    );
    let err = index.column_name(3).expect_err("out of range");
    assert!(matches!(err, IndexError::InvalidColumnIndex { index: 3, .. }));
}

#[rstest]
fn column_names_must_match_dimension(abc: FlatIndex<&'static str>) {
    let err = abc
        .set_column_names(vec!["only".into()])
        .expect_err("dim is 2");
    assert!(matches!(
        err,
        IndexError::ColumnNamesMismatch {
            expected: 2,
            got: 1
        }
    ));
}

#[rstest]
fn cosine_metric_ranks_by_angle() {
    let index = FlatIndex::with_metric(2, Metric::Cosine);
    index.add("east", &[10.0, 0.0]).expect("east");
    index.add("north", &[0.0, 0.1]).expect("north");
    let hits = index.search(1, &[1.0, 0.1]);
    assert_eq!(ids_of(&hits), vec!["east"]);
}
