//! Behavioural tests for the exact index.

#[expect(dead_code, reason = "this suite uses a subset of the shared fixtures")]
mod common;

use common::{abc_flat, ids, random_points};
use std::{cell::Cell, sync::mpsc, thread, time::Duration};

use rstest::rstest;
use vicinity_core::{FlatIndex, IndexError, Metric, SearchOptions, WeightedQuery};

#[rstest]
fn scenario_returns_a_then_b() {
    let index = abc_flat();
    let hits = index.search(2, &[0.1, 0.0]);
    assert_eq!(ids(&hits), vec!["a", "b"]);
}

#[rstest]
fn equidistant_pair_keeps_insertion_order() {
    let index = FlatIndex::new(2);
    for (id, vector) in [("a", [0.0, 0.0]), ("b", [1.0, 0.0]), ("c", [2.0, 0.0])] {
        index.add(id.to_owned(), &vector).expect("insert");
    }
    let hits = index.search(2, &[0.5, 0.0]);
    assert_eq!(ids(&hits), vec!["a", "b"]);
    let scores: Vec<f32> = hits.iter().map(|hit| hit.score).collect();
    assert_eq!(scores, vec![0.25, 0.25]);
}

#[rstest]
fn filter_excluding_nearest_skips_it() {
    let index = abc_flat();
    let not_a = |id: &String| id != "a";
    let hits = index.search_with_options(3, &[0.0, 0.0], SearchOptions::new().with_filter(&not_a));
    assert_eq!(ids(&hits), vec!["b", "c"]);
}

#[rstest]
fn negative_weight_flips_direction() {
    let index = FlatIndex::new(2);
    index.add(1_i32, &[2.0, 0.0]).expect("add 1");
    index.add(-1, &[-2.0, 0.0]).expect("add -1");
    let toward = index.search_weighted(1, &[WeightedQuery::new(1.0, vec![1.0, 0.0])]);
    let away = index.search_weighted(1, &[WeightedQuery::new(-1.0, vec![1.0, 0.0])]);
    assert_eq!(ids(&toward), vec![1]);
    assert_eq!(ids(&away), vec![-1]);
}

#[rstest]
fn added_vectors_round_trip() {
    let index = FlatIndex::new(0);
    for (id, point) in random_points(50, 6, 1).into_iter().enumerate() {
        index.add(id, &point).expect("add");
        assert_eq!(index.vector(&id), Some(point));
    }
    assert_eq!(index.len(), 50);
}

#[rstest]
fn delete_shrinks_by_one_and_keeps_lookups_valid() {
    let index = FlatIndex::new(3);
    let points = random_points(20, 3, 2);
    for (id, point) in points.iter().enumerate() {
        index.add(id, point).expect("add");
    }
    for id in [0, 19, 7] {
        let before = index.len();
        assert!(index.delete(&id).expect("delete"));
        assert_eq!(index.len(), before - 1);
    }
    for (id, point) in points.iter().enumerate() {
        let expected = (![0, 19, 7].contains(&id)).then(|| point.clone());
        assert_eq!(index.vector(&id), expected, "id {id}");
    }
}

#[rstest]
#[case(Metric::SquaredL2)]
#[case(Metric::Cosine)]
fn dimension_mismatch_after_first_insert(#[case] metric: Metric) {
    let index = FlatIndex::with_metric(0, metric);
    index.add("x", &[1.0, 1.0]).expect("first");
    let err = index.upsert("y", &[1.0]).expect_err("wrong dim");
    assert_eq!(err.code().as_str(), "INDEX_DIM_MISMATCH");
}

#[rstest]
fn concurrent_readers_and_writer() {
    let index = FlatIndex::new(4);
    let points = random_points(200, 4, 3);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for (id, point) in points.iter().enumerate() {
                index.upsert(id, point).expect("upsert");
            }
        });
        for _ in 0..3 {
            scope.spawn(|| {
                for point in points.iter().take(50) {
                    let hits = index.search(5, point);
                    assert!(hits.len() <= 5);
                    assert!(hits.windows(2).all(|pair| pair[0].score <= pair[1].score));
                }
            });
        }
    });
    assert_eq!(index.len(), 200);
}

#[rstest]
fn slow_filter_does_not_stall_other_readers() {
    let index = abc_flat();
    let shared = &index;
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (sent, released) = thread::scope(|scope| {
        let slow = scope.spawn(move || {
            let first = Cell::new(true);
            let released = Cell::new(false);
            let stall = |_: &String| {
                if first.replace(false) {
                    started_tx.send(()).expect("signal start");
                    released.set(release_rx.recv_timeout(Duration::from_secs(5)).is_ok());
                }
                true
            };
            let hits = shared.search_with_options(3, &[0.0, 0.0], SearchOptions::new().with_filter(&stall));
            assert_eq!(hits.len(), 3);
            released.get()
        });
        started_rx.recv().expect("slow search started");
        let hits = shared.search(2, &[0.1, 0.0]);
        assert_eq!(ids(&hits), vec!["a", "b"]);
        let sent = release_tx.send(()).is_ok();
        (sent, slow.join().expect("slow search thread"))
    });
    assert!(sent && released, "second reader waited for the slow filter");
}

#[rstest]
fn filter_may_search_the_same_index() {
    let index = abc_flat();
    let not_nearest_to_c = |id: &String| {
        index
            .search(1, &[5.0, 5.0])
            .first()
            .is_none_or(|hit| &hit.id != id)
    };
    let options = SearchOptions::new().with_filter(&not_nearest_to_c);
    let hits = index.search_with_options(3, &[0.0, 0.0], options);
    assert_eq!(ids(&hits), vec!["a", "b"]);
}

#[rstest]
fn batch_size_mismatch_is_reported() {
    let index: FlatIndex<u8> = FlatIndex::new(1);
    let err = index
        .batch_upsert(&[1, 2, 3], &[vec![1.0]])
        .expect_err("mismatch");
    assert!(matches!(err, IndexError::BatchSizeMismatch { ids: 3, vectors: 1 }));
    assert!(index.is_empty());
}
