//! Instrumentation emitted by index operations.

#[expect(dead_code, reason = "this suite uses a subset of the shared fixtures")]
mod common;

use common::{abc_flat, abc_hnsw};
use rstest::rstest;
use tracing::Level;
use vicinity_core::{FlatIndex, HnswIndex};
use vicinity_test_support::tracing::capture;

#[rstest]
fn flat_add_opens_a_span_with_dimension() {
    let index = FlatIndex::new(3);
    let (result, layer) = capture(|| index.add(1_u32, &[0.0, 1.0, 2.0]));
    result.expect("add");
    let span = layer.span("index.flat.add").expect("span closed");
    assert_eq!(span.fields.get("dim"), Some(&"3".to_owned()));
    assert_eq!(span.fields.get("id"), Some(&"1".to_owned()));
}

#[rstest]
fn hnsw_add_failure_is_logged_as_error() {
    let index = abc_hnsw();
    let (result, layer) = capture(|| index.add("a".to_owned(), &[9.0, 9.0]));
    result.expect_err("a already exists");
    assert!(layer.span("index.hnsw.add").is_some());
    assert!(!layer.events_at(Level::ERROR).is_empty());
}

#[rstest]
#[case::flat(true)]
#[case::hnsw(false)]
fn save_and_load_spans_name_the_kind(#[case] flat: bool) {
    let kind = if flat { "flat" } else { "hnsw" };
    let ((), layer) = capture(|| {
        let mut bytes = Vec::new();
        if flat {
            let index = abc_flat();
            index.save(&mut bytes).expect("save");
            index.load(bytes.as_slice()).expect("load");
        } else {
            let index = abc_hnsw();
            index.save(&mut bytes).expect("save");
            index.load(bytes.as_slice()).expect("load");
        }
    });
    for name in ["index.persist.save", "index.persist.load"] {
        let span = layer.span(name).expect("persist span closed");
        assert_eq!(span.fields.get("kind"), Some(&kind.to_owned()));
    }
}

#[rstest]
fn rejected_header_emits_a_warning() {
    let (result, layer) = capture(|| FlatIndex::<String>::from_reader(&b"NOPE\x01\x01"[..]));
    result.expect_err("bad magic");
    let warnings = layer.events_at(Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].fields.contains_key("found"));
}

#[rstest]
fn wrong_kind_warning_names_both_kinds() {
    let mut bytes = Vec::new();
    abc_flat().save(&mut bytes).expect("save");
    let (result, layer) = capture(|| HnswIndex::<String>::from_reader(bytes.as_slice()));
    result.expect_err("flat stream");
    let warning = layer
        .events_at(Level::WARN)
        .into_iter()
        .next()
        .expect("warning emitted");
    assert_eq!(warning.fields.get("expected"), Some(&"hnsw".to_owned()));
    assert_eq!(warning.fields.get("found"), Some(&"flat".to_owned()));
}
