// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev
//
// Zero-copy view suite: deferred parsing, borrowed slices, cached scalar
// decode, and materialization back into an owned container.

use valise::codec::view::parse_view;
use valise::{Container, Value, ValueData, ValueKind};

fn wire_sample() -> (Container, Vec<u8>) {
    let c = Container::builder()
        .source("probe-2", "north")
        .target("collector", "main")
        .message_type("sample_sheet")
        .version("7")
        .build()
        .expect("builder should assemble");
    c.set("station", "K-113 ridge").expect("set should succeed");
    c.set("reading", 1013.25f64).expect("set should succeed");
    c.set("count", 144u32).expect("set should succeed");
    c.set("raw", ValueData::bytes(&[0x10, 0x20, 0x30])).expect("set should succeed");
    c.set("big_note", "n".repeat(5000).as_str()).expect("set should succeed");
    let bytes = c.to_bytes().expect("encode should succeed");
    (c, bytes)
}

#[test]
fn test_header_available_without_value_scan() {
    let (_, bytes) = wire_sample();
    let view = parse_view(&bytes).expect("parse_view should succeed");
    assert_eq!(view.header().source_id, "probe-2");
    assert_eq!(view.header().version, "7");
    assert_eq!(view.len(), 5);
    assert_eq!(view.header().to_owned().message_type, "sample_sheet");
}

#[test]
fn test_large_string_served_without_copy() {
    let (_, bytes) = wire_sample();
    let view = parse_view(&bytes).expect("parse_view should succeed");
    let note = view.get_view("big_note").expect("big_note should be present");
    let s = note.as_str().expect("string view");
    assert_eq!(s.len(), 5000);

    // The payload slice points into the wire buffer itself.
    let slice_range = s.as_bytes().as_ptr_range();
    let buf_range = bytes.as_ptr_range();
    assert!(slice_range.start >= buf_range.start && slice_range.end <= buf_range.end);
}

#[test]
fn test_typed_views() {
    let (_, bytes) = wire_sample();
    let view = parse_view(&bytes).expect("parse_view should succeed");

    assert_eq!(
        view.get_view("reading").and_then(|v| v.as_f64()),
        Some(1013.25)
    );
    assert_eq!(view.get_view("count").and_then(|v| v.as_u64()), Some(144));
    assert_eq!(
        view.get_view("raw").and_then(|v| v.as_bytes().map(<[u8]>::to_vec)),
        Some(vec![0x10, 0x20, 0x30])
    );
    assert_eq!(view.get_view("count").map(|v| v.kind()), Some(ValueKind::UInt));

    // Wrong-type accessors answer None, they never panic.
    let station = view.get_view("station").expect("station should be present");
    assert!(station.as_f64().is_none());
    assert!(station.as_bytes().is_none());
    assert_eq!(station.as_str(), Some("K-113 ridge"));
}

#[test]
fn test_to_owned_equals_source() {
    let (original, bytes) = wire_sample();
    let view = parse_view(&bytes).expect("parse_view should succeed");
    let owned = view.to_owned().expect("to_owned should succeed");
    assert_eq!(owned, original);
}

#[test]
fn test_view_equivalent_to_full_parse_for_reads() {
    let (_, bytes) = wire_sample();
    let owned = Container::from_bytes(&bytes).expect("decode should succeed");
    let view = parse_view(&bytes).expect("parse_view should succeed");

    for value in owned.values() {
        let through_view = view
            .get_view(value.name())
            .expect("every owned value should be viewable");
        assert_eq!(through_view.kind(), value.kind());
    }
}

#[test]
fn test_duplicate_names_first_match_in_views() {
    let c = Container::new();
    c.bulk_insert(vec![
        Value::new("dup", 10i32),
        Value::new("dup", 20i32),
    ])
    .expect("bulk insert should succeed");
    let bytes = c.to_bytes().expect("encode should succeed");

    let view = parse_view(&bytes).expect("parse_view should succeed");
    assert_eq!(view.get_view("dup").and_then(|v| v.as_i64()), Some(10));

    let names: Vec<String> = view.iter().map(|v| v.name().to_string()).collect();
    assert_eq!(names, vec!["dup", "dup"]);
}

#[test]
fn test_malformed_value_region_detected_lazily() {
    let (_, bytes) = wire_sample();
    let cut = &bytes[..bytes.len() - 10];

    // Header parsing still succeeds; the index build reports the damage.
    let view = parse_view(cut).expect("parse_view should succeed");
    assert!(view.ensure_indexed().is_err());
    assert!(view.get_view("station").is_none());
}
