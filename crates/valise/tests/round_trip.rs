// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 valise.dev
//
// Cross-codec round-trip suite: every codec must restore values, order, and
// header byte-for-byte for the same logical input.

use std::sync::Arc;
use valise::{
    detect_format, Container, Format, Value, ValueArray, ValueData, ValueKind,
};

/// Round-trip `c` through every codec and compare structurally.
fn assert_round_trips(c: &Container) {
    let binary = c.to_bytes().expect("binary encode should succeed");
    assert_eq!(
        &Container::from_bytes(&binary).expect("binary decode should succeed"),
        c,
        "binary round-trip"
    );

    let json = c.to_json().expect("json encode should succeed");
    assert_eq!(
        &Container::from_json(&json).expect("json decode should succeed"),
        c,
        "json round-trip"
    );

    let xml = c.to_xml().expect("xml encode should succeed");
    assert_eq!(
        &Container::from_xml(&xml).expect("xml decode should succeed"),
        c,
        "xml round-trip"
    );

    let packed = c.to_msgpack().expect("msgpack encode should succeed");
    assert_eq!(
        &Container::from_msgpack(&packed).expect("msgpack decode should succeed"),
        c,
        "msgpack round-trip"
    );
}

fn addressed() -> Container {
    Container::builder()
        .source("router-12", "uplink")
        .target("archive-3", "cold")
        .message_type("batch_report")
        .version("4.1")
        .build()
        .expect("builder should assemble")
}

#[test]
fn test_empty_container_all_codecs() {
    assert_round_trips(&Container::new());
    assert_round_trips(&addressed());
}

#[test]
fn test_every_kind_all_codecs() {
    let c = addressed();
    c.set("nul", ValueData::Null).expect("set should succeed");
    c.set("flag", true).expect("set should succeed");
    c.set("s16", -1234i16).expect("set should succeed");
    c.set("u16", 60_000u16).expect("set should succeed");
    c.set("s32", i32::MIN).expect("set should succeed");
    c.set("u32", u32::MAX).expect("set should succeed");
    c.set("l", ValueData::long(-2_000_000)).expect("set should succeed");
    c.set("ul", 2_000_000u64).expect("set should succeed");
    c.set("ll", ValueData::llong(i64::MIN)).expect("set should succeed");
    c.set("ull", ValueData::ULLong(u64::MAX)).expect("set should succeed");
    c.set("f", 3.5f32).expect("set should succeed");
    c.set("d", -0.125f64).expect("set should succeed");
    c.set("blob", ValueData::bytes(&[0u8, 1, 2, 253, 254, 255])).expect("set should succeed");
    c.set("text", "多言語 text with ünïcode").expect("set should succeed");
    assert_round_trips(&c);
}

#[test]
fn test_zero_length_payloads_all_codecs() {
    let c = Container::new();
    c.set("empty_str", "").expect("set should succeed");
    c.set("empty_bytes", ValueData::bytes(&[])).expect("set should succeed");
    c.set("empty_array", ValueArray::empty(ValueKind::Long)).expect("set should succeed");
    assert_round_trips(&c);
}

#[test]
fn test_duplicate_names_preserved_all_codecs() {
    let c = Container::new();
    c.bulk_insert(vec![
        Value::new("dup", 1i32),
        Value::new("solo", "between"),
        Value::new("dup", 2i32),
        Value::new("dup", 3i32),
    ])
    .expect("bulk insert should succeed");
    assert_round_trips(&c);

    let json = c.to_json().expect("json encode should succeed");
    let restored = Container::from_json(&json).expect("json decode should succeed");
    assert_eq!(restored.len(), 4);
    assert_eq!(restored.get::<i32>("dup").expect("get should succeed"), 1);
}

#[test]
fn test_nested_containers_and_arrays_all_codecs() {
    let grandchild = Container::builder()
        .message_type("leaf")
        .value("depth", 2i32)
        .build()
        .expect("builder should assemble");
    let child = Container::builder()
        .message_type("middle")
        .value("depth", 1i32)
        .value("down", ValueData::from(grandchild))
        .build()
        .expect("builder should assemble");
    let root = addressed();
    root.set("down", ValueData::from(child)).expect("set should succeed");
    root.set(
        "temps",
        ValueArray::new(
            ValueKind::Double,
            vec![ValueData::Double(20.5), ValueData::Double(21.0)],
        )
        .expect("array should assemble"),
    )
    .expect("set should succeed");
    root.set(
        "tags",
        ValueArray::new(
            ValueKind::String,
            vec![ValueData::string("hot"), ValueData::string("")],
        )
        .expect("array should assemble"),
    )
    .expect("set should succeed");
    assert_round_trips(&root);
}

#[test]
fn test_escape_heavy_strings_json_and_xml() {
    // Every JSON escape trigger plus XML entity triggers; only XML-legal
    // control characters so both parsers accept the document.
    let tricky = "quote:\" backslash:\\ newline:\n return:\r tab:\t amp:& lt:< gt:> apos:'";
    let c = Container::new();
    c.set("tricky", tricky).expect("set should succeed");

    let json = c.to_json().expect("json encode should succeed");
    let from_json = Container::from_json(&json).expect("json decode should succeed");
    assert_eq!(
        from_json.get::<String>("tricky").expect("get should succeed"),
        tricky
    );

    let xml = c.to_xml().expect("xml encode should succeed");
    let from_xml = Container::from_xml(&xml).expect("xml decode should succeed");
    assert_eq!(
        from_xml.get::<String>("tricky").expect("get should succeed"),
        tricky
    );
}

#[test]
fn test_json_escape_literal_form() {
    // End-to-end scenario: the emitted text must contain the exact escaped
    // form, and parsing restores identical bytes.
    let c = Container::new();
    c.set("msg", "Hello\n\"world\"").expect("set should succeed");
    let json = c.to_json().expect("json encode should succeed");
    assert!(json.contains(r#""msg""#));
    assert!(json.contains(r#""Hello\n\"world\"""#), "emission was {json}");
    let restored = Container::from_json(&json).expect("json decode should succeed");
    assert_eq!(
        restored.get::<String>("msg").expect("get should succeed"),
        "Hello\n\"world\""
    );
}

#[test]
fn test_xml_entity_literal_form() {
    let c = Container::builder()
        .source("a<b&c>", "")
        .build()
        .expect("builder should assemble");
    let xml = c.to_xml().expect("xml encode should succeed");
    assert!(
        xml.contains("<source_id>a&lt;b&amp;c&gt;</source_id>"),
        "emission was {xml}"
    );
}

#[test]
fn test_int32_boundary_kind_preservation() {
    // 64-bit signed values at the int32 boundary keep their logical kind
    // through every codec: in-range `long` stays long, out-of-range
    // normalizes to llong, and an llong tag is always authoritative.
    let cases: [(i64, ValueKind, ValueKind); 4] = [
        (i64::from(i32::MAX), ValueKind::Long, ValueKind::Long),
        (i64::from(i32::MIN), ValueKind::Long, ValueKind::Long),
        (i64::from(i32::MAX) + 1, ValueKind::Long, ValueKind::LLong),
        (i64::from(i32::MIN) - 1, ValueKind::Long, ValueKind::LLong),
    ];
    for (value, stored, expected) in cases {
        let c = Container::new();
        let data = match stored {
            ValueKind::Long => ValueData::long(value),
            _ => ValueData::llong(value),
        };
        c.set("n", data).expect("set should succeed");

        let binary = Container::from_bytes(&c.to_bytes().expect("encode should succeed"))
            .expect("decode should succeed");
        assert_eq!(
            binary.get_value("n").expect("get should succeed").kind(),
            expected,
            "binary kind for {value}"
        );
        assert_eq!(binary.get::<i64>("n").expect("get should succeed"), value);

        let json = Container::from_json(&c.to_json().expect("encode should succeed"))
            .expect("decode should succeed");
        assert_eq!(
            json.get_value("n").expect("get should succeed").kind(),
            expected,
            "json kind for {value}"
        );

        let packed = Container::from_msgpack(&c.to_msgpack().expect("encode should succeed"))
            .expect("decode should succeed");
        assert_eq!(
            packed.get_value("n").expect("get should succeed").kind(),
            expected,
            "msgpack kind for {value}"
        );
    }
}

#[test]
fn test_llong_kind_preserved_for_small_values() {
    let c = Container::new();
    c.set("n", ValueData::llong(42)).expect("set should succeed");
    assert_round_trips(&c);
    let restored = Container::from_bytes(&c.to_bytes().expect("encode should succeed"))
        .expect("decode should succeed");
    assert_eq!(
        restored.get_value("n").expect("get should succeed").kind(),
        ValueKind::LLong
    );
}

#[test]
fn test_detect_format_every_codec() {
    let c = addressed();
    c.set("k", 1i32).expect("set should succeed");

    let binary = c.to_bytes().expect("encode should succeed");
    assert_eq!(detect_format(&binary), Some(Format::Binary));

    let json = c.to_json().expect("encode should succeed");
    assert_eq!(detect_format(json.as_bytes()), Some(Format::Json));

    let xml = c.to_xml().expect("encode should succeed");
    assert_eq!(detect_format(xml.as_bytes()), Some(Format::Xml));

    let packed = c.to_msgpack().expect("encode should succeed");
    assert_eq!(detect_format(&packed), Some(Format::MessagePack));

    assert_eq!(detect_format(b"{\"a\":1}"), Some(Format::Json));
}

#[test]
fn test_deserialize_auto_dispatches() {
    let c = addressed();
    c.set("k", "auto").expect("set should succeed");

    for bytes in [
        c.to_bytes().expect("encode should succeed"),
        c.to_json().expect("encode should succeed").into_bytes(),
        c.to_xml().expect("encode should succeed").into_bytes(),
        c.to_msgpack().expect("encode should succeed"),
    ] {
        let restored = Container::deserialize_auto(&bytes).expect("auto parse should succeed");
        assert_eq!(restored, c);
    }
}

#[test]
fn test_byte_stable_emission() {
    let c = addressed();
    c.set("a", 1i32).expect("set should succeed");
    c.set("b", 0.5f64).expect("set should succeed");
    c.set("c", "stable").expect("set should succeed");

    assert_eq!(
        c.to_bytes().expect("encode should succeed"),
        c.to_bytes().expect("encode should succeed")
    );
    assert_eq!(
        c.to_json().expect("encode should succeed"),
        c.to_json().expect("encode should succeed")
    );
    assert_eq!(
        c.to_xml().expect("encode should succeed"),
        c.to_xml().expect("encode should succeed")
    );
    assert_eq!(
        c.to_msgpack().expect("encode should succeed"),
        c.to_msgpack().expect("encode should succeed")
    );

    // A logically identical rebuild emits identical bytes.
    let rebuilt = addressed();
    rebuilt.set("a", 1i32).expect("set should succeed");
    rebuilt.set("b", 0.5f64).expect("set should succeed");
    rebuilt.set("c", "stable").expect("set should succeed");
    assert_eq!(
        c.to_bytes().expect("encode should succeed"),
        rebuilt.to_bytes().expect("encode should succeed")
    );
}

#[test]
fn test_randomized_containers_round_trip() {
    // Seeded generator: failures reproduce.
    let mut rng = fastrand::Rng::with_seed(0x5EED_CAFE);
    for round in 0..50 {
        let c = Container::builder()
            .source(format!("src-{round}"), "s")
            .target(format!("dst-{round}"), "t")
            .message_type("fuzz")
            .version("1")
            .build()
            .expect("builder should assemble");
        for i in 0..rng.usize(1..20) {
            let name = format!("f{i}");
            let data = match rng.u8(0..10) {
                0 => ValueData::Null,
                1 => ValueData::from(rng.bool()),
                2 => ValueData::from(rng.i16(..)),
                3 => ValueData::from(rng.u32(..)),
                4 => ValueData::llong(rng.i64(..)),
                5 => ValueData::from(rng.u64(..)),
                6 => ValueData::from(f64::from_bits(0x3FF0_0000_0000_0000 | rng.u64(0..1 << 20))),
                7 => {
                    let len = rng.usize(0..200);
                    let bytes: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
                    ValueData::from(bytes)
                }
                8 => {
                    let len = rng.usize(0..100);
                    let text: String = (0..len).map(|_| rng.alphanumeric()).collect();
                    ValueData::string(&text)
                }
                _ => ValueData::from(rng.i32(..)),
            };
            c.set(&name, data).expect("set should succeed");
        }
        assert_round_trips(&c);
    }
}

#[test]
fn test_nested_share_through_round_trip() {
    // A container referenced twice serializes twice (shared reference,
    // acyclic) and restores as two equal children.
    let shared = Arc::new(
        Container::builder()
            .message_type("shared")
            .value("v", 9i32)
            .build()
            .expect("builder should assemble"),
    );
    let c = Container::new();
    c.set("left", ValueData::Container(shared.clone())).expect("set should succeed");
    c.set("right", ValueData::Container(shared)).expect("set should succeed");

    assert_round_trips(&c);
    let restored = Container::from_bytes(&c.to_bytes().expect("encode should succeed"))
        .expect("decode should succeed");
    let left = restored.get::<Arc<Container>>("left").expect("get should succeed");
    let right = restored.get::<Arc<Container>>("right").expect("get should succeed");
    assert_eq!(left.as_ref(), right.as_ref());
}
