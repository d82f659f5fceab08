//! Zero-copy view accuracy
//!
//! A view's raw bytes must equal the text encoding of the value that the
//! same key materializes to.

use vessel_container::ValueContainer;
use vessel_core::{Document, NamedValue, Value, ValueKind};
use vessel_wire::{text, Format};

fn every_kind() -> ValueContainer {
    let c = ValueContainer::new();
    let nested = Document::new().with("inner", 5).with("label", "deep");
    c.set_all(&[
        NamedValue::new("null", ()),
        NamedValue::new("flag", true),
        NamedValue::new("short", -12i16),
        NamedValue::new("ushort", 65_000u16),
        NamedValue::new("int", -70_000i32),
        NamedValue::new("uint", 4_000_000_000u32),
        NamedValue::new("long", i64::MIN),
        NamedValue::new("ulong", u64::MAX),
        NamedValue::new("llong", Value::LLong(-5)),
        NamedValue::new("ullong", Value::ULLong(5)),
        NamedValue::new("float", 0.1f32),
        NamedValue::new("double", -2.5e-300f64),
        NamedValue::new("string", "hello, world [x]"),
        NamedValue::new("bytes", vec![0u8, 1, 2, 255]),
        NamedValue::new("container", nested),
        NamedValue::new("array", vec![Value::Int(1), Value::from("two")]),
    ])
    .unwrap();
    c
}

fn reloaded(source: &ValueContainer) -> ValueContainer {
    let bytes = source.serialize(Format::Text).unwrap();
    let c = ValueContainer::new();
    c.deserialize(&bytes).unwrap();
    c
}

#[test]
fn test_view_bytes_match_formatted_value() {
    let c = reloaded(&every_kind());
    assert!(c.ensure_index_built().unwrap());

    for key in c.keys() {
        let view = c.get_view(&key).unwrap();
        let value = c.get_value(&key).unwrap();
        assert_eq!(view.kind(), value.kind(), "kind of {}", key);

        let mut formatted = Vec::new();
        text::encode_value(&key, &value.value, &mut formatted).unwrap();
        assert_eq!(view.raw(), formatted.as_slice(), "bytes of {}", key);
        assert_eq!(view.to_value().unwrap(), value.value, "value of {}", key);
    }
}

#[test]
fn test_views_cover_every_kind_in_order() {
    let source = every_kind();
    let c = reloaded(&source);

    let views = c.views();
    let kinds: Vec<ValueKind> = views.iter().map(|v| v.kind()).collect();
    assert_eq!(kinds, ValueKind::ALL.to_vec());
    let names: Vec<&str> = views.iter().map(|v| v.name()).collect();
    assert_eq!(names, source.keys());
}

#[test]
fn test_view_offsets_point_into_serialized_bytes() {
    let source = every_kind();
    let bytes = source.serialize(Format::Text).unwrap();
    let c = ValueContainer::new();
    c.parse_lazy(&bytes).unwrap();

    for view in c.views() {
        let range = view.offset()..view.offset() + view.len();
        assert_eq!(&bytes[range], view.raw());
    }
    // views never force materialization
    assert!(!c.is_materialized());
}

#[test]
fn test_null_view_is_empty() {
    let c = reloaded(&every_kind());
    let view = c.get_view("null").unwrap();
    assert!(view.is_empty());
    assert_eq!(view.to_value().unwrap(), Value::Null);
}

#[test]
fn test_non_text_deserialize_has_no_views() {
    let bytes = every_kind().serialize(Format::MsgPack).unwrap();
    let c = ValueContainer::new();
    c.deserialize(&bytes).unwrap();

    assert!(!c.has_raw_buffer());
    assert!(c.get_view("int").is_none());
    assert!(c.views().is_empty());
    assert!(!c.ensure_index_built().unwrap());
}
