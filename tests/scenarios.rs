//! End-to-end scenarios through the public facade
//!
//! Each test drives a container the way a messaging peer would: build,
//! serialize, ship, decode, validate.

use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;
use vessel::{
    codec_for, detect_format, BlockPool, ContainerConfig, ContainerSchema, Document, Error, Format,
    IndexedStorage, MemoryPool, NamedValue, Serializer, ValidationCode, Value, ValueContainer,
    ValueKind,
};

/// Route library logs to the test harness; repeated calls are no-ops
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_name_and_age_survive_text_round_trip() {
    init_tracing();
    let c = ValueContainer::new();
    c.set("name", "Alice").unwrap().set("age", 30).unwrap();

    let bytes = c.serialize(Format::Text).unwrap();
    let restored = ValueContainer::new();
    restored.deserialize(&bytes).unwrap();

    assert_eq!(restored.get::<i64>("age"), Ok(30));
    assert_eq!(restored.get::<String>("name"), Ok("Alice".to_string()));
}

#[test]
fn test_untyped_header_omits_routing_ids() {
    let c = ValueContainer::new();
    c.set("k", 1).unwrap();
    let text = c.serialize_string(Format::Text).unwrap();
    assert_eq!(
        text,
        "@header={{[5,data_container];[6,1.0];}};@data={{[k,4,1];}};"
    );

    c.set_message_type("order");
    c.set_source("a", "b");
    let text = c.serialize_string(Format::Text).unwrap();
    assert!(text.starts_with("@header={{[1,];[2,];[3,a];[4,b];[5,order];[6,1.0];}};"));
}

#[test]
fn test_routed_message_reply() {
    let request = ValueContainer::new();
    request.set_message_type("ping");
    request.set_source("client", "1");
    request.set_target("server", "main");
    request.set("seq", 7u32).unwrap();

    let wire = request.serialize(Format::MsgPack).unwrap();
    let reply = ValueContainer::new();
    reply.deserialize(&wire).unwrap();
    reply.swap_header();
    reply.set_message_type("pong");

    assert_eq!(reply.source_id(), "server");
    assert_eq!(reply.target_id(), "client");
    assert_eq!(reply.target_sub_id(), "1");
    assert_eq!(reply.get::<u32>("seq").unwrap(), 7);
}

#[test]
fn test_json_coarsens_integer_width() {
    let c = ValueContainer::new();
    c.set("small", 5i16).unwrap().set("big", i64::MAX).unwrap();

    let json = c.serialize(Format::Json).unwrap();
    assert_eq!(detect_format(&json), Some(Format::Json));
    let restored = ValueContainer::new();
    restored.deserialize(&json).unwrap();

    assert_eq!(restored.get_value("small").unwrap().kind(), ValueKind::Int);
    assert_eq!(restored.get::<i16>("small").unwrap(), 5);
    assert_eq!(restored.get::<i64>("big").unwrap(), i64::MAX);
}

#[test]
fn test_xml_reads_back_strings() {
    let c = ValueContainer::new();
    c.set("qty", 3).unwrap().set("note", "a < b & c").unwrap();

    let xml = c.serialize_string(Format::Xml).unwrap();
    assert!(xml.contains("a &lt; b &amp; c"));
    let restored = ValueContainer::new();
    restored.deserialize(xml.as_bytes()).unwrap();

    assert_eq!(restored.get::<String>("qty").unwrap(), "3");
    assert_eq!(restored.get::<String>("note").unwrap(), "a < b & c");
}

#[test]
fn test_text_format_rejects_pair_terminator() {
    let c = ValueContainer::new();
    c.set("bad", "x];y").unwrap();

    let err = c.serialize(Format::Text).unwrap_err();
    assert!(matches!(err, Error::EncodingError(_)));
    assert_eq!(err.code(), 207);
    // other formats carry it fine
    assert!(c.serialize(Format::MsgPack).is_ok());
}

#[test]
fn test_nested_container_round_trips() {
    let c = ValueContainer::new();
    let line = Document::new().with("sku", "A-1").with("qty", 2);
    c.set("line", line.clone()).unwrap();

    let restored = ValueContainer::new();
    restored.deserialize(&c.serialize(Format::Text).unwrap()).unwrap();
    let nested: Document = restored.get("line").unwrap();
    assert_eq!(nested, line);

    // MessagePack carries the child as bytes of its own encoding
    let restored = ValueContainer::new();
    restored.deserialize(&c.serialize(Format::MsgPack).unwrap()).unwrap();
    let blob: Vec<u8> = restored.get("line").unwrap();
    let nested = codec_for(Format::MsgPack).deserialize(&blob).unwrap();
    assert_eq!(nested.get("sku").unwrap().value, Value::from("A-1"));
    assert_eq!(nested.get("qty").unwrap().value.as_i64(), Some(2));
}

// ============================================================================
// Batch, duplicates and CAS
// ============================================================================

#[test]
fn test_batch_operations_on_indexed_policy() {
    let c = ValueContainer::<IndexedStorage>::with_policy();
    let values: Vec<NamedValue> = (0..1_000)
        .map(|i| NamedValue::new(format!("k{}", i), i))
        .collect();
    c.bulk_insert(values).unwrap();

    let got = c.get_batch(&["k999", "nope", "k0"]);
    assert_eq!(got[0].as_ref().unwrap().value, Value::Int(999));
    assert!(got[1].is_none());
    assert_eq!(got[2].as_ref().unwrap().value, Value::Int(0));

    assert_eq!(c.remove_batch(&["k1", "k2", "nope"]), 2);
    assert_eq!(c.len(), 998);
}

/// Duplicate names from bulk_insert are kept; the first entry wins on read
/// and every codec writes all of them.
#[test]
fn test_duplicate_names_from_bulk_insert() {
    init_tracing();
    let c = ValueContainer::new();
    c.bulk_insert(vec![NamedValue::new("tag", "a"), NamedValue::new("tag", "b")])
        .unwrap();
    assert_eq!(c.len(), 2);
    assert_eq!(c.get::<String>("tag").unwrap(), "a");

    let restored = ValueContainer::new();
    restored
        .deserialize(&c.serialize(Format::Text).unwrap())
        .unwrap();
    assert_eq!(restored.len(), 2);
    assert_eq!(restored.get_view("tag").unwrap().as_str(), Some("a"));

    // a later set replaces only the first entry
    c.set("tag", "c").unwrap();
    let tags: Vec<Value> = c.values().into_iter().map(|v| v.value).collect();
    assert_eq!(tags, vec![Value::from("c"), Value::from("b")]);
}

#[test]
fn test_cas_race_through_facade() {
    const THREADS: usize = 12;
    let c = Arc::new(ValueContainer::new());
    c.set("lock", false).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let c = Arc::clone(&c);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                c.update_if("lock", &Value::Bool(false), true)
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&won| won)
        .count();
    assert_eq!(wins, 1);
    assert!(c.get::<bool>("lock").unwrap());
}

// ============================================================================
// Schema, files and pools
// ============================================================================

#[test]
fn test_age_schema_reports_out_of_range() {
    let schema = ContainerSchema::new()
        .require("age", ValueKind::Int)
        .range_int64("age", 0, 150);
    let c = ValueContainer::new();
    c.set("age", 200).unwrap();

    let errors = schema.validate_all(&c);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::OutOfRange);
    assert_eq!(errors[0].field, "age");
}

#[test]
fn test_file_round_trip_with_configured_format() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join(vessel::CONFIG_FILE_NAME);
    std::fs::write(&config_path, "default_format = \"msgpack\"\n").unwrap();
    let config = ContainerConfig::from_file(&config_path).unwrap();

    let c = ValueContainer::new().with_config(config);
    c.set("payload", vec![0xde_u8, 0xad]).unwrap();
    let path = dir.path().join("message.bin");
    vessel::save(&c, &path, c.config().default_format).unwrap();

    let loaded = vessel::load(&path).unwrap();
    assert_eq!(loaded.get::<Vec<u8>>("payload").unwrap(), vec![0xde, 0xad]);
}

#[test]
fn test_injected_pools_are_isolated() {
    let pool_a: Arc<dyn MemoryPool> = Arc::new(BlockPool::default());
    let pool_b: Arc<dyn MemoryPool> = Arc::new(BlockPool::default());
    let a = ValueContainer::new().with_pool(pool_a);
    let b = ValueContainer::new().with_pool(pool_b);
    a.set("x", 1).unwrap();

    for _ in 0..3 {
        a.copy(true).unwrap();
    }
    assert_eq!(a.pool_stats().hits + a.pool_stats().misses, 3);
    assert_eq!(b.pool_stats(), Default::default());
}

// ============================================================================
// Properties
// ============================================================================

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::ULong),
        prop::num::f64::NORMAL.prop_map(Value::Double),
        "[a-zA-Z0-9 ,.]{0,24}".prop_map(Value::String),
    ]
}

proptest! {
    /// Text round trip through the container keeps every value exactly
    #[test]
    fn prop_container_text_round_trip(
        entries in prop::collection::btree_map("[a-z]{1,8}", value_strategy(), 0..12)
    ) {
        let c = ValueContainer::new();
        for (k, v) in &entries {
            c.set(k.as_str(), v.clone()).unwrap();
        }
        let restored = ValueContainer::new();
        restored.deserialize(&c.serialize(Format::Text).unwrap()).unwrap();
        prop_assert_eq!(restored.snapshot().unwrap(), c.snapshot().unwrap());
    }

    /// Setting the same pair twice equals setting it once
    #[test]
    fn prop_upsert_idempotent(key in "[a-z]{1,8}", value in value_strategy()) {
        let once = ValueContainer::new();
        once.set(key.as_str(), value.clone()).unwrap();
        let twice = ValueContainer::new();
        twice.set(key.as_str(), value.clone()).unwrap();
        twice.set(key.as_str(), value).unwrap();
        prop_assert_eq!(once.snapshot().unwrap(), twice.snapshot().unwrap());
    }

    /// get_batch answers in input order
    #[test]
    fn prop_get_batch_order(keys in prop::collection::vec("[a-e]", 0..10)) {
        let c = ValueContainer::new();
        c.set("a", 1).unwrap().set("c", 3).unwrap();
        let results = c.get_batch(&keys);
        prop_assert_eq!(results.len(), keys.len());
        for (key, result) in keys.iter().zip(&results) {
            prop_assert_eq!(result.as_ref().map(|v| v.name.as_str()), c.contains(key).then(|| key.as_str()));
        }
    }
}
