//! Round-trip properties of the wire codecs
//!
//! The text format must reproduce every document exactly. MessagePack must
//! reproduce it up to integer width, with nested containers read back as
//! their encoded bytes. JSON keeps names, order and string content.

use proptest::prelude::*;
use vessel_core::{Document, Header, NamedValue, Value};
use vessel_wire::{codec_for, detect_format, Format, JsonCodec, MsgPackCodec, Serializer, TextCodec};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i16>().prop_map(Value::Short),
        any::<u16>().prop_map(Value::UShort),
        any::<i32>().prop_map(Value::Int),
        any::<u32>().prop_map(Value::UInt),
        any::<i64>().prop_map(Value::Long),
        any::<u64>().prop_map(Value::ULong),
        any::<i64>().prop_map(Value::LLong),
        any::<u64>().prop_map(Value::ULLong),
        prop::num::f32::NORMAL.prop_map(Value::Float),
        prop::num::f64::NORMAL.prop_map(Value::Double),
        "[a-zA-Z0-9 _.:{}-]{0,16}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..16)
            .prop_filter("no pair terminator", |b| !b.windows(2).any(|w| w == b"];"))
            .prop_map(Value::Bytes),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z][a-z0-9_]{0,6}", inner), 0..4).prop_map(|pairs| {
                let mut doc = Document::new();
                for (name, value) in pairs {
                    doc.push(NamedValue { name, value });
                }
                Value::from(doc)
            }),
        ]
    })
}

fn header() -> impl Strategy<Value = Header> {
    (
        prop_oneof![Just("data_container".to_string()), "[a-z_ ]{1,10}"],
        "[a-z0-9. ]{1,4}",
        "[a-z0-9 -]{0,8}",
        "[a-z0-9 -]{0,8}",
    )
        .prop_map(|(message_type, version, source, target)| {
            let mut header = Header {
                message_type,
                version,
                ..Header::default()
            };
            if !header.is_untyped() {
                header.source_id = source;
                header.target_id = target;
            }
            header
        })
}

/// Names valid in every format
const PORTABLE_NAME: &str = "[a-z][a-z0-9_]{0,8}";

/// Names with surrounding and inner spaces, valid in text and MessagePack
const SPACED_NAME: &str = "[a-z ][a-z0-9_ ]{0,8}";

fn document() -> impl Strategy<Value = Document> {
    document_named(PORTABLE_NAME)
}

fn document_named(names: &'static str) -> impl Strategy<Value = Document> {
    (header(), prop::collection::vec((names, value()), 0..8)).prop_map(
        |(header, pairs)| {
            let mut doc = Document::with_header(header);
            for (name, value) in pairs {
                doc.push(NamedValue { name, value });
            }
            doc
        },
    )
}

/// What MessagePack gives back for a value
fn canonical(value: &Value) -> Value {
    match value {
        Value::Container(doc) => Value::Bytes(MsgPackCodec.serialize(doc).unwrap()),
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => match other.as_integer() {
            Some(v) => match (i32::try_from(v), i64::try_from(v)) {
                (Ok(v), _) => Value::Int(v),
                (_, Ok(v)) => Value::Long(v),
                _ => Value::ULong(v as u64),
            },
            None => other.clone(),
        },
    }
}

fn canonical_doc(doc: &Document) -> Document {
    Document {
        header: doc.header.clone(),
        values: doc
            .values
            .iter()
            .map(|nv| NamedValue {
                name: nv.name.clone(),
                value: canonical(&nv.value),
            })
            .collect(),
    }
}

proptest! {
    #[test]
    fn text_round_trip_is_lossless(doc in document_named(SPACED_NAME)) {
        let bytes = TextCodec.serialize(&doc).unwrap();
        prop_assert_eq!(detect_format(&bytes), Some(Format::Text));
        prop_assert_eq!(TextCodec.deserialize(&bytes).unwrap(), doc);
    }

    #[test]
    fn msgpack_round_trip_keeps_all_but_width(doc in document_named(SPACED_NAME)) {
        let bytes = MsgPackCodec.serialize(&doc).unwrap();
        prop_assert_eq!(detect_format(&bytes), Some(Format::MsgPack));
        prop_assert_eq!(MsgPackCodec.deserialize(&bytes).unwrap(), canonical_doc(&doc));
    }

    #[test]
    fn json_round_trip_keeps_names_and_strings(doc in document()) {
        let bytes = JsonCodec.serialize(&doc).unwrap();
        let back = JsonCodec.deserialize(&bytes).unwrap();
        prop_assert_eq!(&back.header, &doc.header);
        prop_assert_eq!(back.len(), doc.len());
        for (a, b) in back.values.iter().zip(doc.values.iter()) {
            prop_assert_eq!(&a.name, &b.name);
            if let Value::String(s) = &b.value {
                prop_assert_eq!(a.value.as_str(), Some(s.as_str()));
            }
        }
    }

    #[test]
    fn every_codec_output_is_detected(doc in document()) {
        for format in Format::ALL {
            let bytes = codec_for(format).serialize(&doc).unwrap();
            prop_assert_eq!(detect_format(&bytes), Some(format));
        }
    }
}
