//! Schema validation against live containers

use proptest::prelude::*;
use vessel_container::ValueContainer;
use vessel_core::{Document, ValueKind};
use vessel_schema::{ContainerSchema, DecodeError, ValidationCode};
use vessel_wire::Format;

fn user_schema() -> ContainerSchema {
    ContainerSchema::new()
        .require("user_id", ValueKind::String)
        .pattern("user_id", "u[0-9]+")
        .require("age", ValueKind::Int)
        .range_int64("age", 0, 150)
        .optional("status", ValueKind::String)
        .one_of("status", ["active", "suspended"])
}

// ============================================================================
// Accumulation
// ============================================================================

#[test]
fn test_age_out_of_range_yields_single_error() {
    let schema = ContainerSchema::new()
        .require("age", ValueKind::Int)
        .range_int64("age", 0, 150);
    let c = ValueContainer::new();
    c.set("age", 200).unwrap();

    let errors = schema.validate_all(&c);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "age");
    assert_eq!(errors[0].code, ValidationCode::OutOfRange);
}

#[test]
fn test_three_violations_yield_three_errors() {
    let c = ValueContainer::new();
    c.set("user_id", "admin")
        .unwrap()
        .set("age", -1)
        .unwrap()
        .set("status", "deleted")
        .unwrap();

    let errors = user_schema().validate_all(&c);
    let found: Vec<(&str, ValidationCode)> =
        errors.iter().map(|e| (e.field.as_str(), e.code)).collect();
    assert_eq!(
        found,
        vec![
            ("user_id", ValidationCode::PatternMismatch),
            ("age", ValidationCode::OutOfRange),
            ("status", ValidationCode::NotAllowed),
        ]
    );

    let first = user_schema().validate(&c).unwrap();
    assert_eq!(first, errors[0]);
}

#[test]
fn test_valid_container_passes() {
    let c = ValueContainer::new();
    c.set("user_id", "u42").unwrap().set("age", 30).unwrap();
    assert!(user_schema().validate(&c).is_none());
}

// ============================================================================
// Container states
// ============================================================================

#[test]
fn test_lazy_container_is_validated_after_materializing() {
    let source = ValueContainer::new();
    source.set("user_id", "u1").unwrap().set("age", 151).unwrap();
    let bytes = source.serialize(Format::Text).unwrap();

    let lazy = ValueContainer::new();
    lazy.parse_lazy(&bytes).unwrap();
    let errors = user_schema().validate_all(&lazy);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ValidationCode::OutOfRange);
}

#[test]
fn test_undecodable_container_reports_missing_fields() {
    let lazy = ValueContainer::new();
    lazy.parse_lazy(b"@header={{[6,1.0];}};@data={{[age,4,old];}};")
        .unwrap();

    let errors = user_schema().validate_all(&lazy);
    assert_eq!(
        errors.iter().map(|e| e.code).collect::<Vec<_>>(),
        vec![ValidationCode::MissingRequired, ValidationCode::MissingRequired]
    );
}

#[test]
fn test_nested_container_after_round_trip() {
    let schema = ContainerSchema::new().require_nested(
        "address",
        ContainerSchema::new()
            .require("zip", ValueKind::String)
            .length("zip", 5, 5),
    );
    let c = ValueContainer::new();
    c.set("address", Document::new().with("zip", "1234"))
        .unwrap();

    let copy = c.copy(true).unwrap();
    let fields: Vec<String> = schema
        .validate_all(&copy)
        .into_iter()
        .map(|e| e.field)
        .collect();
    assert_eq!(fields, vec!["address", "address.zip"]);
}

// ============================================================================
// Schema-checked deserialize
// ============================================================================

fn encoded(pairs: &[(&str, i32)], user_id: &str) -> Vec<u8> {
    let c = ValueContainer::new();
    c.set("user_id", user_id).unwrap();
    for (name, value) in pairs {
        c.set(*name, *value).unwrap();
    }
    c.serialize(Format::MsgPack).unwrap()
}

#[test]
fn test_deserialize_validated_accepts_valid_input() {
    let target = ValueContainer::new();
    user_schema()
        .deserialize_validated(&target, &encoded(&[("age", 40)], "u7"))
        .unwrap();
    assert_eq!(target.get::<i32>("age").unwrap(), 40);
}

#[test]
fn test_deserialize_validated_reports_every_violation() {
    let target = ValueContainer::new();
    let err = user_schema()
        .deserialize_validated(&target, &encoded(&[("age", 200)], "root"))
        .unwrap_err();

    let codes: Vec<ValidationCode> = err.violations().iter().map(|e| e.code).collect();
    assert_eq!(
        codes,
        vec![ValidationCode::PatternMismatch, ValidationCode::OutOfRange]
    );
    assert_eq!(err.code(), ValidationCode::PatternMismatch.code());
    // decoded contents are kept for inspection
    assert_eq!(target.get::<i32>("age").unwrap(), 200);
}

#[test]
fn test_deserialize_validated_decode_failure_keeps_container() {
    let target = ValueContainer::new();
    target.set("user_id", "u1").unwrap().set("age", 3).unwrap();

    let err = user_schema()
        .deserialize_validated(&target, b"@data={{[age,4,old];}};")
        .unwrap_err();
    assert!(matches!(err, DecodeError::Deserialize(_)));
    assert_eq!(err.code(), 201);
    assert!(err.violations().is_empty());
    assert_eq!(target.get::<i32>("age").unwrap(), 3);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Out-of-range ages are reported exactly when outside the bounds
    #[test]
    fn prop_range_matches_bounds(age in any::<i32>()) {
        let c = ValueContainer::new();
        c.set("user_id", "u1").unwrap().set("age", age).unwrap();
        let errors = user_schema().validate_all(&c);
        let outside = !(0..=150).contains(&age);
        prop_assert_eq!(errors.len(), usize::from(outside));
    }

    /// Every missing required field is reported once, in schema order
    #[test]
    fn prop_missing_fields_in_order(present in proptest::collection::vec(any::<bool>(), 6)) {
        let names = ["a", "b", "c", "d", "e", "f"];
        let schema = names
            .iter()
            .fold(ContainerSchema::new(), |s, n| s.require(n, ValueKind::Bool));
        let c = ValueContainer::new();
        for (name, &here) in names.iter().zip(&present) {
            if here {
                c.set(*name, true).unwrap();
            }
        }

        let missing: Vec<String> = schema.validate_all(&c).into_iter().map(|e| e.field).collect();
        let expected: Vec<String> = names
            .iter()
            .zip(&present)
            .filter(|&(_, &here)| !here)
            .map(|(n, _)| n.to_string())
            .collect();
        prop_assert_eq!(missing, expected);
    }
}
