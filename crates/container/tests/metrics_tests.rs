//! Global metrics registry wired into container operations
//!
//! Kept in its own test binary because it toggles process-wide state.

use vessel_container::{metrics, Operation, ValueContainer};
use vessel_wire::Format;

#[test]
fn test_container_operations_are_counted_when_enabled() {
    let registry = metrics::global();
    let c = ValueContainer::new();

    metrics::set_enabled(false);
    registry.reset();
    c.set("k", 1).unwrap();
    assert_eq!(registry.count(Operation::Write), 0);

    metrics::set_enabled(true);
    c.set("k", 2).unwrap();
    let _: i32 = c.get("k").unwrap();
    let bytes = c.serialize(Format::Text).unwrap();
    c.deserialize(&bytes).unwrap();
    let _copy = c.copy(true).unwrap();
    metrics::set_enabled(false);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.operations.writes, 1);
    assert_eq!(snapshot.operations.reads, 1);
    assert_eq!(snapshot.operations.serializations, 1);
    assert_eq!(snapshot.operations.deserializations, 1);
    assert_eq!(snapshot.operations.copies, 1);
    assert_eq!(snapshot.latency.write.count, 1);

    let text = registry.to_prometheus();
    assert!(text.contains("container_operations_total{operation=\"serialize\"} 1"));
    assert!(registry.to_json().contains("\"deserializations\": 1"));
}
