use super::heap::*;
use super::snapshot::*;
use super::types::SolType;
use super::value::Value;

#[test]
fn restore_brings_back_the_first_state() {
    let mut heap = Heap::new();
    let x = heap.scalar("x", Scope::State, SolType::UInt(8), Value::uint(1, 8));
    let mut snapshots = SnapshotManager::new();

    assert!(snapshots.register(&heap, x));
    heap.set_value(x, Value::uint(2, 8)).unwrap();
    // A second patch does not overwrite the saved state.
    assert!(!snapshots.register(&heap, x));
    heap.set_value(x, Value::uint(3, 8)).unwrap();
    assert!(snapshots.contains(x));

    assert!(snapshots.restore(&mut heap, x));
    assert_eq!(heap.value(x), Value::uint(1, 8));
    assert!(snapshots.is_empty());
    assert!(!snapshots.restore(&mut heap, x));
}

#[test]
fn composites_are_saved_with_their_children() {
    let mut heap = Heap::new();
    let ty = SolType::array(SolType::UInt(8), None);
    let xs = heap.materialize("xs", Scope::State, &ty, Init::Zero).unwrap();
    let first = heap.push(xs, Some(Value::uint(5, 8))).unwrap();
    let mut snapshots = SnapshotManager::new();

    snapshots.register(&heap, xs);
    heap.set_value(first, Value::uint(6, 8)).unwrap();
    heap.resize(xs, 4, &SolType::UInt(8), Init::Bottom).unwrap();
    assert_eq!(heap.length(xs), Some(4));

    snapshots.restore(&mut heap, xs);
    assert_eq!(heap.length(xs), Some(1));
    assert_eq!(heap.value(first), Value::uint(5, 8));
}
