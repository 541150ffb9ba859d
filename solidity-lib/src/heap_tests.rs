use super::error::Error;
use super::heap::*;
use super::types::SolType;
use super::value::Value;
use analysis::domains::*;
use num_bigint::BigInt;

fn uint_array(length: Option<u64>) -> SolType {
    SolType::array(SolType::uint256(), length)
}

fn heap_with_defs() -> Heap {
    let mut heap = Heap::new();
    let point = StructDef::new("Point")
        .with_member("x", SolType::UInt(8))
        .and_then(|def| def.with_member("tags", uint_array(None)))
        .unwrap();
    heap.defs.define_struct(point);
    heap.defs
        .define_enum(EnumDef::new("Status", &["Open", "Closed", "Paid"]).unwrap());
    heap
}

#[test]
fn defaults_depend_on_where_a_variable_lives() {
    let mut heap = Heap::new();
    let state = heap.materialize("total", Scope::State, &SolType::uint256(), Init::Zero).unwrap();
    let param = heap.materialize("amount", Scope::Param, &SolType::uint256(), Init::Top).unwrap();
    let balances = heap
        .materialize(
            "balances",
            Scope::State,
            &SolType::mapping(SolType::Address, SolType::uint256()),
            Init::Zero,
        )
        .unwrap();
    let entry = heap.get_or_create(balances, "msg.sender").unwrap();

    assert_eq!(heap.value(state), Value::uint(0, 256));
    let max = (BigInt::from(1u8) << 256usize) - 1;
    assert_eq!(heap.value(param), Value::uint_range(0, max, 256));
    assert!(heap.value(entry).is_bottom());
    assert_ne!(heap.value(state), heap.value(param));
    assert_ne!(heap.value(param), heap.value(entry));
    assert_ne!(heap.value(state), heap.value(entry));
}

#[test]
fn address_parameters_are_unknown_and_strings_symbolic() {
    let mut heap = Heap::new();
    let to = heap.materialize("to", Scope::Param, &SolType::Address, Init::Top).unwrap();
    let name = heap.materialize("name", Scope::Param, &SolType::String, Init::Top).unwrap();
    assert_eq!(heap.value(to), Value::Address(AddressSet::top_()));
    assert_eq!(heap.value(name), Value::Symbolic("symbol_name".to_owned()));
}

#[test]
fn dynamic_arrays_grow_on_access() {
    let mut heap = Heap::new();
    let xs = heap.materialize("xs", Scope::State, &uint_array(None), Init::Zero).unwrap();
    heap.resize(xs, 2, &SolType::uint256(), Init::Zero).unwrap();

    let fifth = heap.get_or_create_element(xs, 5).unwrap();
    assert_eq!(heap.length(xs), Some(6));
    let elements = heap.elements(xs).unwrap().to_vec();
    assert_eq!(elements[5], fifth);
    assert_eq!(heap.value(elements[1]), Value::uint(0, 256));
    for element in &elements[2..] {
        assert!(heap.value(*element).is_top());
    }
    assert_eq!(heap.get(fifth).identifier, "xs[5]");
}

#[test]
fn static_arrays_do_not_grow() {
    let mut heap = Heap::new();
    let xs = heap.materialize("xs", Scope::State, &uint_array(Some(3)), Init::Zero).unwrap();
    assert_eq!(heap.length(xs), Some(3));
    assert_eq!(
        heap.get_or_create_element(xs, 3),
        Err(Error::IndexOutOfBounds {
            array: "xs".to_owned(),
            index: "3".to_owned(),
            length: 3,
        })
    );
}

#[test]
fn dynamic_arrays_stop_growing_at_the_limit() {
    let mut heap = Heap::new().with_max_array_length(8);
    let xs = heap.materialize("xs", Scope::State, &uint_array(None), Init::Zero).unwrap();
    assert!(heap.get_or_create_element(xs, 7).is_ok());
    assert_eq!(heap.length(xs), Some(8));
    for index in [8, 1_000_000_000_000, u64::MAX] {
        assert_eq!(
            heap.get_or_create_element(xs, index),
            Err(Error::IndexOutOfBounds {
                array: "xs".to_owned(),
                index: index.to_string(),
                length: 8,
            })
        );
    }
    assert_eq!(heap.length(xs), Some(8));
    assert!(matches!(heap.resize(xs, 9, &SolType::uint256(), Init::Zero), Err(Error::Unsupported(_))));
    assert_eq!(
        heap.materialize("big", Scope::State, &uint_array(Some(9)), Init::Zero),
        Err(Error::UnsupportedType("uint256[9]".to_owned()))
    );
}

#[test]
fn mapping_entries_are_created_once() {
    let mut heap = Heap::new();
    let ty = SolType::mapping(SolType::uint256(), SolType::Bool);
    let flags = heap.materialize("flags", Scope::State, &ty, Init::Zero).unwrap();
    let first = heap.get_or_create(flags, "7").unwrap();
    let second = heap.get_or_create(flags, "7").unwrap();
    assert_eq!(first, second);
    assert_eq!(heap.entries(flags).unwrap().len(), 1);
    assert_eq!(heap.get(first).identifier, "flags[7]");
}

#[test]
fn structs_are_materialized_recursively() {
    let mut heap = heap_with_defs();
    let p = heap
        .materialize("p", Scope::Local, &SolType::Named("Point".to_owned()), Init::Zero)
        .unwrap();
    let x = heap.member(p, "x").unwrap();
    let tags = heap.member(p, "tags").unwrap();
    assert_eq!(heap.value(x), Value::uint(0, 8));
    assert_eq!(heap.length(tags), Some(0));
    assert_eq!(
        heap.member(p, "y"),
        Err(Error::UnknownMember {
            container: "p".to_owned(),
            member: "y".to_owned(),
        })
    );
    assert_eq!(heap.subtree(p), vec![p, x, tags]);
}

#[test]
fn duplicate_members_are_rejected() {
    let def = StructDef::new("S")
        .with_member("a", SolType::Bool)
        .and_then(|def| def.with_member("a", SolType::Bool));
    assert_eq!(
        def,
        Err(Error::DuplicateMember {
            container: "S".to_owned(),
            member: "a".to_owned(),
        })
    );
    assert!(EnumDef::new("E", &["A", "A"]).is_err());
}

#[test]
fn enums_are_small_integers() {
    let mut heap = heap_with_defs();
    let ty = SolType::Named("Status".to_owned());
    let zero = heap.materialize("s", Scope::State, &ty, Init::Zero).unwrap();
    let any = heap.materialize("t", Scope::Param, &ty, Init::Top).unwrap();
    assert_eq!(heap.value(zero), Value::uint(0, 8));
    assert_eq!(heap.value(any), Value::uint_range(0, 2, 8));
    assert_eq!(heap.describe(zero), "Status.Open");
    assert_eq!(heap.describe(any), "[0, 2]");
    // Names that are neither structs nor enums are contracts.
    let token = heap.materialize("token", Scope::State, &SolType::Named("Token".to_owned()), Init::Zero).unwrap();
    assert_eq!(heap.value(token), Value::address(0));
}

#[test]
fn assign_object_copies() {
    let mut heap = Heap::new();
    let a = heap.materialize("a", Scope::Local, &uint_array(None), Init::Zero).unwrap();
    let b = heap.materialize("b", Scope::Local, &uint_array(None), Init::Zero).unwrap();
    heap.push(a, Some(Value::uint(1, 256))).unwrap();
    heap.assign_object(b, a).unwrap();
    let copied = heap.elements(b).unwrap()[0];
    heap.set_value(copied, Value::uint(9, 256)).unwrap();
    let original = heap.elements(a).unwrap()[0];
    assert_eq!(heap.value(original), Value::uint(1, 256));
    assert_eq!(heap.value(copied), Value::uint(9, 256));
}

#[test]
fn join_into_keeps_both_possibilities() {
    let mut heap = Heap::new();
    let a = heap.scalar("a", Scope::Local, SolType::UInt(8), Value::uint(1, 8));
    let b = heap.scalar("b", Scope::Local, SolType::UInt(8), Value::uint(5, 8));
    heap.join_into(a, b).unwrap();
    assert_eq!(heap.value(a), Value::uint_range(1, 5, 8));
    assert_eq!(heap.value(b), Value::uint(5, 8));
}

#[test]
fn havoc_and_reset() {
    let mut heap = heap_with_defs();
    let p = heap
        .materialize("p", Scope::State, &SolType::Named("Point".to_owned()), Init::Zero)
        .unwrap();
    let x = heap.member(p, "x").unwrap();
    let tags = heap.member(p, "tags").unwrap();
    heap.push(tags, Some(Value::uint(3, 256))).unwrap();

    heap.havoc(p).unwrap();
    assert!(heap.value(x).is_top());
    assert!(heap.value(heap.elements(tags).unwrap()[0]).is_top());

    heap.reset(p).unwrap();
    assert_eq!(heap.value(x), Value::uint(0, 8));
    assert_eq!(heap.length(tags), Some(0));
}

#[test]
fn push_and_pop() {
    let mut heap = Heap::new();
    let xs = heap.materialize("xs", Scope::State, &uint_array(None), Init::Zero).unwrap();
    let pushed = heap.push(xs, None).unwrap();
    assert_eq!(heap.value(pushed), Value::uint(0, 256));
    heap.push(xs, Some(Value::uint(4, 256))).unwrap();
    assert_eq!(heap.length(xs), Some(2));
    heap.pop(xs).unwrap();
    heap.pop(xs).unwrap();
    heap.pop(xs).unwrap();
    assert_eq!(heap.length(xs), Some(0));

    let fixed = heap.materialize("ys", Scope::State, &uint_array(Some(1)), Init::Zero).unwrap();
    assert!(heap.push(fixed, None).is_err());
}

#[test]
fn flatten_lists_every_leaf() {
    let mut heap = heap_with_defs();
    let p = heap
        .materialize("p", Scope::State, &SolType::Named("Point".to_owned()), Init::Zero)
        .unwrap();
    assert_eq!(
        heap.flatten(p, "p"),
        vec![
            ("p.x".to_owned(), "[0, 0]".to_owned()),
            ("p.tags".to_owned(), "[]".to_owned()),
        ]
    );
    let ty = SolType::mapping(SolType::uint256(), SolType::uint256());
    let m = heap.materialize("m", Scope::State, &ty, Init::Zero).unwrap();
    assert_eq!(heap.flatten(m, "m"), vec![("m".to_owned(), "{}".to_owned())]);
}

#[test]
fn globals_prefer_their_override() {
    let mut heap = Heap::new();
    let ts = heap.global("block.timestamp", SolType::uint256(), Value::UInt(UIntInterval::top(&BitWidth(256))));
    if let VarKind::Global { debug_override, .. } = &mut heap.get_mut(ts).kind {
        *debug_override = Some(Value::uint(5, 256));
    }
    assert_eq!(heap.value(ts), Value::uint(5, 256));
    let copy = heap.deep_copy(ts, "now", Scope::Local);
    assert_eq!(heap.value(copy), Value::uint(5, 256));
    assert!(matches!(heap.get(copy).kind, VarKind::Scalar { .. }));
}
