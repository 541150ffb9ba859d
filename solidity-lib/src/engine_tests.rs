use super::ast::Expression;
use super::engine::*;
use super::heap::*;
use super::types::SolType;
use super::value::Value;

#[test]
fn declarations_flatten_composites() {
    let mut heap = Heap::new();
    let ty = SolType::array(SolType::UInt(8), Some(2));
    let xs = heap.materialize("xs", Scope::Local, &ty, Init::Zero).unwrap();
    let mut recorder = Recorder::new();
    recorder.record_variable_declaration(4, "xs", &heap, xs);

    assert_eq!(
        recorder.records(4),
        &[Record {
            kind: RecordKind::VarDeclaration,
            expr: "xs".to_owned(),
            values: vec![
                ("xs[0]".to_owned(), "[0, 0]".to_owned()),
                ("xs[1]".to_owned(), "[0, 0]".to_owned()),
            ],
        }]
    );
    assert!(recorder.records(5).is_empty());
}

#[test]
fn assignments_report_the_whole_base() {
    let mut heap = Heap::new();
    let ty = SolType::array(SolType::UInt(8), Some(2));
    let xs = heap.materialize("xs", Scope::Local, &ty, Init::Zero).unwrap();
    let second = heap.elements(xs).unwrap()[1];
    heap.set_value(second, Value::uint(7, 8)).unwrap();

    let mut recorder = Recorder::new();
    let expr = Expression::ident("xs").index(Expression::number(1));
    recorder.record_assignment(9, &expr, &heap, second, Some(xs));
    let record = &recorder.records(9)[0];
    assert_eq!(record.kind, RecordKind::Assignment);
    assert_eq!(record.expr, "xs[1]");
    assert_eq!(record.values[1], ("xs[1]".to_owned(), "[7, 7]".to_owned()));

    // Without a base only the written variable is reported.
    recorder.record_assignment(10, &expr, &heap, second, None);
    assert_eq!(recorder.records(10)[0].values, vec![("xs[1]".to_owned(), "[7, 7]".to_owned())]);
}

#[test]
fn reexecuted_lines_replace_their_records() {
    let mut heap = Heap::new();
    let x = heap.scalar("x", Scope::Local, SolType::UInt(8), Value::uint(1, 8));
    let mut recorder = Recorder::new();
    let expr = Expression::ident("x");
    recorder.record_assignment(3, &expr, &heap, x, Some(x));
    heap.set_value(x, Value::uint(2, 8)).unwrap();
    recorder.record_assignment(3, &expr, &heap, x, Some(x));
    recorder.record_revert(3);

    assert_eq!(recorder.len(), 2);
    assert_eq!(recorder.records(3)[0].values, vec![("x".to_owned(), "[2, 2]".to_owned())]);
    assert_eq!(recorder.records(3)[1].kind, RecordKind::Revert);
    assert_eq!(recorder.lines().collect::<Vec<_>>(), vec![3]);
}

#[test]
fn returns() {
    let mut recorder = Recorder::new();
    recorder.record_return(12, Some(&Expression::ident("total")), &Value::uint(3, 256));
    recorder.record_return(13, None, &Value::Unit);
    assert_eq!(recorder.records(12)[0].values, vec![("total".to_owned(), "[3, 3]".to_owned())]);
    assert_eq!(recorder.records(13)[0].expr, "");
}
