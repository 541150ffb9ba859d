use super::ast::*;
use super::cfg::FunctionCfg;
use super::error::{Error, Result};
use super::eval::*;
use super::factory::ContractCfg;
use super::heap::{Handle, Init, Scope, StructDef};
use super::runtime::StraightLineEngine;
use super::session::{Environment, Session};
use super::types::SolType;
use super::value::Value;
use analysis::domains::*;
use num_bigint::BigInt;
use test_log::test;

struct Fixture {
    session: Session,
    contract: ContractCfg,
    env: Environment,
}

impl Fixture {
    fn new() -> Self {
        let mut session = Session::default();
        let mut contract = ContractCfg::new("Bank", &mut session);
        let double = FunctionCfg::straight_line(
            "double",
            vec![("x".to_owned(), SolType::uint256())],
            vec![(String::new(), SolType::uint256())],
            vec![Statement::ret(
                Some(Expression::binary(BinaryOp::Mul, Expression::ident("x"), Expression::number(2))),
                20,
            )],
        );
        contract.add_function(double);
        let mut env = contract.state.clone();
        env.merge_missing(&contract.globals);
        Self { session, contract, env }
    }

    fn local(&mut self, name: &str, ty: SolType, value: Value) -> Handle {
        let handle = self.session.heap.scalar(name, Scope::Local, ty, value);
        self.env.set(name, handle);
        handle
    }

    fn declare(&mut self, name: &str, ty: &SolType) -> Handle {
        let handle = self.session.heap.materialize(name, Scope::Local, ty, Init::Zero).unwrap();
        self.env.set(name, handle);
        handle
    }

    fn eval(&mut self, expr: &Expression) -> Result<Value> {
        let mut engine = StraightLineEngine::new();
        Interpreter::new(&self.contract, &mut self.session, &mut engine).evaluate(expr, &self.env)
    }
}

fn ident(name: &str) -> Expression {
    Expression::ident(name)
}

/// `xs` of type `uint8[4]` holding 1, 2, 3, 4.
fn numbered_array(fixture: &mut Fixture) -> Handle {
    let xs = fixture.declare("xs", &SolType::array(SolType::UInt(8), Some(4)));
    let elements = fixture.session.heap.elements(xs).unwrap().to_vec();
    for (i, element) in elements.into_iter().enumerate() {
        fixture.session.heap.set_value(element, Value::uint(i + 1, 8)).unwrap();
    }
    xs
}

#[test]
fn literals() {
    let mut f = Fixture::new();
    assert_eq!(f.eval(&Expression::number(42)), Ok(Value::uint(42, 256)));
    assert_eq!(f.eval(&Expression::number("0x10")), Ok(Value::uint(16, 256)));
    assert_eq!(f.eval(&Expression::number("2e3")), Ok(Value::uint(2000, 256)));
    assert_eq!(f.eval(&Expression::boolean(true)), Ok(Value::Bool(BoolInterval::TRUE)));
    let ether = Expression::new(ExprKind::SubDenomination {
        value: "1.5".to_owned(),
        unit: SubDenomination::Ether,
    });
    assert_eq!(f.eval(&ether), Ok(Value::uint(1_500_000_000_000_000_000u64, 256)));
}

#[test]
fn parse_numbers() {
    assert_eq!(parse_number("1_000", 1), Some(BigInt::from(1000)));
    assert_eq!(parse_number("0.5", 60), Some(BigInt::from(30)));
    assert_eq!(parse_number("1e-1", 1), Some(BigInt::from(0)));
    assert_eq!(parse_number("abc", 1), None);
}

#[test]
fn singleton_index_reads_the_element() {
    let mut f = Fixture::new();
    numbered_array(&mut f);
    assert_eq!(f.eval(&ident("xs").index(Expression::number(2))), Ok(Value::uint(3, 8)));
    assert_eq!(
        f.eval(&ident("xs").index(Expression::number(4))),
        Err(Error::IndexOutOfBounds {
            array: "xs".to_owned(),
            index: "4".to_owned(),
            length: 4,
        })
    );
}

#[test]
fn range_index_joins_the_elements() {
    let mut f = Fixture::new();
    numbered_array(&mut f);
    f.local("i", SolType::uint256(), Value::uint_range(1, 2, 256));
    assert_eq!(f.eval(&ident("xs").index(ident("i"))), Ok(Value::uint_range(2, 3, 8)));

    // Clamped to the declared length.
    f.local("j", SolType::uint256(), Value::uint_range(2, 10, 256));
    assert_eq!(f.eval(&ident("xs").index(ident("j"))), Ok(Value::uint_range(3, 4, 8)));

    f.local("k", SolType::Int(256), Value::int(-1, 256));
    assert!(matches!(
        f.eval(&ident("xs").index(ident("k"))),
        Err(Error::NegativeIndex { .. })
    ));
}

#[test]
fn wide_ranges_read_as_top() {
    let mut f = Fixture::new();
    f.declare("big", &SolType::array(SolType::UInt(8), Some(2000)));
    f.local("i", SolType::uint256(), Value::uint_range(0, 1999, 256));
    let value = f.eval(&ident("big").index(ident("i"))).unwrap();
    assert!(value.is_top());
    assert_eq!(value.type_of(), Some(SolType::UInt(8)));

    // A span of exactly the limit is still enumerated.
    f.local("j", SolType::uint256(), Value::uint_range(0, 1024, 256));
    let value = f.eval(&ident("big").index(ident("j"))).unwrap();
    assert_eq!(value, Value::uint(0, 8));
}

#[test]
fn ranges_into_empty_dynamic_arrays_read_as_top() {
    let mut f = Fixture::new();
    let xs = f.declare("xs", &SolType::array(SolType::uint256(), None));
    f.local("i", SolType::uint256(), Value::uint_range(0, 3, 256));
    assert!(f.eval(&ident("xs").index(ident("i"))).unwrap().is_top());
    assert_eq!(f.session.heap.length(xs), Some(0));

    // A definite index grows the array instead.
    assert!(f.eval(&ident("xs").index(Expression::number(5))).unwrap().is_top());
    assert_eq!(f.session.heap.length(xs), Some(6));
}

#[test]
fn mapping_reads() {
    let mut f = Fixture::new();
    let ty = SolType::mapping(SolType::Address, SolType::uint256());
    let balances = f.declare("balances", &ty);

    let by_sender = f.eval(&ident("balances").index(ident("msg").member("sender"))).unwrap();
    assert!(by_sender.is_bottom());
    assert!(f.session.heap.entries(balances).unwrap().contains_key("msg.sender"));

    let scores = f.declare("scores", &SolType::mapping(SolType::uint256(), SolType::uint256()));
    f.local("i", SolType::uint256(), Value::uint_range(1, 2, 256));
    assert!(f.eval(&ident("scores").index(ident("i"))).unwrap().is_bottom());

    for (key, value) in [("1", 10), ("2", 20)] {
        let entry = f.session.heap.get_or_create(scores, key).unwrap();
        f.session.heap.set_value(entry, Value::uint(value, 256)).unwrap();
    }
    assert_eq!(f.eval(&ident("scores").index(ident("i"))), Ok(Value::uint_range(10, 20, 256)));
    assert_eq!(f.eval(&ident("scores").index(Expression::number("0x02"))), Ok(Value::uint(20, 256)));
}

#[test]
fn members() {
    let mut f = Fixture::new();
    let def = StructDef::new("Account").with_member("balance", SolType::UInt(64)).unwrap();
    f.session.heap.defs.define_struct(def);
    f.declare("acct", &SolType::Named("Account".to_owned()));
    numbered_array(&mut f);

    assert_eq!(f.eval(&ident("acct").member("balance")), Ok(Value::uint(0, 64)));
    assert_eq!(f.eval(&ident("xs").member("length")), Ok(Value::uint(4, 256)));
    assert_eq!(f.eval(&ident("msg").member("sender")), Ok(Value::address(101)));
    let max = Expression::new(ExprKind::MetaType(SolType::UInt(8))).member("max");
    assert_eq!(f.eval(&max), Ok(Value::uint(255, 8)));
    assert!(matches!(
        f.eval(&ident("acct").member("owner")),
        Err(Error::UnknownMember { .. })
    ));
}

#[test]
fn identifiers() {
    let mut f = Fixture::new();
    assert_eq!(f.eval(&ident("nope")), Err(Error::UndeclaredVariable("nope".to_owned())));
    assert_eq!(f.eval(&ident("msg")), Err(Error::MalformedAccess("msg".to_owned())));
    assert_eq!(f.eval(&ident("this")), Ok(Value::Address(AddressSet::top_())));
    assert!(f.eval(&ident("now")).unwrap().is_top());
}

#[test]
fn conditional_with_unknown_condition_joins() {
    let mut f = Fixture::new();
    f.local("flag", SolType::Bool, Value::Bool(BoolInterval::TOP));
    let expr = Expression::new(ExprKind::Conditional {
        cond: Box::new(ident("flag")),
        then: Box::new(Expression::number(1)),
        els: Box::new(Expression::number(5)),
    });
    assert_eq!(f.eval(&expr), Ok(Value::uint_range(1, 5, 256)));
}

fn unknown_branch(then: Expression, els: Expression) -> Expression {
    Expression::new(ExprKind::Conditional {
        cond: Box::new(ident("flag")),
        then: Box::new(then),
        els: Box::new(els),
    })
}

#[test]
fn branch_side_effects_are_joined() {
    let mut f = Fixture::new();
    f.local("flag", SolType::Bool, Value::Bool(BoolInterval::TOP));
    let x = f.declare("x", &SolType::UInt(8));
    let y = f.declare("y", &SolType::UInt(8));
    let expr = unknown_branch(
        Expression::assign(AssignOp::Assign, ident("x"), Expression::number(1)),
        Expression::assign(AssignOp::Assign, ident("x"), Expression::number(2)),
    );
    assert_eq!(f.eval(&expr), Ok(Value::uint_range(1, 2, 8)));
    assert_eq!(f.session.heap.value(x), Value::uint_range(1, 2, 8));

    // A write on one path only keeps the old value possible.
    let expr = unknown_branch(
        Expression::assign(AssignOp::Assign, ident("y"), Expression::number(9)),
        Expression::number(0),
    );
    f.eval(&expr).unwrap();
    assert_eq!(f.session.heap.value(y), Value::uint_range(0, 9, 8));
}

#[test]
fn branch_pushes_are_joined_element_wise() {
    let mut f = Fixture::new();
    f.local("flag", SolType::Bool, Value::Bool(BoolInterval::TOP));
    let xs = f.declare("xs", &SolType::array(SolType::UInt(8), None));
    let push = |value: u8| ident("xs").member("push").call(vec![Expression::number(value)]);
    f.eval(&unknown_branch(push(5), push(6))).unwrap();

    let elements = f.session.heap.elements(xs).unwrap().to_vec();
    assert_eq!(elements.len(), 1);
    assert_eq!(f.session.heap.value(elements[0]), Value::uint_range(5, 6, 8));
}

#[test]
fn short_circuit() {
    let mut f = Fixture::new();
    // The right side would fail if it were evaluated.
    let expr = Expression::binary(BinaryOp::And, Expression::boolean(false), ident("nope"));
    assert_eq!(f.eval(&expr), Ok(Value::Bool(BoolInterval::FALSE)));
}

#[test]
fn builtins() {
    let mut f = Fixture::new();
    assert_eq!(
        f.eval(&ident("keccak256").call(vec![Expression::string("a")])),
        Ok(Value::Bytes(BytesSet::top_of(32)))
    );
    let args = vec![Expression::number(5), Expression::number(4), Expression::number(7)];
    assert_eq!(f.eval(&ident("addmod").call(args)), Ok(Value::uint(2, 256)));
    let call = ident("msg").member("sender").member("call").call(vec![Expression::string("")]);
    assert_eq!(
        f.eval(&call),
        Ok(Value::Tuple(vec![
            Value::Bool(BoolInterval::TOP),
            Value::Symbolic("call_result".to_owned())
        ]))
    );
    assert_eq!(
        f.eval(&ident("uint8").call(vec![Expression::number(300)])),
        Ok(Value::uint(255, 8))
    );
    assert_eq!(f.eval(&ident("frobnicate").call(Vec::new())), Err(Error::UnknownFunction("frobnicate".to_owned())));
}

#[test]
fn user_function_calls() {
    let mut f = Fixture::new();
    let call = ident("double").call(vec![Expression::number(21)]);
    assert_eq!(f.eval(&call), Ok(Value::uint(42, 256)));
    let call = ident("this").member("double").call(vec![Expression::number(4)]);
    assert_eq!(f.eval(&call), Ok(Value::uint(8, 256)));
    let named = ident("double").call_named(vec![("x", Expression::number(1))]);
    assert_eq!(f.eval(&named), Ok(Value::uint(2, 256)));

    assert_eq!(
        f.eval(&ident("double").call(Vec::new())),
        Err(Error::ArgumentCountMismatch {
            function: "double".to_owned(),
            expected: 1,
            given: 0,
        })
    );
    let wrong_name = ident("double").call_named(vec![("y", Expression::number(1))]);
    assert!(matches!(f.eval(&wrong_name), Err(Error::UnknownMember { .. })));
}

#[test]
fn struct_constructors_and_new() {
    let mut f = Fixture::new();
    let def = StructDef::new("Pair")
        .with_member("a", SolType::UInt(8))
        .and_then(|def| def.with_member("b", SolType::Bool))
        .unwrap();
    f.session.heap.defs.define_struct(def);

    let pair = f
        .eval(&ident("Pair").call(vec![Expression::number(3), Expression::boolean(true)]))
        .unwrap();
    let pair = pair.as_object().unwrap();
    let a = f.session.heap.member(pair, "a").unwrap();
    assert_eq!(f.session.heap.value(a), Value::uint(3, 8));

    let named = ident("Pair").call_named(vec![("b", Expression::boolean(true)), ("a", Expression::number(9))]);
    let pair = f.eval(&named).unwrap().as_object().unwrap();
    let a = f.session.heap.member(pair, "a").unwrap();
    assert_eq!(f.session.heap.value(a), Value::uint(9, 8));

    let new_array = Expression::new(ExprKind::New(SolType::array(SolType::uint256(), None)));
    let array = f.eval(&new_array.call(vec![Expression::number(3)])).unwrap().as_object().unwrap();
    assert_eq!(f.session.heap.length(array), Some(3));
}
