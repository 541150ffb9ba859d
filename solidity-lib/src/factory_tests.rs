use super::cfg::FunctionCfg;
use super::factory::*;
use super::heap::Scope;
use super::session::Session;
use super::types::SolType;
use super::value::Value;
use analysis::domains::*;

#[test]
fn globals_are_seeded() {
    let mut session = Session::default();
    let contract = ContractCfg::new("Vault", &mut session);
    let heap = &session.heap;
    let global = |name: &str| heap.value(contract.globals.get(name).unwrap());

    assert_eq!(global("msg.sender"), Value::address(101));
    assert_eq!(global("tx.origin"), Value::address(100));
    assert!(global("block.timestamp").is_top());
    assert!(global("msg.value").is_top());
    assert_eq!(global("block.coinbase"), Value::Address(AddressSet::top_()));
    assert_eq!(global("msg.sig"), Value::Bytes(BytesSet::top_of(4)));
    assert_eq!(session.addresses.aliases(101), vec!["msg.sender".to_owned()]);
}

#[test]
fn function_environments_share_state() {
    let mut session = Session::default();
    let mut contract = ContractCfg::new("Vault", &mut session);
    let total = contract
        .add_state_variable(&mut session, "total", &SolType::uint256())
        .unwrap();
    let f = FunctionCfg::new(
        "deposit",
        vec![("amount".to_owned(), SolType::uint256())],
        vec![("ok".to_owned(), SolType::Bool), (String::new(), SolType::uint256())],
    );

    let first = contract.make_function_env(&mut session, &f).unwrap();
    let second = contract.make_function_env(&mut session, &f).unwrap();
    assert_eq!(first.get("total"), Some(total));
    assert_eq!(second.get("total"), Some(total));
    assert_eq!(first.get("msg.sender"), contract.globals.get("msg.sender"));
    // Parameters are fresh for every activation.
    assert_ne!(first.get("amount"), second.get("amount"));
    assert!(first.contains("ok"));
    assert_eq!(first.len(), 3 + contract.globals.len());

    session.heap.set_value(total, Value::uint(5, 256)).unwrap();
    assert_eq!(session.heap.value(second.get("total").unwrap()), Value::uint(5, 256));
}

#[test]
fn parameters_default_to_top_and_state_to_zero() {
    let mut session = Session::default();
    let mut contract = ContractCfg::new("C", &mut session);
    let state = contract.add_state_variable(&mut session, "x", &SolType::UInt(8)).unwrap();
    let param = ContractCfg::make_param_variable(&mut session, "y", &SolType::UInt(8), Scope::Param).unwrap();
    assert_eq!(session.heap.value(state), Value::uint(0, 8));
    assert_eq!(session.heap.value(param), Value::uint_range(0, 255, 8));
    assert_eq!(session.heap.get(param).scope, Scope::Param);
}
