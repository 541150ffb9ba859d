use std::collections::HashMap;

use analysis::domains::*;
use log::debug;

use crate::cfg::FunctionCfg;
use crate::error::Result;
use crate::heap::{Handle, Init, Scope};
use crate::session::{Environment, Session};
use crate::types::SolType;
use crate::value::Value;

/// `block`, `msg` and `tx` members with a numeric value nobody knows.
const UNKNOWN_UINT_GLOBALS: &[&str] = &[
    "block.basefee",
    "block.chainid",
    "block.difficulty",
    "block.gaslimit",
    "block.number",
    "block.prevrandao",
    "block.timestamp",
    "msg.value",
    "tx.gasprice",
];

/// A contract ready for analysis: its state, the globals every function
/// sees, and the control flow graph of each function.
#[derive(Clone, Debug)]
pub struct ContractCfg {
    pub name: String,
    pub state: Environment,
    pub globals: Environment,
    functions: HashMap<String, FunctionCfg>,
}

impl ContractCfg {
    /// Creates the contract and registers its globals in `session`.
    /// `msg.sender` and `tx.origin` get their fixed identities.
    pub fn new(name: &str, session: &mut Session) -> Self {
        let mut globals = Environment::new();
        let heap = &mut session.heap;
        for name in UNKNOWN_UINT_GLOBALS {
            let ty = SolType::uint256();
            globals.set(name, heap.global(name, ty, Value::UInt(UIntInterval::top(&BitWidth(256)))));
        }
        globals.set(
            "block.coinbase",
            heap.global("block.coinbase", SolType::Address, Value::Address(AddressSet::top_())),
        );

        let sender = session.config.msg_sender_id;
        let origin = session.config.tx_origin_id;
        session.addresses.register_fixed_id(sender, Some("msg.sender"));
        session.addresses.register_fixed_id(origin, Some("tx.origin"));
        let sender_value = session.addresses.value_of(sender);
        let origin_value = session.addresses.value_of(origin);
        let heap = &mut session.heap;
        globals.set("msg.sender", heap.global("msg.sender", SolType::Address, sender_value));
        globals.set("tx.origin", heap.global("tx.origin", SolType::Address, origin_value));
        globals.set(
            "msg.data",
            heap.global("msg.data", SolType::Bytes, Value::Symbolic("symbol_msg.data".to_owned())),
        );
        globals.set(
            "msg.sig",
            heap.global("msg.sig", SolType::FixedBytes(4), Value::Bytes(BytesSet::top_of(4))),
        );

        Self {
            name: name.to_owned(),
            state: Environment::new(),
            globals,
            functions: HashMap::new(),
        }
    }

    /// State variables start out zeroed, like fresh contract storage.
    pub fn add_state_variable(&mut self, session: &mut Session, name: &str, ty: &SolType) -> Result<Handle> {
        let handle = session.heap.materialize(name, Scope::State, ty, Init::Zero)?;
        self.state.set(name, handle);
        Ok(handle)
    }

    pub fn add_function(&mut self, cfg: FunctionCfg) {
        self.functions.insert(cfg.name.clone(), cfg);
    }

    pub fn function(&self, name: &str) -> Option<&FunctionCfg> {
        self.functions.get(name)
    }

    /// Parameters and named return values may hold anything on entry.
    pub fn make_param_variable(session: &mut Session, name: &str, ty: &SolType, scope: Scope) -> Result<Handle> {
        session.heap.materialize(name, scope, ty, Init::Top)
    }

    /// Entry environment of `cfg`: fresh parameters and return variables,
    /// shared state variables and globals.
    pub fn make_function_env(&self, session: &mut Session, cfg: &FunctionCfg) -> Result<Environment> {
        debug!("Entry environment of `{}.{}`", self.name, cfg.name);
        let mut env = Environment::new();
        for (name, ty) in &cfg.params {
            env.set(name, Self::make_param_variable(session, name, ty, Scope::Param)?);
        }
        // Unnamed return values are only reachable through `return`.
        for (name, ty) in cfg.returns.iter().filter(|(name, _)| !name.is_empty()) {
            env.set(name, Self::make_param_variable(session, name, ty, Scope::Return)?);
        }
        env.merge_missing(&self.state);
        env.merge_missing(&self.globals);
        Ok(env)
    }
}
