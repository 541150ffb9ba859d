use analysis::cfg::{CfgBlock, ControlFlowGraph};
use log::debug;

use crate::ast::{Statement, StmtKind};
use crate::cfg::FunctionCfg;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::eval::Interpreter;
use crate::factory::ContractCfg;
use crate::heap::{Init, Scope};
use crate::session::{Environment, Session};
use crate::value::Value;

/// How control continues after a statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Return(Value),
    Revert,
    Break,
    LoopContinue,
}

impl Interpreter<'_> {
    /// Executes one statement on `env`. Declarations add to `env`.
    pub fn interpret_statement(&mut self, stmt: &Statement, env: &mut Environment) -> Result<Flow> {
        self.line = stmt.line;
        let flow = match &stmt.kind {
            StmtKind::VariableDeclaration {
                ty,
                name,
                init,
                storage,
            } => {
                let value = match init {
                    Some(init) => Some(self.evaluate(init, env)?),
                    None => None,
                };
                let handle = match value {
                    // A storage pointer names the variable it is initialized with.
                    Some(Value::Object(target)) if *storage => target,
                    value => {
                        let handle = self.session.heap.materialize(name, Scope::Local, ty, Init::Bottom)?;
                        if let Some(value) = value {
                            self.store(handle, value)?;
                        }
                        handle
                    }
                };
                env.set(name, handle);
                let session = &mut *self.session;
                session
                    .recorder
                    .record_variable_declaration(stmt.line, name, &session.heap, handle);
                Flow::Continue
            }
            StmtKind::Assignment { op, lhs, rhs } => {
                let value = self.evaluate(rhs, env)?;
                self.update_left_var(lhs, *op, value, env)?;
                Flow::Continue
            }
            StmtKind::Expression(expr) => {
                self.evaluate(expr, env)?;
                Flow::Continue
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Unit,
                };
                self.session.recorder.record_return(stmt.line, expr.as_ref(), &value);
                Flow::Return(value)
            }
            StmtKind::Revert => {
                self.reverted = true;
                Flow::Continue
            }
            StmtKind::Break => Flow::Break,
            StmtKind::Continue => Flow::LoopContinue,
        };
        if self.reverted {
            self.reverted = false;
            self.session.recorder.record_revert(stmt.line);
            return Ok(Flow::Revert);
        }
        Ok(flow)
    }

    /// Value of a function that ran off its end: its named return variables.
    fn implicit_return(&self, cfg: &FunctionCfg, env: &Environment) -> Value {
        let mut values = cfg
            .returns
            .iter()
            .filter_map(|(name, _)| env.get(name))
            .map(|handle| self.session.heap.value(handle))
            .collect::<Vec<_>>();
        match values.len() {
            0 => Value::Unit,
            1 => values.remove(0),
            _ => Value::Tuple(values),
        }
    }
}

/// Runs a function along a single path. Branches are followed only when the
/// condition has a definite value, anything else needs a fixpoint engine.
#[derive(Clone, Debug, Default)]
pub struct StraightLineEngine {
    /// Nesting depth of the calls being interpreted.
    depth: usize,
}

impl StraightLineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the function `name` of `contract` with a fresh entry environment.
    pub fn run(&mut self, contract: &ContractCfg, session: &mut Session, name: &str) -> Result<Value> {
        let cfg = contract
            .function(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_owned()))?;
        let env = contract.make_function_env(session, cfg)?;
        self.interpret_function_cfg(contract, session, cfg, env)
    }
}

impl Engine for StraightLineEngine {
    fn interpret_function_cfg(
        &mut self,
        contract: &ContractCfg,
        session: &mut Session,
        cfg: &FunctionCfg,
        mut env: Environment,
    ) -> Result<Value> {
        if cfg.blocks().is_empty() {
            return Ok(Value::Unit);
        }
        let max_steps = session.config.max_steps;
        debug!("Interpreting `{}` at depth {}", cfg.name, self.depth);
        self.depth += 1;
        let mut interpreter = Interpreter::new(contract, session, self);
        let mut block = 0;
        let mut steps = 0;
        let result = 'blocks: loop {
            let current = &cfg.blocks()[block];
            for stmt in current.operations() {
                steps += 1;
                if steps > max_steps {
                    break 'blocks Err(Error::Unsupported(format!(
                        "`{}` did not finish within {max_steps} steps",
                        cfg.name
                    )));
                }
                match interpreter.interpret_statement(stmt, &mut env) {
                    Ok(Flow::Return(value)) => break 'blocks Ok(value),
                    Ok(Flow::Revert) => break 'blocks Ok(Value::Unit),
                    Ok(_) => {}
                    Err(e) => break 'blocks Err(e),
                }
            }
            let next = match (current.successors(), current.condition()) {
                ([], _) => break 'blocks Ok(interpreter.implicit_return(cfg, &env)),
                ([next], _) => *next,
                ([then, els], Some(condition)) => match interpreter.evaluate(condition, &env) {
                    Ok(value) => match value.as_bool() {
                        Some(true) => *then,
                        Some(false) => *els,
                        None => {
                            break 'blocks Err(Error::Unsupported(format!(
                                "branch on `{condition}` with value {value}"
                            )));
                        }
                    },
                    Err(e) => break 'blocks Err(e),
                },
                (succs, _) => {
                    break 'blocks Err(Error::Unsupported(format!(
                        "block {block} of `{}` with {} successors",
                        cfg.name,
                        succs.len()
                    )));
                }
            };
            block = next;
        };
        drop(interpreter);
        self.depth -= 1;
        result
    }
}
