use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ast::Expression;
use crate::cfg::FunctionCfg;
use crate::error::Result;
use crate::factory::ContractCfg;
use crate::heap::{Handle, Heap};
use crate::session::{Environment, Session};
use crate::value::Value;

/// Drives the analysis of one function body. The evaluator calls back into
/// the engine for every user function call, so implementations must be
/// reentrant. Scheduling, joins at merge points and widening are entirely
/// up to the engine.
pub trait Engine {
    fn interpret_function_cfg(
        &mut self,
        contract: &ContractCfg,
        session: &mut Session,
        cfg: &FunctionCfg,
        env: Environment,
    ) -> Result<Value>;
}

/// Receives the observable events of an analysis. The interpreter reports
/// every declaration, every top level assignment exactly once, returns and
/// reverts.
pub trait RecordSink {
    fn record_variable_declaration(&mut self, line: u32, name: &str, heap: &Heap, var: Handle);
    /// `var` is the written variable. `base` is the variable the access
    /// path starts from, if there is one.
    fn record_assignment(&mut self, line: u32, expr: &Expression, heap: &Heap, var: Handle, base: Option<Handle>);
    fn record_return(&mut self, line: u32, expr: Option<&Expression>, value: &Value);
    fn record_revert(&mut self, line: u32);
}

impl<R: RecordSink> RecordSink for Rc<RefCell<R>> {
    fn record_variable_declaration(&mut self, line: u32, name: &str, heap: &Heap, var: Handle) {
        self.borrow_mut().record_variable_declaration(line, name, heap, var);
    }

    fn record_assignment(&mut self, line: u32, expr: &Expression, heap: &Heap, var: Handle, base: Option<Handle>) {
        self.borrow_mut().record_assignment(line, expr, heap, var, base);
    }

    fn record_return(&mut self, line: u32, expr: Option<&Expression>, value: &Value) {
        self.borrow_mut().record_return(line, expr, value);
    }

    fn record_revert(&mut self, line: u32) {
        self.borrow_mut().record_revert(line);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    VarDeclaration,
    Assignment,
    Return,
    Revert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    /// Source text the record is about.
    pub expr: String,
    /// Access path and printed value of every scalar involved.
    pub values: Vec<(String, String)>,
}

impl Record {
    fn same_keys(&self, other: &Record) -> bool {
        self.kind == other.kind
            && self.values.len() == other.values.len()
            && self.values.iter().zip(&other.values).all(|((a, _), (b, _))| a == b)
    }
}

/// Keeps the records in memory, grouped by source line. When a line is
/// executed again, the newer record replaces the older one of the same
/// shape.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    records: BTreeMap<u32, Vec<Record>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, line: u32, record: Record) {
        let records = self.records.entry(line).or_default();
        match records.iter_mut().find(|r| r.same_keys(&record)) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn records(&self, line: u32) -> &[Record] {
        self.records.get(&line).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for Recorder {
    fn record_variable_declaration(&mut self, line: u32, name: &str, heap: &Heap, var: Handle) {
        self.push(
            line,
            Record {
                kind: RecordKind::VarDeclaration,
                expr: name.to_owned(),
                values: heap.flatten(var, name),
            },
        );
    }

    fn record_assignment(&mut self, line: u32, expr: &Expression, heap: &Heap, var: Handle, base: Option<Handle>) {
        let values = match base {
            Some(base) => heap.flatten(base, &heap.get(base).identifier),
            None => heap.flatten(var, &expr.to_string()),
        };
        self.push(
            line,
            Record {
                kind: RecordKind::Assignment,
                expr: expr.to_string(),
                values,
            },
        );
    }

    fn record_return(&mut self, line: u32, expr: Option<&Expression>, value: &Value) {
        let expr = expr.map(ToString::to_string).unwrap_or_default();
        self.push(
            line,
            Record {
                kind: RecordKind::Return,
                values: vec![(expr.clone(), value.to_string())],
                expr,
            },
        );
    }

    fn record_revert(&mut self, line: u32) {
        self.push(
            line,
            Record {
                kind: RecordKind::Revert,
                expr: "revert".to_owned(),
                values: Vec::new(),
            },
        );
    }
}
