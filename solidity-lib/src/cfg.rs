use analysis::cfg::{CfgBlock, ControlFlowGraph, get_back_edges, print};

use crate::ast::{Expression, Statement};
use crate::types::SolType;

/// Straight line statements, optionally ending in a branch. A block with a
/// condition has two successors: the first is taken when the condition
/// holds, the second when it does not.
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    statements: Vec<Statement>,
    condition: Option<Expression>,
    succs: Vec<usize>,
    preds: Vec<usize>,
}

impl BasicBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(&self) -> Option<&Expression> {
        self.condition.as_ref()
    }
}

impl CfgBlock for BasicBlock {
    type Element = Statement;

    fn operations(&self) -> &[Self::Element] {
        &self.statements
    }

    fn predecessors(&self) -> &[usize] {
        &self.preds
    }

    fn successors(&self) -> &[usize] {
        &self.succs
    }
}

/// Control flow graph of one function. Block 0 is the entry.
#[derive(Clone, Debug)]
pub struct FunctionCfg {
    pub name: String,
    pub params: Vec<(String, SolType)>,
    pub returns: Vec<(String, SolType)>,
    basic_blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph for FunctionCfg {
    type Block = BasicBlock;

    fn blocks(&self) -> &[Self::Block] {
        &self.basic_blocks
    }
}

impl FunctionCfg {
    pub fn new(name: &str, params: Vec<(String, SolType)>, returns: Vec<(String, SolType)>) -> Self {
        Self {
            name: name.to_owned(),
            params,
            returns,
            basic_blocks: Vec::new(),
        }
    }

    /// A function made of a single block.
    pub fn straight_line(name: &str, params: Vec<(String, SolType)>, returns: Vec<(String, SolType)>, body: Vec<Statement>) -> Self {
        let mut cfg = Self::new(name, params, returns);
        let entry = cfg.new_block();
        for statement in body {
            cfg.push(entry, statement);
        }
        cfg
    }

    pub fn new_block(&mut self) -> usize {
        self.basic_blocks.push(BasicBlock::new());
        self.basic_blocks.len() - 1
    }

    pub fn push(&mut self, block: usize, statement: Statement) -> &mut Self {
        self.basic_blocks[block].statements.push(statement);
        self
    }

    pub fn set_condition(&mut self, block: usize, condition: Expression) -> &mut Self {
        self.basic_blocks[block].condition = Some(condition);
        self
    }

    pub fn add_edge(&mut self, from: usize, to: usize) -> &mut Self {
        self.basic_blocks[from].succs.push(to);
        self.basic_blocks[to].preds.push(from);
        self
    }

    pub fn has_loops(&self) -> bool {
        !get_back_edges(self).is_empty()
    }

    pub fn to_dot(&self) -> String {
        print(self, |statement| statement.to_string().replace('"', "\\\""))
    }
}
