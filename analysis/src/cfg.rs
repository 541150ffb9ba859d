use std::collections::HashSet;
use std::fmt::Write;

pub trait CfgBlock {
    type Element;

    fn operations(&self) -> &[Self::Element];
    fn successors(&self) -> &[usize];
    fn predecessors(&self) -> &[usize];
}

pub trait ControlFlowGraph {
    type Block: CfgBlock;
    fn blocks(&self) -> &[Self::Block];
}

/// Renders the graph in graphviz dot format. Each node is labeled with its
/// operations, one per line.
pub fn print<Cfg, OpPrinter>(cfg: &Cfg, printer: OpPrinter) -> String
where
    Cfg: ControlFlowGraph,
    OpPrinter: Fn(&<<Cfg as ControlFlowGraph>::Block as CfgBlock>::Element) -> String,
{
    let mut output = "digraph CFG {\n".to_owned();
    for (counter, block) in cfg.blocks().iter().enumerate() {
        let text: Vec<_> = block.operations().iter().map(&printer).collect();
        let _ = writeln!(output, "  Node_{counter}[label=\"{}\"]", text.join("\\n"));
    }
    output.push('\n');
    for (counter, block) in cfg.blocks().iter().enumerate() {
        for next in block.successors() {
            let _ = writeln!(output, "  Node_{counter} -> Node_{next}");
        }
    }
    output.push_str("}\n");
    output
}

/// Blocks reachable from the entry (block 0) in reverse post order. Blocks
/// that cannot be reached are left out.
pub fn reverse_post_order<Cfg: ControlFlowGraph>(cfg: &Cfg) -> Vec<usize> {
    let blocks = cfg.blocks();
    if blocks.is_empty() {
        return Vec::new();
    }
    let mut visited = vec![false; blocks.len()];
    let mut post_order = Vec::with_capacity(blocks.len());
    // Explicit stack of (block, next successor to visit).
    let mut stack = vec![(0usize, 0usize)];
    visited[0] = true;
    while let Some((block, next)) = stack.pop() {
        let succs = blocks[block].successors();
        if next < succs.len() {
            stack.push((block, next + 1));
            let succ = succs[next];
            if !visited[succ] {
                visited[succ] = true;
                stack.push((succ, 0));
            }
        } else {
            post_order.push(block);
        }
    }
    post_order.reverse();
    post_order
}

/// Edges `(from, to)` where `to` is still on the traversal stack when the
/// edge is found. These close the loops of the graph.
pub fn get_back_edges<Cfg: ControlFlowGraph>(cfg: &Cfg) -> HashSet<(usize, usize)> {
    let blocks = cfg.blocks();
    let mut edges = HashSet::new();
    if blocks.is_empty() {
        return edges;
    }
    let mut visited = vec![false; blocks.len()];
    let mut on_stack = vec![false; blocks.len()];
    let mut stack = vec![(0usize, 0usize)];
    visited[0] = true;
    on_stack[0] = true;
    while let Some((block, next)) = stack.pop() {
        let succs = blocks[block].successors();
        if next < succs.len() {
            stack.push((block, next + 1));
            let succ = succs[next];
            if on_stack[succ] {
                edges.insert((block, succ));
            } else if !visited[succ] {
                visited[succ] = true;
                on_stack[succ] = true;
                stack.push((succ, 0));
            }
        } else {
            on_stack[block] = false;
        }
    }
    edges
}
