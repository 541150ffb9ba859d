//! Building blocks for abstract interpreters of Solidity contracts, based on
//! [abstract interpretation](https://en.wikipedia.org/wiki/Abstract_interpretation).
//! The crate provides the
//! [lattice](https://en.wikipedia.org/wiki/Lattice_(order)) traits, fixed
//! width integer intervals with wraparound arithmetic, boolean intervals, and
//! bounded powersets that give up once they grow too large. There are also
//! helpers for [control flow graphs](https://en.wikipedia.org/wiki/Control-flow_graph).
//!
//! Look at the solidity-lib crate for how these are used to model the
//! variables of a contract.
//!
//! Some resources to learn more about abstract interpretation:
//! * [Static Program Analysis, Anders Møller and Michael I. Schwartzbach](https://cs.au.dk/~amoeller/spa/)
//! * [Introduction to Static Analysis, Xavier Rival and Kwangkeun Yi](https://mitpress.mit.edu/9780262043410/introduction-to-static-analysis/)
//! * [Principles of Abstract Interpretation](https://mitpress.mit.edu/9780262044905/principles-of-abstract-interpretation/)

/// Trait for defining a control flow graph, and some algorithms to make it
/// easier to work with them.
pub mod cfg;

/// Lattice traits and the value domains: intervals, boolean intervals and
/// bounded sets.
pub mod domains;
