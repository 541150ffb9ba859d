//! Abstract interpretation core for Solidity contracts. Variables live in an
//! arena [heap](heap::Heap) and hold values from the domains of the
//! `analysis` crate. The [interpreter](eval::Interpreter) evaluates
//! expressions and performs assignments on it, while the scheduling of a
//! function body is left to an [engine](engine::Engine). Debug directives
//! written as comments can pin down variables between runs.

pub mod ast;
pub mod cfg;
pub mod config;
pub mod debug;
pub mod engine;
pub mod error;
pub mod eval;
pub mod factory;
pub mod heap;
pub mod runtime;
pub mod session;
pub mod snapshot;
pub mod symbolic;
pub mod types;
pub mod update;
pub mod value;

#[cfg(test)]
mod types_tests;


#[cfg(test)]
mod heap_tests;

#[cfg(test)]
mod symbolic_tests;

#[cfg(test)]
mod snapshot_tests;

#[cfg(test)]
mod engine_tests;


#[cfg(test)]
mod factory_tests;

#[cfg(test)]
mod eval_tests;
