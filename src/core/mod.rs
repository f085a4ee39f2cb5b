//! Dependency analysis and evaluation

pub mod evaluator;
pub mod graph;
pub mod order;

pub use evaluator::{Evaluator, Value, XlError};
pub use graph::DependencyGraph;
pub use order::{find_cycle, resolve_order};
