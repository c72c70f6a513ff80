//! Database-side column lineage trees.
//!
//! A [`TreeBuilder`] expands a seed column into an owned [`LineageNode`] tree
//! by following each fact's upstream list. Cycles are cut per path, so a
//! column shared by two unrelated branches shows up in full under both.

mod builder;
pub mod cycles;
mod node;

pub use builder::{TreeBuilder, DEFAULT_MAX_DEPTH};
pub use cycles::{detect_cycles, CycleReport};
pub use node::{LineageNode, Truncation, DESCRIPTION_NOT_AVAILABLE, REASONING_NOT_AVAILABLE};

use crate::facts::FactTable;

/// Build the tree for `model.column` with default settings.
pub fn build(facts: &FactTable, model: &str, column: &str) -> LineageNode {
    TreeBuilder::new(facts).build(model, column)
}
