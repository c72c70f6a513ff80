//! Recursive expansion of a column into its upstream dependency tree.

use tracing::{debug, warn};

use super::node::{LineageNode, Truncation};
use crate::facts::{ColumnKey, FactTable};

/// Default bound on tree depth, counted from the seed column.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The columns from the root down to the node being expanded.
///
/// A persistent list living on the call stack: each recursion level links a
/// new head to its caller's path, so siblings never see each other's
/// ancestors.
#[derive(Clone, Copy)]
struct Path<'a> {
    key: &'a ColumnKey,
    parent: Option<&'a Path<'a>>,
    depth: usize,
}

impl Path<'_> {
    fn contains(&self, key: &ColumnKey) -> bool {
        let mut current = Some(self);
        while let Some(path) = current {
            if path.key == key {
                return true;
            }
            current = path.parent;
        }
        false
    }
}

/// Builds owned [`LineageNode`] trees out of a [`FactTable`].
///
/// Cycle detection is scoped to the current root-to-node path: a column
/// reached again through a different branch is expanded again in full,
/// while a column that depends on itself ends in a marker leaf.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'f> {
    facts: &'f FactTable,
    max_depth: usize,
}

impl<'f> TreeBuilder<'f> {
    pub fn new(facts: &'f FactTable) -> Self {
        Self {
            facts,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Bound the number of levels below the seed column. Zero is treated as one.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn facts(&self) -> &'f FactTable {
        self.facts
    }

    /// Expand `model.column` into its full upstream tree.
    pub fn build(&self, model: &str, column: &str) -> LineageNode {
        self.build_key(&ColumnKey::normalized(model, column))
    }

    pub fn build_key(&self, key: &ColumnKey) -> LineageNode {
        self.expand(key, None)
    }

    /// One tree per fact, in fact table order.
    pub fn build_all(&self) -> Vec<LineageNode> {
        self.facts.keys().map(|key| self.build_key(key)).collect()
    }

    fn expand(&self, key: &ColumnKey, path: Option<&Path<'_>>) -> LineageNode {
        let on_path = path.is_some_and(|p| p.contains(key));
        let Some(fact) = self.facts.get(key) else {
            return LineageNode::boundary(key);
        };

        if on_path {
            debug!(column = %key, "cycle in upstream lineage, truncating branch");
            return LineageNode::from_fact(fact).truncated(Truncation::Cycle);
        }

        let depth = path.map_or(0, |p| p.depth + 1);
        if depth >= self.max_depth {
            warn!(
                column = %key,
                max_depth = self.max_depth,
                "lineage deeper than the configured limit, truncating branch"
            );
            return LineageNode::from_fact(fact).truncated(Truncation::Depth);
        }

        let here = Path {
            key,
            parent: path,
            depth,
        };

        let mut node = LineageNode::from_fact(fact);
        node.upstream_models = fact
            .upstream
            .iter()
            .map(|upstream| self.expand(upstream, Some(&here)))
            .collect();
        node
    }
}
