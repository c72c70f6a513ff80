//! Database-side lineage tree nodes.

use serde::{Deserialize, Serialize};

use crate::facts::{ColumnKey, NormalizedFact};

/// Description given to columns with no fact behind them.
pub const DESCRIPTION_NOT_AVAILABLE: &str = "Description not available";

/// Reasoning given to columns with no fact behind them.
pub const REASONING_NOT_AVAILABLE: &str = "Reasoning not available";

/// Why a branch stopped before reaching a source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// The column already appears on the path from the root.
    Cycle,
    /// The branch hit the configured depth limit.
    Depth,
}

/// One column in a database-side lineage tree.
///
/// Each node owns its upstream subtrees. The same column may appear in
/// several branches; it never appears twice on one root-to-leaf path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageNode {
    pub model: String,
    pub column: String,
    pub description: String,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<Truncation>,
    #[serde(default)]
    pub upstream_models: Vec<LineageNode>,
}

impl LineageNode {
    /// A lineage boundary: a column with no fact, hence no known upstream.
    pub fn boundary(key: &ColumnKey) -> Self {
        Self {
            model: key.model.clone(),
            column: key.column.clone(),
            description: DESCRIPTION_NOT_AVAILABLE.to_string(),
            reasoning: REASONING_NOT_AVAILABLE.to_string(),
            truncated: None,
            upstream_models: Vec::new(),
        }
    }

    /// A node carrying the fact's text, with no children yet.
    pub(crate) fn from_fact(fact: &NormalizedFact) -> Self {
        Self {
            model: fact.key.model.clone(),
            column: fact.key.column.clone(),
            description: fact.description.clone(),
            reasoning: fact.reasoning.clone(),
            truncated: None,
            upstream_models: Vec::new(),
        }
    }

    pub(crate) fn truncated(mut self, reason: Truncation) -> Self {
        self.truncated = Some(reason);
        self
    }

    pub fn key(&self) -> ColumnKey {
        ColumnKey::normalized(&self.model, &self.column)
    }

    pub fn is_leaf(&self) -> bool {
        self.upstream_models.is_empty()
    }

    pub fn is_truncated_cycle(&self) -> bool {
        self.truncated == Some(Truncation::Cycle)
    }

    /// Number of levels in this tree, counting this node.
    pub fn depth(&self) -> usize {
        1 + self
            .upstream_models
            .iter()
            .map(LineageNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Total number of nodes in this tree.
    pub fn node_count(&self) -> usize {
        1 + self
            .upstream_models
            .iter()
            .map(LineageNode::node_count)
            .sum::<usize>()
    }

    /// Keys of every node in pre-order.
    pub fn keys(&self) -> Vec<ColumnKey> {
        let mut keys = Vec::with_capacity(self.node_count());
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys(&self, keys: &mut Vec<ColumnKey>) {
        keys.push(self.key());
        for upstream in &self.upstream_models {
            upstream.collect_keys(keys);
        }
    }

    /// Find the first direct upstream node for `model.column`.
    pub fn upstream(&self, model: &str, column: &str) -> Option<&LineageNode> {
        let key = ColumnKey::normalized(model, column);
        self.upstream_models.iter().find(|n| n.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_placeholders() {
        let node = LineageNode::boundary(&ColumnKey::normalized("raw_orders", "id"));
        assert_eq!(node.description, DESCRIPTION_NOT_AVAILABLE);
        assert_eq!(node.reasoning, REASONING_NOT_AVAILABLE);
        assert!(node.is_leaf());
        assert_eq!(node.depth(), 1);
    }

    #[test]
    fn test_truncation_serialization() {
        let node = LineageNode::boundary(&ColumnKey::normalized("a", "x"));
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("truncated").is_none());

        let marked = node.truncated(Truncation::Cycle);
        let json = serde_json::to_value(&marked).unwrap();
        assert_eq!(json["truncated"], "cycle");
        assert!(marked.is_truncated_cycle());
    }
}
