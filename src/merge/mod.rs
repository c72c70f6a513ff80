//! Grafting database-side lineage onto reporting-side field trees.
//!
//! Every reporting node that names a physical table is a join point. The
//! merger resolves `(table, column)` against the fact table and attaches the
//! [`TreeBuilder`] output for each matching fact as a database-side child.

use tracing::debug;

use crate::bi::{BiFieldNode, LineageChild};
use crate::facts::{ColumnKey, FactTable};
use crate::lineage::TreeBuilder;

/// Counts of join points that did and did not find a fact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Database-side subtrees attached.
    pub grafted: usize,
    /// Table-bearing reporting nodes with no matching fact.
    pub unmatched: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.grafted += other.grafted;
        self.unmatched += other.unmatched;
    }
}

/// A reporting-side field tree with database lineage grafted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedTree {
    /// Always the dashboard field.
    pub root: BiFieldNode,
    pub stats: MergeStats,
}

impl CombinedTree {
    /// Number of levels below the field, i.e. the deepest flattened row.
    pub fn depth(&self) -> usize {
        self.root.depth() - 1
    }
}

/// Merge with a default [`TreeBuilder`] over `facts`.
pub fn merge(bi_tree: BiFieldNode, facts: &FactTable) -> CombinedTree {
    Merger::new(TreeBuilder::new(facts)).merge(bi_tree)
}

/// Grafts database lineage using a configured [`TreeBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct Merger<'f> {
    builder: TreeBuilder<'f>,
}

impl<'f> Merger<'f> {
    pub fn new(builder: TreeBuilder<'f>) -> Self {
        Self { builder }
    }

    pub fn merge(&self, bi_tree: BiFieldNode) -> CombinedTree {
        let mut stats = MergeStats::default();
        let root = self.graft(bi_tree, &mut stats);
        debug!(
            field = %root.name,
            grafted = stats.grafted,
            unmatched = stats.unmatched,
            "merged field lineage"
        );
        CombinedTree { root, stats }
    }

    fn graft(&self, mut node: BiFieldNode, stats: &mut MergeStats) -> BiFieldNode {
        node.children = std::mem::take(&mut node.children)
            .into_iter()
            .map(|child| match child {
                LineageChild::Reporting(inner) => LineageChild::Reporting(self.graft(inner, stats)),
                database => database,
            })
            .collect();

        if !node.names_table() {
            return node;
        }

        let matches = self.matching_facts(&node);
        if matches.is_empty() {
            debug!(
                table = %node.table_name,
                column = %node.name,
                "no database lineage for reporting column"
            );
            stats.unmatched += 1;
            return node;
        }

        for key in matches {
            node.children
                .push(LineageChild::Database(self.builder.build_key(&key)));
            stats.grafted += 1;
        }
        node
    }

    /// Fact keys for every table the node names, without repeats.
    fn matching_facts(&self, node: &BiFieldNode) -> Vec<ColumnKey> {
        let mut keys: Vec<ColumnKey> = Vec::new();
        for table in node.tables() {
            for key in self.builder.facts().resolve(table, &node.name) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}
