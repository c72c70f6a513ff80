//! Linearizing lineage trees into leveled rows.
//!
//! [`flatten`] walks a tree depth-first in pre-order. Every node below the
//! root becomes one [`FlatRow`] describing the edge that reached it: the
//! parent's model and column as `table`/`column`, the node's own as
//! `upstream_table`/`upstream_column`. Direct children of the root are at
//! level 1.

mod rebuild;

pub use rebuild::{rebuild, RebuiltTree, RowNode};

use serde::{Deserialize, Serialize};

use crate::bi::{BiFieldNode, LineageChild, LineageSide};
use crate::lineage::LineageNode;
use crate::merge::CombinedTree;

/// Export column headers, in order.
pub const COLUMNS: [&str; 12] = [
    "Dashboard Name",
    "Column Name on Dashboard",
    "Data Source Name",
    "Table Name",
    "Column Name in Table",
    "Upstream Table Name",
    "Upstream Column Name",
    "Level",
    "Formula",
    "Description",
    "Reasoning",
    "Lineage Type",
];

/// One edge of a lineage tree in tabular form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRow {
    #[serde(rename = "Dashboard Name")]
    pub dashboard: String,
    #[serde(rename = "Column Name on Dashboard")]
    pub dashboard_column: String,
    #[serde(rename = "Data Source Name")]
    pub data_source: String,
    #[serde(rename = "Table Name")]
    pub table: String,
    #[serde(rename = "Column Name in Table")]
    pub column: String,
    #[serde(rename = "Upstream Table Name")]
    pub upstream_table: String,
    #[serde(rename = "Upstream Column Name")]
    pub upstream_column: String,
    #[serde(rename = "Level")]
    pub level: usize,
    #[serde(rename = "Formula")]
    pub formula: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Reasoning")]
    pub reasoning: String,
    #[serde(rename = "Lineage Type")]
    pub lineage_type: String,
}

/// The dashboard field a tree belongs to, stamped on every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenContext {
    pub dashboard: String,
    pub dashboard_column: String,
    pub data_source: String,
}

impl FlattenContext {
    pub fn new(
        dashboard: impl Into<String>,
        data_source: impl Into<String>,
        dashboard_column: impl Into<String>,
    ) -> Self {
        Self {
            dashboard: dashboard.into(),
            dashboard_column: dashboard_column.into(),
            data_source: data_source.into(),
        }
    }
}

/// A borrowed node from either side of a combined tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Reporting(&'a BiFieldNode),
    Database(&'a LineageNode),
}

impl<'a> NodeRef<'a> {
    pub fn model(&self) -> &'a str {
        match self {
            NodeRef::Reporting(node) => &node.table_name,
            NodeRef::Database(node) => &node.model,
        }
    }

    pub fn column(&self) -> &'a str {
        match self {
            NodeRef::Reporting(node) => &node.name,
            NodeRef::Database(node) => &node.column,
        }
    }

    pub fn formula(&self) -> &'a str {
        match self {
            NodeRef::Reporting(node) => &node.formula,
            NodeRef::Database(_) => "",
        }
    }

    pub fn description(&self) -> &'a str {
        match self {
            NodeRef::Reporting(_) => "",
            NodeRef::Database(node) => &node.description,
        }
    }

    pub fn reasoning(&self) -> &'a str {
        match self {
            NodeRef::Reporting(_) => "",
            NodeRef::Database(node) => &node.reasoning,
        }
    }

    pub fn side(&self) -> LineageSide {
        match self {
            NodeRef::Reporting(_) => LineageSide::Reporting,
            NodeRef::Database(_) => LineageSide::Database,
        }
    }

    /// Children in insertion order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match self {
            NodeRef::Reporting(node) => node.children.iter().map(NodeRef::from).collect(),
            NodeRef::Database(node) => node.upstream_models.iter().map(NodeRef::Database).collect(),
        }
    }

    /// `(model, column)` of every node below this one, in pre-order.
    pub fn descendant_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for child in self.children() {
            pairs.push((child.model().to_string(), child.column().to_string()));
            pairs.extend(child.descendant_pairs());
        }
        pairs
    }
}

impl<'a> From<&'a BiFieldNode> for NodeRef<'a> {
    fn from(node: &'a BiFieldNode) -> Self {
        NodeRef::Reporting(node)
    }
}

impl<'a> From<&'a LineageNode> for NodeRef<'a> {
    fn from(node: &'a LineageNode) -> Self {
        NodeRef::Database(node)
    }
}

impl<'a> From<&'a LineageChild> for NodeRef<'a> {
    fn from(child: &'a LineageChild) -> Self {
        match child {
            LineageChild::Reporting(node) => NodeRef::Reporting(node),
            LineageChild::Database(node) => NodeRef::Database(node),
        }
    }
}

impl<'a> From<&'a CombinedTree> for NodeRef<'a> {
    fn from(tree: &'a CombinedTree) -> Self {
        NodeRef::Reporting(&tree.root)
    }
}

/// Flatten a tree into one row per node below the root.
///
/// The root is context only. When it names no table (a dashboard field),
/// level-1 rows use the data source name as their `table`.
pub fn flatten<'a>(root: impl Into<NodeRef<'a>>, context: &FlattenContext) -> Vec<FlatRow> {
    let root = root.into();
    let parent_model = if root.model().is_empty() {
        context.data_source.as_str()
    } else {
        root.model()
    };

    let mut rows = Vec::new();
    for child in root.children() {
        walk(child, (parent_model, root.column()), 1, context, &mut rows);
    }
    rows
}

fn walk(
    node: NodeRef<'_>,
    parent: (&str, &str),
    level: usize,
    context: &FlattenContext,
    rows: &mut Vec<FlatRow>,
) {
    rows.push(FlatRow {
        dashboard: context.dashboard.clone(),
        dashboard_column: context.dashboard_column.clone(),
        data_source: context.data_source.clone(),
        table: parent.0.to_string(),
        column: parent.1.to_string(),
        upstream_table: node.model().to_string(),
        upstream_column: node.column().to_string(),
        level,
        formula: node.formula().to_string(),
        description: node.description().to_string(),
        reasoning: node.reasoning().to_string(),
        lineage_type: node.side().label().to_string(),
    });

    for child in node.children() {
        walk(child, (node.model(), node.column()), level + 1, context, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{FactTable, LineageFact};
    use crate::lineage::TreeBuilder;
    use crate::merge::merge;

    fn facts() -> FactTable {
        FactTable::from_facts([
            LineageFact::new("orders", "total")
                .with_upstream("order_items", "price")
                .with_description("Order total"),
            LineageFact::new("order_items", "price")
                .with_description("Unit price")
                .with_reasoning("one to one mapping"),
        ])
        .unwrap()
    }

    #[test]
    fn test_flatten_database_tree() {
        let facts = facts();
        let tree = TreeBuilder::new(&facts).build("orders", "total");
        let rows = flatten(&tree, &FlattenContext::default());

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.level, 1);
        assert_eq!(row.table, "orders");
        assert_eq!(row.column, "total");
        assert_eq!(row.upstream_table, "order_items");
        assert_eq!(row.upstream_column, "price");
        assert_eq!(row.description, "Unit price");
        assert_eq!(row.reasoning, "one to one mapping");
        assert_eq!(row.lineage_type, "Database Side Lineage");
    }

    #[test]
    fn test_flatten_combined_tree() {
        let field = BiFieldNode::new("revenue")
            .with_child(BiFieldNode::new("total").with_tables(["orders"]));
        let combined = merge(field, &facts());
        let context = FlattenContext::new("Dashboard 1", "jaffle", "revenue");
        let rows = flatten(&combined, &context);

        let edges: Vec<_> = rows
            .iter()
            .map(|r| {
                (
                    r.level,
                    r.table.as_str(),
                    r.column.as_str(),
                    r.upstream_table.as_str(),
                    r.upstream_column.as_str(),
                )
            })
            .collect();
        assert_eq!(
            edges,
            vec![
                (1, "jaffle", "revenue", "orders", "total"),
                (2, "orders", "total", "orders", "total"),
                (3, "orders", "total", "order_items", "price"),
            ]
        );
        assert!(rows.iter().all(|r| r.dashboard == "Dashboard 1"));
        assert!(rows.iter().all(|r| r.dashboard_column == "revenue"));
        assert_eq!(rows[0].lineage_type, "Reporting Side Lineage");
        assert_eq!(rows[1].lineage_type, "Database Side Lineage");
    }

    #[test]
    fn test_flatten_leaf_root_yields_nothing() {
        let field = BiFieldNode::new("constant");
        assert!(flatten(&field, &FlattenContext::default()).is_empty());
    }

    #[test]
    fn test_formula_comes_from_visited_node() {
        let field = BiFieldNode::new("ratio").with_child(
            BiFieldNode::new("calc")
                .with_formula("SUM([a]) / SUM([b])")
                .with_child(BiFieldNode::new("a").with_tables(["t"])),
        );
        let rows = flatten(&field, &FlattenContext::default());

        assert_eq!(rows[0].formula, "SUM([a]) / SUM([b])");
        assert_eq!(rows[1].formula, "");
        assert_eq!(rows[1].table, "");
        assert_eq!(rows[1].column, "calc");
    }

    #[test]
    fn test_descendant_pairs() {
        let facts = facts();
        let tree = TreeBuilder::new(&facts).build("orders", "total");
        assert_eq!(
            NodeRef::from(&tree).descendant_pairs(),
            vec![("order_items".to_string(), "price".to_string())]
        );
    }
}
