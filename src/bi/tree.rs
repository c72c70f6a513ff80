//! Reporting-side field trees and the mixed child type used after merging.

use serde::{Deserialize, Serialize};

use super::{FieldInstance, UpstreamColumn};
use crate::lineage::LineageNode;

/// Which lineage source a node comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineageSide {
    #[serde(rename = "Reporting Side Lineage")]
    Reporting,
    #[serde(rename = "Database Side Lineage")]
    Database,
}

impl LineageSide {
    pub fn label(&self) -> &'static str {
        match self {
            LineageSide::Reporting => "Reporting Side Lineage",
            LineageSide::Database => "Database Side Lineage",
        }
    }
}

impl std::fmt::Display for LineageSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A child of a reporting-side node: another reporting node, or a
/// database-side tree grafted on by the merger.
///
/// Serialized with a `lineage_type` tag carrying the [`LineageSide`] label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "lineage_type")]
pub enum LineageChild {
    #[serde(rename = "Reporting Side Lineage")]
    Reporting(BiFieldNode),
    #[serde(rename = "Database Side Lineage")]
    Database(LineageNode),
}

impl LineageChild {
    pub fn side(&self) -> LineageSide {
        match self {
            LineageChild::Reporting(_) => LineageSide::Reporting,
            LineageChild::Database(_) => LineageSide::Database,
        }
    }

    /// Number of levels in this subtree, counting the child itself.
    pub fn depth(&self) -> usize {
        match self {
            LineageChild::Reporting(node) => node.depth(),
            LineageChild::Database(node) => node.depth(),
        }
    }
}

/// A dashboard field, calculation, or referenced column on the reporting side.
///
/// `table_name` is empty for nodes that live only in the dashboard (the field
/// itself, calculations). When the BI metadata lists several upstream tables
/// for a column, `table_name` is the first and `upstream_tables` holds them all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiFieldNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream_tables: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub formula: String,
    #[serde(default)]
    pub children: Vec<LineageChild>,
}

impl BiFieldNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the upstream tables, dropping blanks and case-insensitive repeats.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut upstream: Vec<String> = Vec::new();
        for table in tables {
            let table = table.as_ref().trim();
            if table.is_empty() || upstream.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                continue;
            }
            upstream.push(table.to_string());
        }
        self.table_name = upstream.first().cloned().unwrap_or_default();
        self.upstream_tables = upstream;
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into().trim().to_string();
        self
    }

    pub fn with_child(mut self, child: BiFieldNode) -> Self {
        self.children.push(LineageChild::Reporting(child));
        self
    }

    pub fn lineage_type(&self) -> LineageSide {
        LineageSide::Reporting
    }

    /// True when this node names a physical table.
    pub fn names_table(&self) -> bool {
        !self.table_name.is_empty()
    }

    /// Every table this node may come from, primary first.
    pub fn tables(&self) -> Vec<&str> {
        if self.upstream_tables.is_empty() && self.names_table() {
            return vec![self.table_name.as_str()];
        }
        self.upstream_tables.iter().map(String::as_str).collect()
    }

    /// Number of levels in this tree, counting this node.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(LineageChild::depth)
            .max()
            .unwrap_or(0)
    }

    pub fn database_children(&self) -> impl Iterator<Item = &LineageNode> {
        self.children.iter().filter_map(|c| match c {
            LineageChild::Database(node) => Some(node),
            LineageChild::Reporting(_) => None,
        })
    }

    pub fn reporting_children(&self) -> impl Iterator<Item = &BiFieldNode> {
        self.children.iter().filter_map(|c| match c {
            LineageChild::Reporting(node) => Some(node),
            LineageChild::Database(_) => None,
        })
    }
}

/// Build the reporting-side tree for one field instance.
///
/// The root is the field itself; its children are the columns and
/// calculations it reads, nested as the BI metadata nests them.
pub fn build_field_tree(field: &FieldInstance) -> BiFieldNode {
    let mut root = BiFieldNode::new(field.name.trim())
        .with_formula(field.formula.clone().unwrap_or_default());
    root.children = field
        .upstream_columns
        .iter()
        .map(|column| LineageChild::Reporting(column_node(column)))
        .collect();
    root
}

fn column_node(column: &UpstreamColumn) -> BiFieldNode {
    let mut node = BiFieldNode::new(column.name.trim())
        .with_tables(column.upstream_tables.iter().map(|t| t.name.as_str()))
        .with_formula(column.formula.clone().unwrap_or_default());
    node.children = column
        .upstream_columns
        .iter()
        .map(|nested| LineageChild::Reporting(column_node(nested)))
        .collect();
    node
}
