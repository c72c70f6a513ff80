//! Reconstructing a tree from flattened rows.

use serde::Serialize;

use super::FlatRow;
use crate::error::{LineageError, LineageResult};

/// A node rebuilt from a row: the row's upstream side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowNode {
    pub model: String,
    pub column: String,
    pub level: usize,
    pub children: Vec<RowNode>,
}

/// The tree described by one field's rows.
///
/// The root comes from the `table`/`column` of the level-1 rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuiltTree {
    pub model: String,
    pub column: String,
    pub children: Vec<RowNode>,
}

impl RebuiltTree {
    /// `(model, column)` of every node below the root, in pre-order.
    pub fn descendant_pairs(&self) -> Vec<(String, String)> {
        fn collect(nodes: &[RowNode], pairs: &mut Vec<(String, String)>) {
            for node in nodes {
                pairs.push((node.model.clone(), node.column.clone()));
                collect(&node.children, pairs);
            }
        }
        let mut pairs = Vec::new();
        collect(&self.children, &mut pairs);
        pairs
    }

    /// Deepest level present, zero for an empty tree.
    pub fn depth(&self) -> usize {
        fn deepest(nodes: &[RowNode]) -> usize {
            nodes
                .iter()
                .map(|n| n.level.max(deepest(&n.children)))
                .max()
                .unwrap_or(0)
        }
        deepest(&self.children)
    }
}

/// Rebuild the tree for one field from its rows, in the order [`flatten`]
/// emitted them.
///
/// Rows are grouped by level and attached to the nearest preceding row one
/// level up, whose upstream side must equal the row's `table`/`column`.
///
/// [`flatten`]: super::flatten
pub fn rebuild(rows: &[FlatRow]) -> LineageResult<RebuiltTree> {
    let Some(first) = rows.first() else {
        return Ok(RebuiltTree::default());
    };
    if first.level != 1 {
        return Err(LineageError::MalformedRows {
            row: 0,
            reason: format!("first row is at level {}, expected 1", first.level),
        });
    }

    let mut tree = RebuiltTree {
        model: first.table.clone(),
        column: first.column.clone(),
        children: Vec::new(),
    };
    let mut position = 0;
    let root = (first.table.as_str(), first.column.as_str());
    tree.children = read_level(rows, &mut position, 1, root)?;

    if let Some(row) = rows.get(position) {
        return Err(LineageError::MalformedRows {
            row: position,
            reason: format!("unexpected level {}", row.level),
        });
    }
    Ok(tree)
}

fn read_level(
    rows: &[FlatRow],
    position: &mut usize,
    level: usize,
    parent: (&str, &str),
) -> LineageResult<Vec<RowNode>> {
    let mut nodes = Vec::new();

    while let Some(row) = rows.get(*position) {
        if row.level < level {
            break;
        }
        if row.level > level {
            return Err(LineageError::MalformedRows {
                row: *position,
                reason: format!("level {} skips level {}", row.level, level),
            });
        }
        if row.table != parent.0 || row.column != parent.1 {
            return Err(LineageError::MalformedRows {
                row: *position,
                reason: format!(
                    "parent {}.{} does not match preceding {}.{}",
                    row.table, row.column, parent.0, parent.1
                ),
            });
        }

        *position += 1;
        let children = read_level(
            rows,
            position,
            level + 1,
            (row.upstream_table.as_str(), row.upstream_column.as_str()),
        )?;
        nodes.push(RowNode {
            model: row.upstream_table.clone(),
            column: row.upstream_column.clone(),
            level,
            children,
        });
    }

    Ok(nodes)
}
