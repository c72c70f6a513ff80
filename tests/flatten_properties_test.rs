//! Properties of flattened lineage: level numbering, round-trips through
//! `rebuild`, determinism, diamonds and cycles.

use threadline::bi::BiFieldNode;
use threadline::facts::{FactTable, LineageFact};
use threadline::flatten::{flatten, rebuild, FlatRow, FlattenContext, NodeRef};
use threadline::lineage::{LineageNode, TreeBuilder, Truncation};
use threadline::merge::merge;

/// `model.column <- upstream tables / columns`
fn facts(rows: &[(&str, &str, &str, &str)]) -> FactTable {
    FactTable::from_facts(
        rows.iter()
            .map(|(m, c, t, u)| LineageFact::new(*m, *c).with_upstream(*t, *u)),
    )
    .unwrap()
}

/// A diamond: d.w reads b.y and c.z, both of which read a.x, which reads raw.v.
fn diamond() -> FactTable {
    facts(&[
        ("d", "w", "b, c", "y, z"),
        ("b", "y", "a", "x"),
        ("c", "z", "a", "x"),
        ("a", "x", "raw", "v"),
    ])
}

/// Every row is at level 1 or exactly one below the nearest earlier row.
fn assert_levels_step_by_one(rows: &[FlatRow]) {
    let mut previous = 0;
    for (i, row) in rows.iter().enumerate() {
        assert!(row.level >= 1, "row {} has level 0", i);
        assert!(
            row.level <= previous + 1,
            "row {} jumps from level {} to {}",
            i,
            previous,
            row.level
        );
        previous = row.level;
    }
}

fn count(tree: &LineageNode, model: &str) -> usize {
    tree.keys().iter().filter(|k| k.model == model).count()
}

#[test]
fn test_single_hop_example() {
    let table = facts(&[("orders", "total", "order_items", "price")]);
    let tree = TreeBuilder::new(&table).build("orders", "total");
    let rows = flatten(&tree, &FlattenContext::default());

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].level, 1);
    assert_eq!(rows[0].table, "orders");
    assert_eq!(rows[0].column, "total");
    assert_eq!(rows[0].upstream_table, "order_items");
    assert_eq!(rows[0].upstream_column, "price");
}

#[test]
fn test_levels_cover_full_depth() {
    let table = diamond();
    let tree = TreeBuilder::new(&table).build("d", "w");
    let rows = flatten(&tree, &FlattenContext::default());

    assert_levels_step_by_one(&rows);
    let deepest = rows.iter().map(|r| r.level).max().unwrap();
    // The root is not emitted, so the deepest row sits one above the tree depth.
    assert_eq!(deepest, tree.depth() - 1);
    for level in 1..=deepest {
        assert!(rows.iter().any(|r| r.level == level), "no row at level {}", level);
    }
}

#[test]
fn test_rebuild_reproduces_pairs() {
    let table = diamond();
    let tree = TreeBuilder::new(&table).build("d", "w");
    let rows = flatten(&tree, &FlattenContext::default());

    let rebuilt = rebuild(&rows).unwrap();
    assert_eq!(rebuilt.model, "d");
    assert_eq!(rebuilt.column, "w");
    assert_eq!(rebuilt.descendant_pairs(), NodeRef::from(&tree).descendant_pairs());
    assert_eq!(rebuilt.depth(), tree.depth() - 1);
}

#[test]
fn test_rebuild_combined_tree() {
    let table = diamond();
    let field = BiFieldNode::new("Weight").with_child(
        BiFieldNode::new("Weighted")
            .with_formula("SUM([w])")
            .with_child(BiFieldNode::new("w").with_tables(["D"])),
    );
    let combined = merge(field, &table);
    let rows = flatten(&combined, &FlattenContext::new("Ops", "warehouse", "Weight"));

    assert_levels_step_by_one(&rows);
    let rebuilt = rebuild(&rows).unwrap();
    assert_eq!(rebuilt.model, "warehouse");
    assert_eq!(rebuilt.column, "Weight");
    assert_eq!(
        rebuilt.descendant_pairs(),
        NodeRef::from(&combined).descendant_pairs()
    );
    assert_eq!(rebuilt.depth(), combined.depth());
}

#[test]
fn test_diamond_is_flattened_under_both_parents() {
    let table = diamond();
    let tree = TreeBuilder::new(&table).build("d", "w");

    assert_eq!(count(&tree, "a"), 2);
    assert_eq!(count(&tree, "raw"), 2);

    let rows = flatten(&tree, &FlattenContext::default());
    let into_a: Vec<_> = rows
        .iter()
        .filter(|r| r.upstream_table == "a")
        .map(|r| (r.level, r.table.as_str()))
        .collect();
    assert_eq!(into_a, vec![(2, "b"), (2, "c")]);
}

#[test]
fn test_flatten_is_deterministic() {
    let table = diamond();
    let builder = TreeBuilder::new(&table);
    let context = FlattenContext::new("Ops", "warehouse", "w");

    let first = flatten(&builder.build("d", "w"), &context);
    let second = flatten(&builder.build("d", "w"), &context);
    assert_eq!(first, second);
}

#[test]
fn test_cycle_is_flattened_once() {
    let table = facts(&[("a", "x", "b", "y"), ("b", "y", "a", "x")]);
    let tree = TreeBuilder::new(&table).build("a", "x");
    let rows = flatten(&tree, &FlattenContext::default());

    let edges: Vec<_> = rows
        .iter()
        .map(|r| (r.level, r.upstream_table.as_str(), r.upstream_column.as_str()))
        .collect();
    assert_eq!(edges, vec![(1, "b", "y"), (2, "a", "x")]);
    assert_eq!(tree.upstream_models[0].upstream_models[0].truncated, Some(Truncation::Cycle));
}

#[test]
fn test_depth_limit_bounds_rows() {
    let chain: Vec<(String, String)> = (0..10)
        .map(|i| (format!("m{}", i), format!("m{}", i + 1)))
        .collect();
    let table = FactTable::from_facts(
        chain
            .iter()
            .map(|(m, up)| LineageFact::new(m.as_str(), "c").with_upstream(up.as_str(), "c")),
    )
    .unwrap();

    let tree = TreeBuilder::new(&table).with_max_depth(3).build("m0", "c");
    let rows = flatten(&tree, &FlattenContext::default());

    assert_eq!(rows.iter().map(|r| r.level).max(), Some(3));
    let last = &tree.upstream_models[0].upstream_models[0].upstream_models[0];
    assert_eq!(last.truncated, Some(Truncation::Depth));
    assert!(last.is_leaf());
}
