//! Cycle report over the whole fact table.
//!
//! Tree building truncates cycles per branch and carries on. This module is
//! the diagnostic counterpart: it loads every fact edge into a graph and lists
//! the strongly connected components so the offending facts can be fixed.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::facts::{ColumnKey, FactTable};

/// Cycles found in a fact table, each listed as the columns involved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycles: Vec<Vec<ColumnKey>>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cycles.is_empty() {
            return writeln!(f, "No circular dependencies in column lineage.");
        }
        writeln!(f, "Circular dependencies detected in column lineage:")?;
        for (i, cycle) in self.cycles.iter().enumerate() {
            let path = cycle
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" → ");
            writeln!(f, "  Cycle {}: {} → (back to start)", i + 1, path)?;
        }
        Ok(())
    }
}

/// Find every cycle among the fact table's upstream edges.
///
/// Edges run from an upstream column to the column derived from it. A single
/// column is reported only when it lists itself as upstream. Members of each
/// cycle and the cycles themselves are sorted for stable output.
pub fn detect_cycles(facts: &FactTable) -> CycleReport {
    let mut graph: DiGraph<ColumnKey, ()> = DiGraph::new();
    let mut index: HashMap<ColumnKey, NodeIndex> = HashMap::new();

    let mut node_for = |graph: &mut DiGraph<ColumnKey, ()>, key: &ColumnKey| {
        *index
            .entry(key.clone())
            .or_insert_with(|| graph.add_node(key.clone()))
    };

    for fact in facts.iter() {
        let target = node_for(&mut graph, &fact.key);
        for upstream in &fact.upstream {
            let source = node_for(&mut graph, upstream);
            graph.update_edge(source, target, ());
        }
    }

    let mut cycles: Vec<Vec<ColumnKey>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1 || graph.edges_connecting(scc[0], scc[0]).next().is_some()
        })
        .map(|scc| {
            let mut members: Vec<ColumnKey> = scc
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx).cloned())
                .collect();
            members.sort();
            members
        })
        .collect();
    cycles.sort();

    CycleReport { cycles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::LineageFact;

    fn table(rows: &[(&str, &str, &str, &str)]) -> FactTable {
        FactTable::from_facts(
            rows.iter()
                .map(|(m, c, t, u)| LineageFact::new(*m, *c).with_upstream(*t, *u)),
        )
        .unwrap()
    }

    #[test]
    fn test_detect_cycles_none() {
        let facts = table(&[("a", "x", "b", "y"), ("b", "y", "c", "z")]);
        let report = detect_cycles(&facts);
        assert!(report.is_empty());
    }

    #[test]
    fn test_detect_two_node_cycle() {
        let facts = table(&[("a", "x", "b", "y"), ("b", "y", "a", "x"), ("c", "z", "a", "x")]);
        let report = detect_cycles(&facts);

        assert_eq!(report.cycles.len(), 1);
        assert_eq!(
            report.cycles[0],
            vec![ColumnKey::normalized("a", "x"), ColumnKey::normalized("b", "y")]
        );
    }

    #[test]
    fn test_detect_self_loop() {
        let facts = table(&[("a", "x", "a", "x")]);
        let report = detect_cycles(&facts);
        assert_eq!(report.cycles, vec![vec![ColumnKey::normalized("a", "x")]]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let facts = table(&[
            ("top", "v", "a, b", "x, y"),
            ("a", "x", "c", "z"),
            ("b", "y", "c", "z"),
        ]);
        assert!(detect_cycles(&facts).is_empty());
    }

    #[test]
    fn test_report_display() {
        let facts = table(&[("a", "x", "b", "y"), ("b", "y", "a", "x")]);
        let text = detect_cycles(&facts).to_string();
        assert!(text.contains("Circular dependencies detected"));
        assert!(text.contains("Cycle 1: a.x → b.y → (back to start)"));
    }
}
