//! Dependency graph over workbook cells.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "A's formula references B"
//! ```
//!
//! Nodes live in a petgraph arena and are addressed by index; cells never hold
//! pointers to each other. Nodes are every formula cell plus every cell some
//! formula references (value cells and cells missing from the workbook alike).
//! The graph is built once and never mutated afterwards.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::types::{CellId, Workbook};

/// Node payload: the cell and whether it holds a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellNode {
    pub id: CellId,
    pub is_formula: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<CellNode, ()>,
    index: HashMap<CellId, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph in a single pass over the workbook's formula cells.
    ///
    /// Ranges expand to one edge per contained cell; duplicate references
    /// collapse to a single edge. Construction never fails: cycles are
    /// reported when ordering.
    pub fn build(workbook: &Workbook) -> Self {
        let mut graph = Self::default();

        for (id, cell) in &workbook.cells {
            let Some(expr) = cell.expr() else {
                continue;
            };
            let from = graph.node(id, true);

            let refs: BTreeSet<CellId> = expr.references().into_iter().collect();
            for dep in refs {
                let is_formula = workbook.get(&dep).is_some_and(|c| c.is_formula());
                let to = graph.node(&dep, is_formula);
                graph.graph.add_edge(from, to, ());
            }
        }

        debug!(
            nodes = graph.graph.node_count(),
            edges = graph.graph.edge_count(),
            "dependency graph built"
        );
        graph
    }

    fn node(&mut self, id: &CellId, is_formula: bool) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            if is_formula {
                self.graph[idx].is_formula = true;
            }
            return idx;
        }
        let idx = self.graph.add_node(CellNode {
            id: id.clone(),
            is_formula,
        });
        self.index.insert(id.clone(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.index.contains_key(id)
    }

    /// Formula cells, ascending.
    pub fn formula_cells(&self) -> BTreeSet<CellId> {
        self.graph
            .node_weights()
            .filter(|n| n.is_formula)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Non-formula cells referenced by at least one formula, ascending.
    pub fn referenced_inputs(&self) -> BTreeSet<CellId> {
        self.graph
            .node_weights()
            .filter(|n| !n.is_formula)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Cells that `id`'s formula references, ascending.
    pub fn dependencies(&self, id: &CellId) -> Vec<CellId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Formula cells that reference `id`, ascending.
    pub fn dependents(&self, id: &CellId) -> Vec<CellId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &CellId, direction: Direction) -> Vec<CellId> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<CellId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].id.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub(crate) fn inner(&self) -> &DiGraph<CellNode, ()> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parse_formula;
    use crate::types::{Cell, Literal};

    fn id(a1: &str) -> CellId {
        CellId::parse(a1, "S").unwrap()
    }

    fn formula(wb: &mut Workbook, a1: &str, text: &str) {
        let expr = parse_formula(text, "S").unwrap();
        wb.insert(id(a1), Cell::formula(text, expr));
    }

    #[test]
    fn test_edges_point_from_formula_to_reference() {
        let mut wb = Workbook::new("book");
        wb.insert(id("A1"), Cell::value(Literal::Integer(2)));
        formula(&mut wb, "B1", "=A1*2");
        formula(&mut wb, "C1", "=B1+A1");

        let graph = DependencyGraph::build(&wb);

        assert_eq!(graph.dependencies(&id("C1")), vec![id("A1"), id("B1")]);
        assert_eq!(graph.dependents(&id("A1")), vec![id("B1"), id("C1")]);
        assert_eq!(graph.formula_cells().len(), 2);
        assert_eq!(
            graph.referenced_inputs().into_iter().collect::<Vec<_>>(),
            vec![id("A1")]
        );
    }

    #[test]
    fn test_range_expands_and_deduplicates() {
        let mut wb = Workbook::new("book");
        formula(&mut wb, "D1", "=SUM(A1:B2)+A1+SUM(A1:A2)");

        let graph = DependencyGraph::build(&wb);

        assert_eq!(
            graph.dependencies(&id("D1")),
            vec![id("A1"), id("B1"), id("A2"), id("B2")]
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        );
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_missing_cells_become_input_nodes() {
        let mut wb = Workbook::new("book");
        formula(&mut wb, "A1", "=Z99+1");

        let graph = DependencyGraph::build(&wb);

        assert!(graph.contains(&id("Z99")));
        assert!(graph.referenced_inputs().contains(&id("Z99")));
    }

    #[test]
    fn test_self_reference_builds_without_error() {
        let mut wb = Workbook::new("book");
        formula(&mut wb, "A1", "=A1+1");

        let graph = DependencyGraph::build(&wb);

        assert_eq!(graph.dependencies(&id("A1")), vec![id("A1")]);
        assert!(graph.referenced_inputs().is_empty());
    }
}
