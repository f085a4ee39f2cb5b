//! Evaluation order resolution.
//!
//! Kahn's algorithm over formula cells: a cell is ready once every formula
//! cell it references has been placed. Among ready cells the smallest
//! `(sheet, row, col)` goes first, so the order is fully deterministic.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::debug;

use super::graph::DependencyGraph;
use crate::error::{CompileError, CompileResult};
use crate::types::CellId;

/// Order formula cells so every cell follows all formula cells it references.
///
/// Fails with [`CompileError::CyclicDependency`] naming one concrete cycle if
/// any cell cannot be placed. No partial order is returned.
pub fn resolve_order(graph: &DependencyGraph) -> CompileResult<Vec<CellId>> {
    let inner = graph.inner();

    let mut remaining: HashMap<NodeIndex, usize> = HashMap::new();
    let mut ready: BinaryHeap<Reverse<(CellId, NodeIndex)>> = BinaryHeap::new();

    for idx in inner.node_indices() {
        if !inner[idx].is_formula {
            continue;
        }
        let deps: HashSet<NodeIndex> = inner
            .neighbors_directed(idx, Direction::Outgoing)
            .filter(|d| inner[*d].is_formula)
            .collect();
        if deps.is_empty() {
            ready.push(Reverse((inner[idx].id.clone(), idx)));
        } else {
            remaining.insert(idx, deps.len());
        }
    }

    let mut order = Vec::new();
    while let Some(Reverse((id, idx))) = ready.pop() {
        order.push(id);

        let dependents: HashSet<NodeIndex> =
            inner.neighbors_directed(idx, Direction::Incoming).collect();
        for dependent in dependents {
            if let Some(count) = remaining.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    remaining.remove(&dependent);
                    ready.push(Reverse((inner[dependent].id.clone(), dependent)));
                }
            }
        }
    }

    if !remaining.is_empty() {
        let chain = find_cycle(graph);
        return Err(CompileError::CyclicDependency { chain });
    }

    debug!(cells = order.len(), "evaluation order resolved");
    Ok(order)
}

/// One shortest closed chain of references, starting at the smallest cell of
/// the cyclic component with the smallest member.
///
/// The chain is open: `[A1, B1]` stands for `A1 → B1 → A1`.
pub fn find_cycle(graph: &DependencyGraph) -> Vec<CellId> {
    let inner = graph.inner();

    let cyclic = tarjan_scc(inner).into_iter().filter(|component| {
        component.len() > 1 || inner.contains_edge(component[0], component[0])
    });

    let Some((start, members)) = cyclic
        .map(|component| {
            let start = component
                .iter()
                .copied()
                .min_by(|a, b| inner[*a].id.cmp(&inner[*b].id))
                .unwrap_or(component[0]);
            let members: BTreeSet<NodeIndex> = component.into_iter().collect();
            (start, members)
        })
        .min_by(|(a, _), (b, _)| inner[*a].id.cmp(&inner[*b].id))
    else {
        return Vec::new();
    };

    if inner.contains_edge(start, start) {
        return vec![inner[start].id.clone()];
    }

    // BFS from start inside the component until an edge leads back to start.
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    let mut seen = HashSet::from([start]);

    while let Some(current) = queue.pop_front() {
        let mut next: Vec<NodeIndex> = inner
            .neighbors_directed(current, Direction::Outgoing)
            .filter(|n| members.contains(n))
            .collect();
        next.sort_by(|a, b| inner[*a].id.cmp(&inner[*b].id));

        if next.contains(&start) {
            let mut chain = vec![current];
            let mut cursor = current;
            while let Some(&p) = parent.get(&cursor) {
                chain.push(p);
                cursor = p;
            }
            chain.reverse();
            return chain.into_iter().map(|n| inner[n].id.clone()).collect();
        }

        for n in next {
            if seen.insert(n) {
                parent.insert(n, current);
                queue.push_back(n);
            }
        }
    }

    vec![inner[start].id.clone()]
}
