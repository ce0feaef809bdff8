//! Cycle detection over the dependency graph.
//!
//! A cycle is a strongly connected component with two or more members, or a
//! single node with a self-loop. Components come from petgraph's
//! `tarjan_scc`, which visits nodes in insertion order; members and the cycle
//! list are sorted afterwards so enumeration is stable across runs.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, instrument};

use crate::graph::build::DependencyGraph;
use crate::graph::types::NodeId;

/// Every cycle of a graph, plus the cyclic node and edge sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSet {
    /// Sorted member lists, themselves sorted.
    pub cycles: Vec<Vec<NodeId>>,
    nodes: BTreeSet<NodeIndex>,
    edges: BTreeSet<EdgeIndex>,
}

impl CycleSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    #[must_use]
    pub fn contains_node(&self, idx: NodeIndex) -> bool {
        self.nodes.contains(&idx)
    }

    #[must_use]
    pub fn contains_edge(&self, idx: EdgeIndex) -> bool {
        self.edges.contains(&idx)
    }

    /// Cycle member nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.nodes.iter().copied()
    }

    /// Cyclic edges in index order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.edges.iter().copied()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Find all cycles in `graph`.
///
/// An edge is cyclic when both endpoints belong to the same cycle.
#[must_use]
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn detect_cycles(graph: &DependencyGraph) -> CycleSet {
    if graph.edge_count() == 0 {
        return CycleSet::default();
    }

    let pg = graph.petgraph();
    let mut component_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut cycles: Vec<Vec<NodeId>> = Vec::new();
    let mut nodes = BTreeSet::new();

    for component in tarjan_scc(pg) {
        let is_cycle = component.len() > 1
            || component
                .first()
                .is_some_and(|&idx| graph.has_self_loop(idx));
        if !is_cycle {
            continue;
        }
        let slot = cycles.len();
        let mut members: Vec<NodeId> = Vec::with_capacity(component.len());
        for idx in component {
            component_of.insert(idx, slot);
            nodes.insert(idx);
            members.push(pg[idx].id.clone());
        }
        members.sort_unstable();
        cycles.push(members);
    }

    let edges: BTreeSet<EdgeIndex> = pg
        .edge_references()
        .filter(|edge| {
            matches!(
                (component_of.get(&edge.source()), component_of.get(&edge.target())),
                (Some(a), Some(b)) if a == b
            )
        })
        .map(|edge| edge.id())
        .collect();

    cycles.sort_unstable();
    debug!(cycles = cycles.len(), cyclic_edges = edges.len(), "cycle detection done");

    CycleSet {
        cycles,
        nodes,
        edges,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
