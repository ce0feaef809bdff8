//! Graph construction from filtered facts.
//!
//! # Overview
//!
//! [`GraphBuilder`] consumes [`ResolvedFact`]s in input order and produces a
//! [`DependencyGraph`]: a simple directed [`petgraph`] graph keyed by
//! [`NodeId`]. An edge `A → B` means "A depends on B".
//!
//! ## Deduplication
//!
//! Repeated facts collapse into the existing edge. Each repeat is reported as
//! a [`FactWarning::DuplicateEdge`] unless `ignore_duplicates` is set, which
//! silences the warning and nothing else.
//!
//! ## Malformed facts
//!
//! Facts with an empty endpoint, and target-to-itself facts that the
//! extractor did not mark as valid, are skipped with a warning. Construction
//! never aborts on input.
//!
//! ## Content hash
//!
//! The graph carries a BLAKE3 hash of its sorted edge list so CI jobs can
//! diff two runs without comparing full reports.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use petgraph::graph::{DiGraph, EdgeIndex, EdgeReferences, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::GraphError;
use crate::fact::Suffix;
use crate::filter::{FilterOutcome, ResolvedFact};
use crate::graph::types::{EdgeKind, Node, NodeId};

// ---------------------------------------------------------------------------
// FactWarning
// ---------------------------------------------------------------------------

/// A fact the builder skipped or merged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactWarning {
    #[error("fact #{position}: empty source or destination, skipped")]
    EmptyIdentity { position: usize },

    #[error("fact #{position}: {target} depends on itself, skipped")]
    InvalidSelfLoop { position: usize, target: String },

    #[error("fact #{position}: duplicate edge {from} -> {to}")]
    DuplicateEdge {
        position: usize,
        from: NodeId,
        to: NodeId,
    },
}

impl FactWarning {
    /// Input position of the offending fact.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            Self::EmptyIdentity { position }
            | Self::InvalidSelfLoop { position, .. }
            | Self::DuplicateEdge { position, .. } => *position,
        }
    }
}

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// An owned edge, used to rebuild graphs and for sorted listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// The filtered dependency graph. Read-only once built.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<Node, EdgeKind>,
    node_map: HashMap<NodeId, NodeIndex>,
    content_hash: String,
}

impl DependencyGraph {
    /// Rebuild a graph from explicit node and edge lists.
    ///
    /// Duplicate nodes keep the first occurrence; duplicate edges are merged.
    /// Degrees are recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DanglingEdge`] when an edge endpoint is not in
    /// `nodes`.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = DiGraph::<Node, EdgeKind>::with_capacity(nodes.len(), edges.len());
        let mut node_map: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if node_map.contains_key(&node.id) {
                continue;
            }
            let id = node.id.clone();
            let idx = graph.add_node(node);
            node_map.insert(id, idx);
        }

        for edge in edges {
            let (Some(&from), Some(&to)) = (node_map.get(&edge.from), node_map.get(&edge.to))
            else {
                return Err(GraphError::DanglingEdge {
                    from: edge.from,
                    to: edge.to,
                });
            };
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, edge.kind);
            }
        }

        Ok(Self::seal(graph, node_map))
    }

    /// Compute degrees and the content hash. Called once per graph.
    fn seal(mut graph: DiGraph<Node, EdgeKind>, node_map: HashMap<NodeId, NodeIndex>) -> Self {
        let mut in_degree = vec![0usize; graph.node_count()];
        let mut out_degree = vec![0usize; graph.node_count()];
        for edge in graph.edge_references() {
            out_degree[edge.source().index()] += 1;
            in_degree[edge.target().index()] += 1;
        }
        for idx in graph.node_indices() {
            let node = &mut graph[idx];
            node.in_degree = in_degree[idx.index()];
            node.out_degree = out_degree[idx.index()];
        }

        let mut edges = edge_list(&graph);
        edges.sort_unstable();
        let content_hash = compute_edge_hash(&edges);

        Self {
            graph,
            node_map,
            content_hash,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the `NodeIndex` for a node identity.
    #[must_use]
    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.node_index(id).and_then(|idx| self.node(idx))
    }

    /// Nodes in insertion (first-seen) order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> EdgeReferences<'_, EdgeKind> {
        self.graph.edge_references()
    }

    /// Endpoint identities of an edge.
    #[must_use]
    pub fn endpoints(&self, edge: EdgeIndex) -> Option<(&NodeId, &NodeId)> {
        let (from, to) = self.graph.edge_endpoints(edge)?;
        Some((&self.graph[from].id, &self.graph[to].id))
    }

    #[must_use]
    pub fn contains_edge(&self, from: &NodeId, to: &NodeId) -> bool {
        match (self.node_index(from), self.node_index(to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn has_self_loop(&self, idx: NodeIndex) -> bool {
        self.graph.find_edge(idx, idx).is_some()
    }

    /// All edges, sorted by endpoint identity.
    #[must_use]
    pub fn sorted_edges(&self) -> Vec<Edge> {
        let mut edges = edge_list(&self.graph);
        edges.sort_unstable();
        edges
    }

    /// Underlying petgraph graph, for algorithms.
    #[must_use]
    pub const fn petgraph(&self) -> &DiGraph<Node, EdgeKind> {
        &self.graph
    }

    /// `blake3:<hex>` hash of the sorted edge list.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Check that the identity map and the graph agree.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::IndexMismatch`] when a map entry points at a
    /// node with a different identity or outside the graph.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (id, idx) in &self.node_map {
            match self.graph.node_weight(*idx) {
                Some(node) if node.id == *id => {}
                _ => {
                    return Err(GraphError::IndexMismatch {
                        id: id.clone(),
                        index: idx.index(),
                    });
                }
            }
        }
        for edge in self.graph.edge_references() {
            let from = &self.graph[edge.source()].id;
            let to = &self.graph[edge.target()].id;
            if !self.node_map.contains_key(from) || !self.node_map.contains_key(to) {
                return Err(GraphError::DanglingEdge {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

/// Result of building: the graph plus every warning raised on the way.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: DependencyGraph,
    pub warnings: Vec<FactWarning>,
}

/// Incremental builder. Nodes are created on first sight.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<Node, EdgeKind>,
    node_map: HashMap<NodeId, NodeIndex>,
    ignore_duplicates: bool,
    warnings: Vec<FactWarning>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn ignore_duplicates(mut self, ignore: bool) -> Self {
        self.ignore_duplicates = ignore;
        self
    }

    /// Create-or-reuse a node.
    pub fn add_node(&mut self, id: NodeId, suffix: Suffix) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(Node::new(id.clone(), suffix));
        self.node_map.insert(id, idx);
        idx
    }

    /// Add one surviving fact.
    pub fn add(&mut self, fact: &ResolvedFact) {
        if fact.source.name.is_empty() || fact.destination.name.is_empty() {
            self.warn(FactWarning::EmptyIdentity {
                position: fact.position,
            });
            return;
        }
        if fact.source == fact.destination && !fact.self_loop_valid {
            self.warn(FactWarning::InvalidSelfLoop {
                position: fact.position,
                target: fact.source.name.clone(),
            });
            return;
        }

        let from = self.add_node(fact.source.clone(), Suffix::None);
        let to = self.add_node(fact.destination.clone(), fact.suffix);

        let node = &mut self.graph[to];
        if node.subtitle.is_none() {
            node.subtitle.clone_from(&fact.subtitle);
        }
        if fact.is_collapsed() {
            node.collapsed_from.insert(fact.raw_destination.clone());
        }

        if self.graph.contains_edge(from, to) {
            if !self.ignore_duplicates {
                self.warn(FactWarning::DuplicateEdge {
                    position: fact.position,
                    from: fact.source.clone(),
                    to: fact.destination.clone(),
                });
            }
            return;
        }
        self.graph.add_edge(from, to, fact.kind);
    }

    fn warn(&mut self, warning: FactWarning) {
        warn!(%warning, "fact skipped or merged");
        self.warnings.push(warning);
    }

    /// Final degree pass.
    #[must_use]
    pub fn finish(self) -> BuildOutput {
        let graph = DependencyGraph::seal(self.graph, self.node_map);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            warnings = self.warnings.len(),
            "dependency graph built"
        );
        BuildOutput {
            graph,
            warnings: self.warnings,
        }
    }
}

/// Build a graph from a filter outcome: surviving facts in order, then any
/// isolated targets kept by the filter. Malformed facts the filter set aside
/// are reported first.
#[must_use]
#[instrument(skip_all, fields(facts = outcome.kept.len()))]
pub fn build(outcome: &FilterOutcome, ignore_duplicates: bool) -> BuildOutput {
    let mut builder = GraphBuilder::new().ignore_duplicates(ignore_duplicates);
    for warning in &outcome.warnings {
        builder.warn(warning.clone());
    }
    for fact in &outcome.kept {
        builder.add(fact);
    }
    for target in &outcome.isolated_targets {
        builder.add_node(target.clone(), Suffix::None);
    }
    builder.finish()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn edge_list(graph: &DiGraph<Node, EdgeKind>) -> Vec<Edge> {
    graph
        .edge_references()
        .map(|edge| Edge {
            from: graph[edge.source()].id.clone(),
            to: graph[edge.target()].id.clone(),
            kind: *edge.weight(),
        })
        .collect()
}

/// BLAKE3 of the sorted edge list.
fn compute_edge_hash(edges: &[Edge]) -> String {
    let mut hasher = blake3::Hasher::new();
    for edge in edges {
        for id in [&edge.from, &edge.to] {
            hasher.update(id.name.as_bytes());
            hasher.update(b"\x00");
            hasher.update(id.kind.as_str().as_bytes());
            hasher.update(b"\x00");
        }
        hasher.update(edge.kind.as_str().as_bytes());
        hasher.update(b"\x00");
    }
    format!("blake3:{}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
