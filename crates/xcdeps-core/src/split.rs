//! Per-framework and cycle-only views of the dependency graph.
//!
//! A view is a set of node and edge indices into the shared graph; it carries
//! no attributes of its own. Exporters look each index up in the
//! [`AttributeSet`](crate::attrs::AttributeSet) resolved for the full graph.
//!
//! Framework views are independent of each other, so they are derived with a
//! rayon fan-out. `collect` on an indexed parallel iterator keeps rank order.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::graph::{CycleSet, DependencyGraph, EdgeKind};

/// Which libraries get a view, and what each view contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Minimum degree of a focus node.
    pub min_degree: usize,
    /// Cap on the number of views; 0 means unlimited.
    pub max: usize,
    /// Add target→target edges among the view's targets.
    pub include_target_deps: bool,
    /// Add the other libraries the view's targets link.
    pub include_peer_libs: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            min_degree: 1,
            max: 0,
            include_target_deps: false,
            include_peer_libs: false,
        }
    }
}

/// Why an edge is part of a framework view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeRole {
    /// Target ↔ focus.
    Focus,
    TargetToTarget,
    /// Target → peer library.
    Peer,
}

/// Induced subgraph centred on one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkView {
    /// Position in the ranking, starting at 0.
    pub rank: usize,
    pub focus: NodeIndex,
    pub degree: usize,
    /// Targets with an edge to or from the focus, sorted by identity.
    pub targets: Vec<NodeIndex>,
    /// Other libraries linked by those targets, sorted by identity.
    pub peers: Vec<NodeIndex>,
    /// Edges sorted by role, then endpoint identities.
    pub edges: Vec<(EdgeIndex, EdgeRole)>,
}

impl FrameworkView {
    /// Every node in the view, focus first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::once(self.focus)
            .chain(self.targets.iter().copied())
            .chain(self.peers.iter().copied())
    }
}

/// Cycle members and cyclic edges only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleView {
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<EdgeIndex>,
}

impl CycleView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Rank non-target nodes by degree descending, then identity ascending,
/// keeping those at or above `min_degree` and at most `max`.
#[must_use]
pub fn select_focus_nodes(graph: &DependencyGraph, options: &SplitOptions) -> Vec<NodeIndex> {
    let mut candidates: Vec<NodeIndex> = graph
        .nodes()
        .filter(|(_, node)| node.kind().is_library() && node.degree() >= options.min_degree)
        .map(|(idx, _)| idx)
        .collect();

    candidates.sort_by_key(|&idx| {
        graph
            .node(idx)
            .map(|node| (Reverse(node.degree()), node.id.clone()))
    });

    if options.max > 0 {
        candidates.truncate(options.max);
    }
    candidates
}

/// Build every framework view, in rank order.
#[must_use]
#[instrument(skip_all, fields(min_degree = options.min_degree, max = options.max))]
pub fn split_by_framework(graph: &DependencyGraph, options: &SplitOptions) -> Vec<FrameworkView> {
    let focus = select_focus_nodes(graph, options);
    let views: Vec<FrameworkView> = focus
        .par_iter()
        .enumerate()
        .map(|(rank, &idx)| framework_view(graph, idx, rank, options))
        .collect();
    debug!(views = views.len(), "framework views derived");
    views
}

/// The view for a single focus node.
#[must_use]
pub fn framework_view(
    graph: &DependencyGraph,
    focus: NodeIndex,
    rank: usize,
    options: &SplitOptions,
) -> FrameworkView {
    let pg = graph.petgraph();
    let is_target = |idx: NodeIndex| graph.node(idx).is_some_and(|n| n.kind().is_target());

    let mut edges: Vec<(EdgeIndex, EdgeRole)> = Vec::new();
    let mut targets: BTreeSet<NodeIndex> = BTreeSet::new();

    for direction in [Direction::Incoming, Direction::Outgoing] {
        for edge in pg.edges_directed(focus, direction) {
            let other = if direction == Direction::Incoming {
                edge.source()
            } else {
                edge.target()
            };
            if other != focus && is_target(other) {
                targets.insert(other);
                edges.push((edge.id(), EdgeRole::Focus));
            }
        }
    }

    let mut peers: BTreeSet<NodeIndex> = BTreeSet::new();
    for &target in &targets {
        for edge in pg.edges_directed(target, Direction::Outgoing) {
            let to = edge.target();
            if options.include_target_deps
                && *edge.weight() == EdgeKind::TargetToTarget
                && to != target
                && targets.contains(&to)
            {
                edges.push((edge.id(), EdgeRole::TargetToTarget));
            } else if options.include_peer_libs && to != focus && !is_target(to) {
                peers.insert(to);
                edges.push((edge.id(), EdgeRole::Peer));
            }
        }
    }

    let sort_key = |idx: &NodeIndex| graph.node(*idx).map(|n| n.id.clone());
    let mut targets: Vec<NodeIndex> = targets.into_iter().collect();
    targets.sort_by_key(sort_key);
    let mut peers: Vec<NodeIndex> = peers.into_iter().collect();
    peers.sort_by_key(sort_key);

    edges.sort_by_key(|(edge, role)| {
        (
            *role,
            graph
                .endpoints(*edge)
                .map(|(from, to)| (from.clone(), to.clone())),
        )
    });

    FrameworkView {
        rank,
        focus,
        degree: graph.node(focus).map_or(0, crate::graph::Node::degree),
        targets,
        peers,
        edges,
    }
}

/// Every cycle member and every cyclic edge.
#[must_use]
pub fn cycle_view(cycles: &CycleSet) -> CycleView {
    CycleView {
        nodes: cycles.nodes().collect(),
        edges: cycles.edges().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::Fact;
    use crate::filter::FilterConfig;
    use crate::graph::build::build;
    use crate::graph::{NodeId, NodeKind, detect_cycles};

    fn graph_from(facts: &[Fact]) -> DependencyGraph {
        let filter = FilterConfig::default().compile().expect("compile");
        build(&filter.apply(facts), false).graph
    }

    fn name(graph: &DependencyGraph, idx: NodeIndex) -> String {
        graph.node(idx).map(|n| n.name().to_string()).unwrap_or_default()
    }

    fn fan_in(lib: &str, count: usize) -> Vec<Fact> {
        (0..count)
            .map(|i| Fact::library(format!("T{i}"), format!("{lib}.framework")))
            .collect()
    }

    #[test]
    fn ranking_breaks_ties_by_identity() {
        let mut facts = fan_in("Big", 5);
        facts.extend(fan_in("Zeta", 3));
        facts.extend(fan_in("Alpha", 3));
        let graph = graph_from(&facts);

        let options = SplitOptions {
            max: 2,
            ..SplitOptions::default()
        };
        let picked: Vec<String> = select_focus_nodes(&graph, &options)
            .into_iter()
            .map(|idx| name(&graph, idx))
            .collect();
        assert_eq!(picked, vec!["Big", "Alpha"]);
    }

    #[test]
    fn min_degree_filters_candidates() {
        let mut facts = fan_in("Big", 4);
        facts.extend(fan_in("Small", 1));
        let graph = graph_from(&facts);
        let options = SplitOptions {
            min_degree: 2,
            ..SplitOptions::default()
        };
        let picked = select_focus_nodes(&graph, &options);
        assert_eq!(picked.len(), 1);
        assert_eq!(name(&graph, picked[0]), "Big");
    }

    #[test]
    fn targets_are_never_focus_nodes() {
        let graph = graph_from(&[Fact::target("App", "Core"), Fact::target("Widget", "Core")]);
        assert!(select_focus_nodes(&graph, &SplitOptions::default()).is_empty());
    }

    #[test]
    fn view_contents_follow_options() {
        let facts = [
            Fact::library("App", "Alamofire.framework"),
            Fact::library("Core", "Alamofire.framework"),
            Fact::library("App", "Lottie.framework"),
            Fact::target("App", "Core"),
            Fact::target("App", "Unrelated"),
        ];
        let graph = graph_from(&facts);
        let focus = graph
            .node_index(&NodeId::new("Alamofire", NodeKind::ThirdPartyFramework))
            .expect("focus");

        let plain = framework_view(&graph, focus, 0, &SplitOptions::default());
        let targets: Vec<String> = plain.targets.iter().map(|&i| name(&graph, i)).collect();
        assert_eq!(targets, vec!["App", "Core"]);
        assert!(plain.peers.is_empty());
        assert_eq!(plain.edges.len(), 2);
        assert!(plain.edges.iter().all(|(_, role)| *role == EdgeRole::Focus));

        let full = framework_view(
            &graph,
            focus,
            0,
            &SplitOptions {
                include_target_deps: true,
                include_peer_libs: true,
                ..SplitOptions::default()
            },
        );
        let peers: Vec<String> = full.peers.iter().map(|&i| name(&graph, i)).collect();
        assert_eq!(peers, vec!["Lottie"]);
        let roles: Vec<EdgeRole> = full.edges.iter().map(|(_, role)| *role).collect();
        assert_eq!(
            roles,
            vec![
                EdgeRole::Focus,
                EdgeRole::Focus,
                EdgeRole::TargetToTarget,
                EdgeRole::Peer
            ]
        );
    }

    #[test]
    fn parallel_split_keeps_rank_order() {
        let mut facts = fan_in("A", 1);
        facts.extend(fan_in("B", 4));
        facts.extend(fan_in("C", 2));
        let graph = graph_from(&facts);
        let views = split_by_framework(&graph, &SplitOptions::default());
        let names: Vec<String> = views.iter().map(|v| name(&graph, v.focus)).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert!(views.iter().enumerate().all(|(i, v)| v.rank == i));
    }

    #[test]
    fn cycle_view_holds_members_and_cyclic_edges() {
        let graph = graph_from(&[
            Fact::target("A", "B"),
            Fact::target("B", "A"),
            Fact::target("B", "C"),
        ]);
        let cycles = detect_cycles(&graph);
        let view = cycle_view(&cycles);
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.edges.len(), 2);
    }
}
