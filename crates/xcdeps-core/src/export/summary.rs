//! Plain-text cycle reports: the `cycles.txt` key/value file and the
//! human-readable cycle listing.

use std::fmt::Write as _;

use petgraph::visit::EdgeRef;

use crate::analysis::Analysis;
use crate::graph::NodeId;

/// `HAS_CYCLES`, `CYCLES_COUNT` and one `CYCLE_<i>` line per cycle.
///
/// Cycle numbering starts at 1. The format is line-oriented so shell
/// scripts can `source` or `grep` it.
#[must_use]
pub fn cycles_txt(cycles: &[Vec<NodeId>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "HAS_CYCLES={}", !cycles.is_empty());
    let _ = writeln!(out, "CYCLES_COUNT={}", cycles.len());
    for (i, cycle) in cycles.iter().enumerate() {
        let members: Vec<&str> = cycle.iter().map(|id| id.name.as_str()).collect();
        let _ = writeln!(out, "CYCLE_{}={}", i + 1, members.join(","));
    }
    out
}

/// One-line status banner.
#[must_use]
pub fn banner(analysis: &Analysis) -> String {
    if analysis.has_cycles() {
        format!("CYCLES: PRESENT ({})", analysis.cycles_count())
    } else {
        "CYCLES: NONE".to_string()
    }
}

/// A cycle with its internal edges, for terminal output.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CycleDetail {
    pub members: Vec<String>,
    pub edges: Vec<(String, String)>,
}

/// Every cycle with the cyclic edges between its members, sorted.
#[must_use]
pub fn cycle_details(analysis: &Analysis) -> Vec<CycleDetail> {
    let graph = &analysis.graph;
    analysis
        .cycles
        .cycles
        .iter()
        .map(|cycle| {
            let mut edges: Vec<(String, String)> = graph
                .edges()
                .filter(|edge| analysis.cycles.contains_edge(edge.id()))
                .filter_map(|edge| graph.endpoints(edge.id()))
                .filter(|(from, to)| cycle.contains(from) && cycle.contains(to))
                .map(|(from, to)| (from.name.clone(), to.name.clone()))
                .collect();
            edges.sort_unstable();
            CycleDetail {
                members: cycle.iter().map(|id| id.name.clone()).collect(),
                edges,
            }
        })
        .collect()
}
