//! Graphviz DOT writers for the full graph, the cycle view and framework
//! views.
//!
//! Output is deterministic: nodes are written targets first, each group
//! sorted by name, and edges sorted by endpoint identity. Styling comes from
//! the resolved [`AttributeSet`](crate::attrs::AttributeSet) only.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::analysis::Analysis;
use crate::attrs::{
    ColorClass, EdgeAttrs, EdgeColorClass, LegendEntry, NodeAttrs, Palette, RenderOptions,
    ShapeClass, framework_legend, legend,
};
use crate::graph::{DependencyGraph, Node};
use crate::split::{EdgeRole, FrameworkView};

const NODE_PENWIDTH: &str = "2.0";
const FOCUS_PENWIDTH: &str = "2.2";
const EDGE_PENWIDTH: &str = "2.2";
const LEGEND_COLOR: &str = "#cccccc";

/// Escape a string for use inside a double-quoted DOT id or label.
#[must_use]
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Node ids
// ---------------------------------------------------------------------------

/// DOT ids for every node. A name shared by nodes of different kinds gets
/// the kind appended so ids stay unique.
struct NodeIds {
    ids: HashMap<NodeIndex, String>,
}

impl NodeIds {
    fn new(graph: &DependencyGraph) -> Self {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut shared: HashSet<&str> = HashSet::new();
        for (_, node) in graph.nodes() {
            if !seen.insert(node.name()) {
                shared.insert(node.name());
            }
        }
        let ids = graph
            .nodes()
            .map(|(idx, node)| {
                let id = if shared.contains(node.name()) {
                    format!("{}#{}", node.name(), node.kind().as_str())
                } else {
                    node.name().to_string()
                };
                (idx, escape(&id))
            })
            .collect();
        Self { ids }
    }

    fn get(&self, idx: NodeIndex) -> &str {
        self.ids.get(&idx).map_or("", String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Shared writers
// ---------------------------------------------------------------------------

fn header(out: &mut String, name: &str, options: &RenderOptions, title_lines: &[String]) {
    let font = escape(&options.font);
    let _ = writeln!(out, "digraph {name} {{");
    let _ = writeln!(out, "  rankdir={};", options.rankdir);
    let _ = writeln!(out, "  graph [fontname=\"{font}\", fontsize=10, labelloc=\"t\"];");
    let _ = writeln!(out, "  node  [fontname=\"{font}\", fontsize=10];");
    let _ = writeln!(
        out,
        "  edge  [fontname=\"{font}\", fontsize=9, color=\"{}\"];",
        options.palette.edge
    );
    let label: Vec<String> = title_lines.iter().map(|l| escape(l)).collect();
    let _ = writeln!(out, "  label=\"{}\";", label.join("\\n"));
    out.push('\n');
}

fn node_label(node: &Node) -> String {
    let name = escape(node.name());
    match &node.subtitle {
        Some(sub) => format!("{name}\\n({})", escape(sub)),
        None => name,
    }
}

fn node_line(
    id: &str,
    node: &Node,
    shape: ShapeClass,
    fill: &str,
    stroke: &str,
    penwidth: Option<&str>,
) -> String {
    let mut line = format!(
        "  \"{id}\" [label=\"{}\", shape={}, style=filled, fillcolor=\"{fill}\", color=\"{stroke}\"",
        node_label(node),
        shape.as_str(),
    );
    if let Some(width) = penwidth {
        let _ = write!(line, ", penwidth={width}");
    }
    line.push_str("];");
    line
}

fn styled_node(id: &str, node: &Node, attrs: &NodeAttrs, palette: &Palette) -> String {
    node_line(
        id,
        node,
        attrs.shape,
        attrs.color.fill(palette),
        attrs.color.stroke(palette),
        attrs.emphasized.then_some(NODE_PENWIDTH),
    )
}

fn edge_line(from: &str, to: &str, attrs: &EdgeAttrs, role: EdgeRole, palette: &Palette) -> String {
    let style = match (attrs.color, role) {
        (EdgeColorClass::Cycle | EdgeColorClass::Highlight, EdgeRole::Peer) => format!(
            " [color=\"{}\", penwidth={EDGE_PENWIDTH}, style=solid]",
            attrs.color.color(palette)
        ),
        (EdgeColorClass::Cycle | EdgeColorClass::Highlight, _) => format!(
            " [color=\"{}\", penwidth={EDGE_PENWIDTH}]",
            attrs.color.color(palette)
        ),
        (_, EdgeRole::Peer) => format!(
            " [color=\"{}\", style=dashed]",
            EdgeColorClass::Peer.color(palette)
        ),
        (EdgeColorClass::TargetToTarget, _) => {
            format!(" [color=\"{}\"]", EdgeColorClass::TargetToTarget.color(palette))
        }
        _ => String::new(),
    };
    format!("  \"{from}\" -> \"{to}\"{style};")
}

fn write_legend(out: &mut String, entries: &[LegendEntry], palette: &Palette) {
    out.push('\n');
    out.push_str("  // Legend\n");
    out.push_str("  subgraph cluster_legend {\n");
    let _ = writeln!(
        out,
        "    label=\"Legend\"; fontsize=11; color=\"{LEGEND_COLOR}\"; style=rounded;"
    );
    for (i, entry) in entries.iter().enumerate() {
        match entry {
            LegendEntry::Node {
                label,
                color,
                shape,
            } => {
                let penwidth = if matches!(
                    color,
                    ColorClass::Cycle | ColorClass::Highlight | ColorClass::Focus
                ) {
                    format!(", penwidth={NODE_PENWIDTH}")
                } else {
                    String::new()
                };
                let _ = writeln!(
                    out,
                    "    \"LEG_N{i}\" [label=\"{}\", shape={}, style=filled, fillcolor=\"{}\", color=\"{}\"{penwidth}];",
                    escape(label),
                    shape.as_str(),
                    color.fill(palette),
                    color.stroke(palette),
                );
            }
            LegendEntry::Edge { label, color } => {
                let penwidth = if matches!(color, EdgeColorClass::Cycle) {
                    format!(", penwidth={EDGE_PENWIDTH}")
                } else {
                    String::new()
                };
                let _ = writeln!(
                    out,
                    "    \"LEG_E{i}a\" [shape=point, width=0.05]; \"LEG_E{i}b\" [shape=point, width=0.05];"
                );
                let _ = writeln!(
                    out,
                    "    \"LEG_E{i}a\" -> \"LEG_E{i}b\" [label=\"{}\", fontcolor=\"{c}\", color=\"{c}\"{penwidth}];",
                    escape(label),
                    c = color.color(palette),
                );
            }
        }
    }
    out.push_str("  }\n");
}

fn title_lines(first: Vec<String>, options: &RenderOptions, generated_at: Option<&str>) -> Vec<String> {
    let mut lines = first;
    if let Some(at) = generated_at {
        lines.push(format!("Generated: {at}"));
    }
    if let Some(sub) = &options.subtitle {
        lines.insert(1, sub.clone());
    }
    lines
}

/// Nodes ordered for output: targets first, then libraries, each by name.
fn ordered_nodes(graph: &DependencyGraph, nodes: impl Iterator<Item = NodeIndex>) -> Vec<NodeIndex> {
    let mut ordered: Vec<NodeIndex> = nodes.collect();
    ordered.sort_by_key(|&idx| {
        graph
            .node(idx)
            .map(|n| (n.kind().is_library(), n.name().to_string(), n.kind()))
    });
    ordered
}

fn ordered_edges(graph: &DependencyGraph, edges: impl Iterator<Item = EdgeIndex>) -> Vec<EdgeIndex> {
    let mut ordered: Vec<EdgeIndex> = edges.collect();
    ordered.sort_by_key(|&e| {
        graph
            .endpoints(e)
            .map(|(from, to)| (from.clone(), to.clone()))
    });
    ordered
}

// ---------------------------------------------------------------------------
// Full graph
// ---------------------------------------------------------------------------

/// `digraph XcodeDeps` for the whole filtered graph.
#[must_use]
pub fn full_graph(analysis: &Analysis, generated_at: Option<&str>) -> String {
    let graph = &analysis.graph;
    let options = &analysis.config.render;
    let cycles_part = if analysis.has_cycles() {
        "Cycles: YES"
    } else {
        "Cycles: NO"
    };
    let title = title_lines(
        vec![options.title.clone(), cycles_part.to_string()],
        options,
        generated_at,
    );
    let nodes = graph.nodes().map(|(idx, _)| idx);
    let edges = graph.edges().map(|e| e.id());

    let mut out = String::new();
    header(&mut out, "XcodeDeps", options, &title);
    write_body(&mut out, analysis, nodes, edges);
    write_legend(
        &mut out,
        &legend(options, analysis.has_highlights()),
        &options.palette,
    );
    out.push_str("}\n");
    out
}

/// `digraph XcodeCycles` holding cycle members and cyclic edges only.
#[must_use]
pub fn cycle_graph(analysis: &Analysis, generated_at: Option<&str>) -> String {
    let options = &analysis.config.render;
    let title = title_lines(
        vec![
            format!("{} (cycles only)", options.title),
            format!("Cycles: {}", analysis.cycles_count()),
        ],
        options,
        generated_at,
    );

    let mut out = String::new();
    header(&mut out, "XcodeCycles", options, &title);
    write_body(
        &mut out,
        analysis,
        analysis.cycles.nodes(),
        analysis.cycles.edges(),
    );
    write_legend(
        &mut out,
        &legend(options, analysis.has_highlights()),
        &options.palette,
    );
    out.push_str("}\n");
    out
}

fn write_body(
    out: &mut String,
    analysis: &Analysis,
    nodes: impl Iterator<Item = NodeIndex>,
    edges: impl Iterator<Item = EdgeIndex>,
) {
    let graph = &analysis.graph;
    let palette = &analysis.config.render.palette;
    let ids = NodeIds::new(graph);
    let nodes = ordered_nodes(graph, nodes);

    out.push_str("  // Targets\n");
    let mut in_libraries = false;
    for idx in nodes {
        let (Some(node), Some(attrs)) = (graph.node(idx), analysis.attrs.node(idx)) else {
            continue;
        };
        if node.kind().is_library() && !in_libraries {
            out.push_str("\n  // Frameworks / Libraries / SPM\n");
            in_libraries = true;
        }
        out.push_str(&styled_node(ids.get(idx), node, attrs, palette));
        out.push('\n');
    }

    out.push_str("\n  // Edges\n");
    for edge in ordered_edges(graph, edges) {
        let (Some((from, to)), Some(attrs)) = (
            graph.petgraph().edge_endpoints(edge),
            analysis.attrs.edge(edge),
        ) else {
            continue;
        };
        out.push_str(&edge_line(ids.get(from), ids.get(to), attrs, EdgeRole::Focus, palette));
        out.push('\n');
    }
}

// ---------------------------------------------------------------------------
// Framework view
// ---------------------------------------------------------------------------

/// `digraph FrameworkView` centred on `view.focus`.
#[must_use]
pub fn framework_graph(analysis: &Analysis, view: &FrameworkView, generated_at: Option<&str>) -> String {
    let graph = &analysis.graph;
    let options = &analysis.config.render;
    let palette = &options.palette;
    let ids = NodeIds::new(graph);

    let focus_name = graph.node(view.focus).map_or("", Node::name);
    let title = title_lines(
        vec![
            format!("Framework view: {focus_name}"),
            format!("Targets: {}", view.targets.len()),
        ],
        options,
        generated_at,
    );

    let mut out = String::new();
    header(&mut out, "FrameworkView", options, &title);

    if let (Some(node), Some(attrs)) = (graph.node(view.focus), analysis.attrs.node(view.focus)) {
        let (fill, stroke, penwidth) = match attrs.color {
            ColorClass::Cycle => (&palette.cycle_fill, &palette.cycle_stroke, FOCUS_PENWIDTH),
            ColorClass::System => (&palette.libsys_fill, &palette.focus_stroke, NODE_PENWIDTH),
            _ => (&palette.focus_fill, &palette.focus_stroke, NODE_PENWIDTH),
        };
        let line = node_line(
            ids.get(view.focus),
            node,
            attrs.shape,
            fill,
            stroke,
            Some(penwidth),
        );
        out.push_str(&line);
        out.push('\n');
    }

    for &idx in view.targets.iter().chain(view.peers.iter()) {
        if let (Some(node), Some(attrs)) = (graph.node(idx), analysis.attrs.node(idx)) {
            out.push_str(&styled_node(ids.get(idx), node, attrs, palette));
            out.push('\n');
        }
    }

    out.push('\n');
    for &(edge, role) in &view.edges {
        let (Some((from, to)), Some(attrs)) = (
            graph.petgraph().edge_endpoints(edge),
            analysis.attrs.edge(edge),
        ) else {
            continue;
        };
        out.push_str(&edge_line(ids.get(from), ids.get(to), attrs, role, palette));
        out.push('\n');
    }

    write_legend(&mut out, &framework_legend(options), palette);
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::RenderConfig;
    use crate::config::{AnalysisConfig, ViewSelection};
    use crate::fact::Fact;
    use crate::filter::FilterConfig;

    fn analyze(facts: &[Fact], config: &AnalysisConfig) -> Analysis {
        Analysis::run(facts, config).expect("analysis")
    }

    #[test]
    fn full_graph_is_deterministic_and_sorted() {
        let facts = [
            Fact::library("Zed", "UIKit.framework").with_source_tree("SDKROOT"),
            Fact::library("App", "Alamofire.framework"),
            Fact::target("App", "Zed"),
        ];
        let analysis = analyze(&facts, &AnalysisConfig::default());
        let dot = full_graph(&analysis, None);
        assert_eq!(dot, full_graph(&analysis, None));

        assert!(dot.starts_with("digraph XcodeDeps {\n  rankdir=LR;"));
        assert!(dot.contains("label=\"Xcode Dependencies Graph\\nCycles: NO\";"));
        assert!(!dot.contains("Generated:"));

        let app = dot.find("\"App\" [").expect("App node");
        let zed = dot.find("\"Zed\" [").expect("Zed node");
        let alamofire = dot.find("\"Alamofire\" [").expect("Alamofire node");
        assert!(app < zed && zed < alamofire);

        assert!(dot.contains("\"App\" -> \"Zed\" [color=\"#9ca3af\"];"));
        assert!(dot.contains("\"App\" -> \"Alamofire\";"));
        assert!(dot.contains("fillcolor=\"#f1f2f6\""));
        assert!(dot.contains("subgraph cluster_legend"));
    }

    #[test]
    fn cycles_are_styled_and_flagged() {
        let facts = [Fact::target("A", "B"), Fact::target("B", "A")];
        let analysis = analyze(&facts, &AnalysisConfig::default());
        let dot = full_graph(&analysis, Some("2026-01-01 00:00:00"));
        assert!(dot.contains("Cycles: YES\\nGenerated: 2026-01-01 00:00:00"));
        assert!(dot.contains("\"A\" -> \"B\" [color=\"#ff3b30\", penwidth=2.2];"));
        assert!(dot.contains("fillcolor=\"#ffecec\", color=\"#ff3b30\", penwidth=2.0"));
    }

    #[test]
    fn suppressed_cycle_highlight_uses_defaults() {
        let facts = [Fact::target("A", "B"), Fact::target("B", "A")];
        let config = AnalysisConfig {
            render: RenderConfig {
                highlight_cycles: false,
                ..RenderConfig::default()
            },
            ..AnalysisConfig::default()
        };
        let dot = full_graph(&analyze(&facts, &config), None);
        assert!(dot.contains("Cycles: YES"));
        assert!(!dot.contains("#ffecec"));
        assert!(!dot.contains("edge in cycle"));
    }

    #[test]
    fn quotes_are_escaped_and_shared_names_disambiguated() {
        let facts = [
            Fact::target("My \"App\"", "Core"),
            Fact::library("My \"App\"", "Core.framework"),
        ];
        let dot = full_graph(&analyze(&facts, &AnalysisConfig::default()), None);
        assert!(dot.contains("\"My \\\"App\\\"\""));
        assert!(dot.contains("\"Core#target\""));
        assert!(dot.contains("\"Core#third_party_framework\""));
    }

    #[test]
    fn framework_view_focus_and_roles() {
        let facts = [
            Fact::library("App", "Alamofire.framework"),
            Fact::library("App", "Lottie.framework"),
            Fact::target("App", "Core"),
            Fact::library("Core", "Alamofire.framework"),
        ];
        let config = AnalysisConfig {
            split: crate::split::SplitOptions {
                max: 1,
                include_target_deps: true,
                include_peer_libs: true,
                ..crate::split::SplitOptions::default()
            },
            views: ViewSelection {
                framework_views: true,
                ..ViewSelection::default()
            },
            ..AnalysisConfig::default()
        };
        let analysis = analyze(&facts, &config);
        let view = analysis.framework_views.first().expect("one view");
        let dot = framework_graph(&analysis, view, None);

        assert!(dot.starts_with("digraph FrameworkView {"));
        assert!(dot.contains("Framework view: Alamofire\\nTargets: 2"));
        assert!(dot.contains("fillcolor=\"#eafff2\", color=\"#34c759\", penwidth=2.0"));
        assert!(dot.contains("\"App\" -> \"Core\" [color=\"#9ca3af\"];"));
        assert!(dot.contains("\"App\" -> \"Lottie\" [color=\"#cfcfcf\", style=dashed];"));
        assert!(dot.contains("Focus Framework"));
    }

    #[test]
    fn cycle_graph_contains_only_cycle_members() {
        let facts = [
            Fact::target("A", "B"),
            Fact::target("B", "A"),
            Fact::library("A", "Alamofire.framework"),
        ];
        let config = AnalysisConfig {
            filter: FilterConfig::default(),
            views: ViewSelection {
                cycle_graph: true,
                ..ViewSelection::default()
            },
            ..AnalysisConfig::default()
        };
        let dot = cycle_graph(&analyze(&facts, &config), None);
        assert!(dot.starts_with("digraph XcodeCycles {"));
        assert!(dot.contains("\"A\" -> \"B\""));
        assert!(!dot.contains("Alamofire"));
    }
}
