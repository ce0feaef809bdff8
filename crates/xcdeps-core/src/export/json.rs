//! Machine-readable report. Field names are stable for CI consumers.

use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::analysis::{Analysis, Summary};
use crate::attrs::Palette;
use crate::filter::FilterConfig;
use crate::graph::{EdgeKind, NodeKind};

/// Context the core does not know about, supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ReportMeta {
    pub generated_at: Option<String>,
    pub root: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub graph_hash: &'a str,
    pub has_cycles: bool,
    pub cycles_count: usize,
    pub summary: Summary,
    pub nodes: JsonNodes<'a>,
    pub edges: Vec<JsonEdge<'a>>,
    pub cycles: JsonCycles<'a>,
    pub filters: JsonFilters<'a>,
    pub colors: &'a Palette,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonNodes<'a> {
    pub targets: Vec<&'a str>,
    pub libraries: Vec<JsonLibrary<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonLibrary<'a> {
    pub name: &'a str,
    pub kind: NodeKind,
    pub is_system: bool,
    pub ext: &'static str,
    pub subtitle: Option<&'a str>,
    pub in_degree: usize,
    pub degree: usize,
    pub is_cycle_member: bool,
    pub is_highlighted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collapsed_from: Vec<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonEdge<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub kind: EdgeKind,
    pub is_cyclic: bool,
    pub is_highlighted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonEdgeRef<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCycles<'a> {
    pub components: Vec<Vec<&'a str>>,
    pub edges: Vec<JsonEdgeRef<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFilters<'a> {
    pub include_target: &'a [String],
    pub exclude_target: &'a [String],
    pub include_lib: &'a [String],
    pub exclude_lib: &'a [String],
    pub include_suffix: Vec<String>,
    pub exclude_suffix: Vec<String>,
    pub collapse_suffix: Vec<String>,
    pub highlight_target: &'a [String],
    pub highlight_lib: &'a [String],
    pub highlight_cycles: bool,
    pub system_highlight: bool,
    pub split_only: bool,
}

/// Build the report for `analysis`.
///
/// `filters` is the raw filter configuration the run was compiled from.
#[must_use]
pub fn report<'a>(analysis: &'a Analysis, filters: &'a FilterConfig, meta: ReportMeta) -> JsonReport<'a> {
    let graph = &analysis.graph;
    let render = &analysis.config.render;

    let mut targets: Vec<&str> = Vec::new();
    let mut libraries: Vec<JsonLibrary<'_>> = Vec::new();
    for (idx, node) in graph.nodes() {
        let attrs = analysis.attrs.node(idx);
        if node.kind().is_target() {
            targets.push(node.name());
            continue;
        }
        libraries.push(JsonLibrary {
            name: node.name(),
            kind: node.kind(),
            is_system: node.kind() == NodeKind::SystemFramework,
            ext: node.suffix.as_str(),
            subtitle: node.subtitle.as_deref(),
            in_degree: node.in_degree,
            degree: node.degree(),
            is_cycle_member: attrs.is_some_and(|a| a.is_cycle_member),
            is_highlighted: attrs.is_some_and(|a| a.is_highlighted),
            collapsed_from: node.collapsed_from.iter().map(String::as_str).collect(),
        });
    }
    targets.sort_unstable();
    libraries.sort_by(|a, b| (a.name, a.kind).cmp(&(b.name, b.kind)));

    let mut edges: Vec<JsonEdge<'_>> = Vec::with_capacity(graph.edge_count());
    let mut cyclic: Vec<JsonEdgeRef<'_>> = Vec::new();
    for edge in graph.edges() {
        let (Some(from), Some(to)) = (graph.node(edge.source()), graph.node(edge.target())) else {
            continue;
        };
        let attrs = analysis.attrs.edge(edge.id());
        let is_cyclic = attrs.is_some_and(|a| a.is_cyclic);
        edges.push(JsonEdge {
            from: from.name(),
            to: to.name(),
            kind: *edge.weight(),
            is_cyclic,
            is_highlighted: attrs.is_some_and(|a| a.is_highlighted),
        });
        if is_cyclic {
            cyclic.push(JsonEdgeRef {
                from: from.name(),
                to: to.name(),
            });
        }
    }
    edges.sort_by(|a, b| (a.from, a.to).cmp(&(b.from, b.to)));
    cyclic.sort_by(|a, b| (a.from, a.to).cmp(&(b.from, b.to)));

    let components = analysis
        .cycles
        .cycles
        .iter()
        .map(|cycle| cycle.iter().map(|id| id.name.as_str()).collect())
        .collect();

    let views = analysis.config.views;
    JsonReport {
        generated_at: meta.generated_at,
        root: meta.root,
        graph_hash: graph.content_hash(),
        has_cycles: analysis.has_cycles(),
        cycles_count: analysis.cycles_count(),
        summary: analysis.summary(),
        nodes: JsonNodes { targets, libraries },
        edges,
        cycles: JsonCycles {
            components,
            edges: cyclic,
        },
        filters: JsonFilters {
            include_target: &filters.include_target,
            exclude_target: &filters.exclude_target,
            include_lib: &filters.include_lib,
            exclude_lib: &filters.exclude_lib,
            include_suffix: FilterConfig::normalized_suffixes(&filters.include_suffix),
            exclude_suffix: FilterConfig::normalized_suffixes(&filters.exclude_suffix),
            collapse_suffix: FilterConfig::normalized_suffixes(&filters.collapse_suffix),
            highlight_target: &filters.highlight_target,
            highlight_lib: &filters.highlight_lib,
            highlight_cycles: render.highlight_cycles,
            system_highlight: render.system_highlight,
            split_only: views.framework_views && !views.full_graph,
        },
        colors: &render.palette,
    }
}

/// Pretty-printed JSON for `report`.
///
/// # Errors
///
/// Propagates `serde_json` serialization failures.
pub fn to_json_string(report: &JsonReport<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::RenderConfig;
    use crate::config::AnalysisConfig;
    use crate::fact::Fact;

    fn analyze(facts: &[Fact], config: &AnalysisConfig) -> Analysis {
        Analysis::run(facts, config).expect("analysis")
    }

    #[test]
    fn report_fields_for_cycle() {
        let config = AnalysisConfig::default();
        let facts = [
            Fact::library("AppTarget", "UIKit"),
            Fact::target("AppTarget", "CoreModule"),
            Fact::target("CoreModule", "AppTarget"),
        ];
        let analysis = analyze(&facts, &config);
        let json = to_json_string(&report(&analysis, &config.filter, ReportMeta::default()))
            .expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse back");

        assert_eq!(value["has_cycles"], true);
        assert_eq!(value["cycles_count"], 1);
        assert!(value.get("generated_at").is_none());
        assert_eq!(
            value["cycles"]["components"],
            serde_json::json!([["AppTarget", "CoreModule"]])
        );
        assert_eq!(value["cycles"]["edges"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["nodes"]["targets"], serde_json::json!(["AppTarget", "CoreModule"]));
        assert_eq!(value["nodes"]["libraries"][0]["name"], "UIKit");
        assert_eq!(value["edges"].as_array().map(Vec::len), Some(3));
        assert!(
            value["graph_hash"]
                .as_str()
                .is_some_and(|h| h.starts_with("blake3:"))
        );
        assert_eq!(value["colors"]["edge_cycle"], "#ff3b30");
    }

    #[test]
    fn suppressed_tiers_keep_classification_data() {
        let config = AnalysisConfig {
            render: RenderConfig {
                highlight_cycles: false,
                system_highlight: false,
                ..RenderConfig::default()
            },
            ..AnalysisConfig::default()
        };
        let facts = [
            Fact::target("A", "B"),
            Fact::target("B", "A"),
            Fact::library("A", "UIKit.framework").with_source_tree("SDKROOT"),
        ];
        let analysis = analyze(&facts, &config);
        let value = serde_json::to_value(report(&analysis, &config.filter, ReportMeta::default()))
            .expect("serialize");

        assert_eq!(value["has_cycles"], true);
        assert_eq!(value["nodes"]["libraries"][0]["is_system"], true);
        assert_eq!(value["nodes"]["libraries"][0]["kind"], "system_framework");
        assert_eq!(value["filters"]["highlight_cycles"], false);
        assert!(
            value["edges"]
                .as_array()
                .is_some_and(|edges| edges.iter().filter(|e| e["is_cyclic"] == true).count() == 2)
        );
    }

    #[test]
    fn meta_fields_are_emitted_when_present() {
        let config = AnalysisConfig::default();
        let analysis = analyze(&[Fact::target("App", "Core")], &config);
        let meta = ReportMeta {
            generated_at: Some("2026-01-01T00:00:00".into()),
            root: Some("/repo".into()),
        };
        let value =
            serde_json::to_value(report(&analysis, &config.filter, meta)).expect("serialize");
        assert_eq!(value["root"], "/repo");
        assert_eq!(value["generated_at"], "2026-01-01T00:00:00");
        assert_eq!(value["has_cycles"], false);
    }
}
