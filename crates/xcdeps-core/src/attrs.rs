//! Visual attributes for nodes and edges, resolved once per graph.
//!
//! Color precedence is cycle > highlight > kind default. Turning off cycle
//! highlighting removes the cycle tier from colors only; `is_cycle_member`
//! and `is_cyclic` still reflect the detector's result. Exporters read these
//! records and never re-derive membership themselves.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::HighlightRules;
use crate::graph::{CycleSet, DependencyGraph, EdgeKind, NodeKind};

pub const DEFAULT_FONT: &str = "SF Pro Text";
pub const DEFAULT_TITLE: &str = "Xcode Dependencies Graph";

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// The fourteen color slots used by every exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub target_fill: String,
    pub target_stroke: String,
    pub lib3p_fill: String,
    pub lib3p_stroke: String,
    pub libsys_fill: String,
    pub libsys_stroke: String,
    pub cycle_fill: String,
    pub cycle_stroke: String,
    pub focus_fill: String,
    pub focus_stroke: String,
    pub edge: String,
    pub edge_cycle: String,
    pub edge_tt: String,
    pub edge_peer: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            target_fill: "#e7f1ff".into(),
            target_stroke: "#3973ff".into(),
            lib3p_fill: "#fff7e6".into(),
            lib3p_stroke: "#ffa500".into(),
            libsys_fill: "#f1f2f6".into(),
            libsys_stroke: "#8e8e93".into(),
            cycle_fill: "#ffecec".into(),
            cycle_stroke: "#ff3b30".into(),
            focus_fill: "#eafff2".into(),
            focus_stroke: "#34c759".into(),
            edge: "#555555".into(),
            edge_cycle: "#ff3b30".into(),
            edge_tt: "#9ca3af".into(),
            edge_peer: "#cfcfcf".into(),
        }
    }
}

impl Palette {
    /// Slot names in declaration order.
    pub const KEYS: [&'static str; 14] = [
        "target_fill",
        "target_stroke",
        "lib3p_fill",
        "lib3p_stroke",
        "libsys_fill",
        "libsys_stroke",
        "cycle_fill",
        "cycle_stroke",
        "focus_fill",
        "focus_stroke",
        "edge",
        "edge_cycle",
        "edge_tt",
        "edge_peer",
    ];

    fn slot_mut(&mut self, key: &str) -> Option<&mut String> {
        let slot = match key {
            "target_fill" => &mut self.target_fill,
            "target_stroke" => &mut self.target_stroke,
            "lib3p_fill" => &mut self.lib3p_fill,
            "lib3p_stroke" => &mut self.lib3p_stroke,
            "libsys_fill" => &mut self.libsys_fill,
            "libsys_stroke" => &mut self.libsys_stroke,
            "cycle_fill" => &mut self.cycle_fill,
            "cycle_stroke" => &mut self.cycle_stroke,
            "focus_fill" => &mut self.focus_fill,
            "focus_stroke" => &mut self.focus_stroke,
            "edge" => &mut self.edge,
            "edge_cycle" => &mut self.edge_cycle,
            "edge_tt" => &mut self.edge_tt,
            "edge_peer" => &mut self.edge_peer,
            _ => return None,
        };
        Some(slot)
    }

    /// Override one slot. Keys accept `-` or `_` separators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownColorKey`] or
    /// [`ConfigError::InvalidColor`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let normalized = key.trim().replace('-', "_");
        let value = value.trim();
        if !is_hex_color(value) {
            return Err(ConfigError::InvalidColor {
                key: normalized,
                value: value.to_string(),
            });
        }
        let slot = self
            .slot_mut(&normalized)
            .ok_or_else(|| ConfigError::UnknownColorKey(key.to_string()))?;
        *slot = value.to_string();
        Ok(())
    }

    /// Defaults with `overrides` applied.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown key or malformed color.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut palette = Self::default();
        for (key, value) in overrides {
            palette.set(key, value)?;
        }
        Ok(palette)
    }
}

/// `#RRGGBB`, case-insensitive.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Render options
// ---------------------------------------------------------------------------

/// Layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Rankdir {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Rankdir {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeftToRight => "LR",
            Self::RightToLeft => "RL",
            Self::TopToBottom => "TB",
            Self::BottomToTop => "BT",
        }
    }
}

impl FromStr for Rankdir {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LR" => Ok(Self::LeftToRight),
            "RL" => Ok(Self::RightToLeft),
            "TB" => Ok(Self::TopToBottom),
            "BT" => Ok(Self::BottomToTop),
            _ => Err(ConfigError::InvalidRankdir(s.to_string())),
        }
    }
}

impl fmt::Display for Rankdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw render options from config files and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub rankdir: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub font: Option<String>,
    /// Palette overrides keyed by slot name.
    pub colors: BTreeMap<String, String>,
    pub highlight_cycles: bool,
    pub system_highlight: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rankdir: Rankdir::LeftToRight.as_str().to_string(),
            title: None,
            subtitle: None,
            font: None,
            colors: BTreeMap::new(),
            highlight_cycles: true,
            system_highlight: true,
        }
    }
}

impl RenderConfig {
    /// Validate direction and colors.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an unknown rankdir or a bad color.
    pub fn compile(&self) -> Result<RenderOptions, ConfigError> {
        Ok(RenderOptions {
            rankdir: self.rankdir.parse()?,
            title: self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            subtitle: self.subtitle.clone(),
            font: self.font.clone().unwrap_or_else(|| DEFAULT_FONT.to_string()),
            palette: Palette::with_overrides(&self.colors)?,
            highlight_cycles: self.highlight_cycles,
            system_highlight: self.system_highlight,
        })
    }
}

/// Validated render options, passed through to exporters unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub rankdir: Rankdir,
    pub title: String,
    pub subtitle: Option<String>,
    pub font: String,
    pub palette: Palette,
    pub highlight_cycles: bool,
    pub system_highlight: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            rankdir: Rankdir::LeftToRight,
            title: DEFAULT_TITLE.to_string(),
            subtitle: None,
            font: DEFAULT_FONT.to_string(),
            palette: Palette::default(),
            highlight_cycles: true,
            system_highlight: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute classes
// ---------------------------------------------------------------------------

/// Fill/stroke pair a node is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorClass {
    Target,
    ThirdParty,
    System,
    Highlight,
    Focus,
    Cycle,
}

impl ColorClass {
    #[must_use]
    pub fn fill(self, palette: &Palette) -> &str {
        match self {
            Self::Target => &palette.target_fill,
            Self::ThirdParty => &palette.lib3p_fill,
            Self::System => &palette.libsys_fill,
            Self::Highlight | Self::Focus => &palette.focus_fill,
            Self::Cycle => &palette.cycle_fill,
        }
    }

    #[must_use]
    pub fn stroke(self, palette: &Palette) -> &str {
        match self {
            Self::Target => &palette.target_stroke,
            Self::ThirdParty => &palette.lib3p_stroke,
            Self::System => &palette.libsys_stroke,
            Self::Highlight | Self::Focus => &palette.focus_stroke,
            Self::Cycle => &palette.cycle_stroke,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeColorClass {
    Normal,
    TargetToTarget,
    Peer,
    Highlight,
    Cycle,
}

impl EdgeColorClass {
    #[must_use]
    pub fn color(self, palette: &Palette) -> &str {
        match self {
            Self::Normal => &palette.edge,
            Self::TargetToTarget => &palette.edge_tt,
            Self::Peer => &palette.edge_peer,
            Self::Highlight => &palette.focus_stroke,
            Self::Cycle => &palette.edge_cycle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeClass {
    Ellipse,
    Box,
    Component,
}

impl ShapeClass {
    #[must_use]
    pub const fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Target => Self::Ellipse,
            NodeKind::SystemFramework | NodeKind::ThirdPartyFramework => Self::Box,
            NodeKind::SpmProduct => Self::Component,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ellipse => "ellipse",
            Self::Box => "box",
            Self::Component => "component",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeAttrs {
    pub is_cycle_member: bool,
    pub is_highlighted: bool,
    pub color: ColorClass,
    pub shape: ShapeClass,
    /// Drawn with a heavier stroke.
    pub emphasized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeAttrs {
    pub is_cyclic: bool,
    pub is_highlighted: bool,
    pub color: EdgeColorClass,
    pub emphasized: bool,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Attribute records indexed by node and edge index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    nodes: Vec<NodeAttrs>,
    edges: Vec<EdgeAttrs>,
}

impl AttributeSet {
    /// Resolve attributes for every node and edge of `graph`.
    #[must_use]
    pub fn resolve(
        graph: &DependencyGraph,
        cycles: &CycleSet,
        highlight: &HighlightRules,
        options: &RenderOptions,
    ) -> Self {
        let nodes: Vec<NodeAttrs> = graph
            .nodes()
            .map(|(idx, node)| {
                let is_cycle_member = cycles.contains_node(idx);
                let is_highlighted = highlight.matches_node(node);
                let color = if is_cycle_member && options.highlight_cycles {
                    ColorClass::Cycle
                } else if is_highlighted {
                    ColorClass::Highlight
                } else {
                    kind_color(node.kind(), options.system_highlight)
                };
                NodeAttrs {
                    is_cycle_member,
                    is_highlighted,
                    color,
                    shape: ShapeClass::for_kind(node.kind()),
                    emphasized: matches!(color, ColorClass::Cycle | ColorClass::Highlight),
                }
            })
            .collect();

        let mut edges: Vec<EdgeAttrs> = Vec::with_capacity(graph.edge_count());
        for edge in graph.edges() {
            let is_cyclic = cycles.contains_edge(edge.id());
            let is_highlighted = nodes[edge.source().index()].is_highlighted
                || nodes[edge.target().index()].is_highlighted;
            let color = if is_cyclic && options.highlight_cycles {
                EdgeColorClass::Cycle
            } else if is_highlighted {
                EdgeColorClass::Highlight
            } else if *edge.weight() == EdgeKind::TargetToTarget {
                EdgeColorClass::TargetToTarget
            } else {
                EdgeColorClass::Normal
            };
            edges.push(EdgeAttrs {
                is_cyclic,
                is_highlighted,
                color,
                emphasized: matches!(color, EdgeColorClass::Cycle | EdgeColorClass::Highlight),
            });
        }

        Self { nodes, edges }
    }

    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&NodeAttrs> {
        self.nodes.get(idx.index())
    }

    #[must_use]
    pub fn edge(&self, idx: EdgeIndex) -> Option<&EdgeAttrs> {
        self.edges.get(idx.index())
    }

    #[must_use]
    pub fn any_highlighted(&self) -> bool {
        self.nodes.iter().any(|n| n.is_highlighted)
    }
}

const fn kind_color(kind: NodeKind, system_highlight: bool) -> ColorClass {
    match kind {
        NodeKind::Target => ColorClass::Target,
        NodeKind::SystemFramework if system_highlight => ColorClass::System,
        NodeKind::SystemFramework | NodeKind::ThirdPartyFramework | NodeKind::SpmProduct => {
            ColorClass::ThirdParty
        }
    }
}

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendEntry {
    Node {
        label: &'static str,
        color: ColorClass,
        shape: ShapeClass,
    },
    Edge {
        label: &'static str,
        color: EdgeColorClass,
    },
}

/// Legend for the full graph and the cycle view, nodes first.
#[must_use]
pub fn legend(options: &RenderOptions, highlighting: bool) -> Vec<LegendEntry> {
    let mut entries = vec![
        LegendEntry::Node {
            label: "Target",
            color: ColorClass::Target,
            shape: ShapeClass::Ellipse,
        },
        LegendEntry::Node {
            label: "3rd-party Library/Framework",
            color: ColorClass::ThirdParty,
            shape: ShapeClass::Box,
        },
    ];
    if options.system_highlight {
        entries.push(LegendEntry::Node {
            label: "System Framework/Library",
            color: ColorClass::System,
            shape: ShapeClass::Box,
        });
    }
    entries.push(LegendEntry::Node {
        label: "SPM product",
        color: ColorClass::ThirdParty,
        shape: ShapeClass::Component,
    });
    if highlighting {
        entries.push(LegendEntry::Node {
            label: "Highlighted",
            color: ColorClass::Highlight,
            shape: ShapeClass::Box,
        });
    }
    if options.highlight_cycles {
        entries.push(LegendEntry::Node {
            label: "Node in cycle",
            color: ColorClass::Cycle,
            shape: ShapeClass::Ellipse,
        });
    }

    entries.push(LegendEntry::Edge {
        label: "normal edge",
        color: EdgeColorClass::Normal,
    });
    entries.push(LegendEntry::Edge {
        label: "target → target",
        color: EdgeColorClass::TargetToTarget,
    });
    if options.highlight_cycles {
        entries.push(LegendEntry::Edge {
            label: "edge in cycle",
            color: EdgeColorClass::Cycle,
        });
    }
    entries
}

/// Minimal legend used by per-framework views.
#[must_use]
pub fn framework_legend(options: &RenderOptions) -> Vec<LegendEntry> {
    let mut entries = vec![
        LegendEntry::Node {
            label: "Target",
            color: ColorClass::Target,
            shape: ShapeClass::Ellipse,
        },
        LegendEntry::Node {
            label: "Focus Framework",
            color: ColorClass::Focus,
            shape: ShapeClass::Box,
        },
    ];
    if options.highlight_cycles {
        entries.push(LegendEntry::Node {
            label: "Node in cycle",
            color: ColorClass::Cycle,
            shape: ShapeClass::Box,
        });
    }
    entries.push(LegendEntry::Edge {
        label: "normal edge",
        color: EdgeColorClass::Normal,
    });
    if options.highlight_cycles {
        entries.push(LegendEntry::Edge {
            label: "edge in cycle",
            color: EdgeColorClass::Cycle,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::Fact;
    use crate::filter::FilterConfig;
    use crate::graph::build::build;
    use crate::graph::{NodeId, detect_cycles};

    fn resolve(facts: &[Fact], filter: &FilterConfig, options: &RenderOptions) -> (DependencyGraph, AttributeSet) {
        let compiled = filter.compile().expect("compile");
        let graph = build(&compiled.apply(facts), false).graph;
        let cycles = detect_cycles(&graph);
        let attrs = AttributeSet::resolve(&graph, &cycles, &compiled.highlight, options);
        (graph, attrs)
    }

    fn node_attrs<'a>(graph: &DependencyGraph, attrs: &'a AttributeSet, id: &NodeId) -> &'a NodeAttrs {
        let idx = graph.node_index(id).expect("node present");
        attrs.node(idx).expect("attrs present")
    }

    #[test]
    fn cycle_beats_highlight() {
        let facts = [Fact::target("A", "B"), Fact::target("B", "A")];
        let filter = FilterConfig {
            highlight_target: vec!["^A$".into()],
            ..FilterConfig::default()
        };
        let (graph, attrs) = resolve(&facts, &filter, &RenderOptions::default());
        let a = node_attrs(&graph, &attrs, &NodeId::target("A"));
        assert!(a.is_cycle_member);
        assert!(a.is_highlighted);
        assert_eq!(a.color, ColorClass::Cycle);
        assert!(a.emphasized);
    }

    #[test]
    fn suppressed_cycle_tier_keeps_membership() {
        let facts = [Fact::target("A", "B"), Fact::target("B", "A")];
        let options = RenderOptions {
            highlight_cycles: false,
            ..RenderOptions::default()
        };
        let (graph, attrs) = resolve(&facts, &FilterConfig::default(), &options);
        let a = node_attrs(&graph, &attrs, &NodeId::target("A"));
        assert!(a.is_cycle_member);
        assert_eq!(a.color, ColorClass::Target);

        for edge in graph.edges() {
            let e = attrs.edge(edge.id()).expect("edge attrs");
            assert!(e.is_cyclic);
            assert_eq!(e.color, EdgeColorClass::TargetToTarget);
        }
    }

    #[test]
    fn system_highlight_toggle() {
        let facts = [Fact::library("App", "UIKit.framework").with_source_tree("SDKROOT")];
        let uikit = NodeId::new("UIKit", NodeKind::SystemFramework);

        let (graph, attrs) = resolve(&facts, &FilterConfig::default(), &RenderOptions::default());
        assert_eq!(node_attrs(&graph, &attrs, &uikit).color, ColorClass::System);

        let options = RenderOptions {
            system_highlight: false,
            ..RenderOptions::default()
        };
        let (graph, attrs) = resolve(&facts, &FilterConfig::default(), &options);
        assert_eq!(node_attrs(&graph, &attrs, &uikit).color, ColorClass::ThirdParty);
        assert_eq!(graph.get(&uikit).map(crate::graph::Node::kind), Some(NodeKind::SystemFramework));
    }

    #[test]
    fn shapes_follow_kind() {
        let facts = [
            Fact::library("App", "Alamofire.framework"),
            Fact::spm("App", "Lottie"),
        ];
        let (graph, attrs) = resolve(&facts, &FilterConfig::default(), &RenderOptions::default());
        assert_eq!(node_attrs(&graph, &attrs, &NodeId::target("App")).shape, ShapeClass::Ellipse);
        assert_eq!(
            node_attrs(&graph, &attrs, &NodeId::new("Alamofire", NodeKind::ThirdPartyFramework)).shape,
            ShapeClass::Box
        );
        assert_eq!(
            node_attrs(&graph, &attrs, &NodeId::new("Lottie", NodeKind::SpmProduct)).shape,
            ShapeClass::Component
        );
    }

    #[test]
    fn edge_highlighted_when_either_endpoint_is() {
        let facts = [Fact::library("App", "Alamofire.framework")];
        let filter = FilterConfig {
            highlight_lib: vec!["Alamofire".into()],
            ..FilterConfig::default()
        };
        let (graph, attrs) = resolve(&facts, &filter, &RenderOptions::default());
        let edge = graph.edges().next().expect("one edge");
        let e = attrs
            .edge(edge.id())
            .expect("edge attrs");
        assert!(e.is_highlighted);
        assert_eq!(e.color, EdgeColorClass::Highlight);
    }

    #[test]
    fn palette_overrides_are_validated() {
        let mut overrides = BTreeMap::new();
        overrides.insert("edge-cycle".to_string(), "#00FF00".to_string());
        let palette = Palette::with_overrides(&overrides).expect("valid");
        assert_eq!(palette.edge_cycle, "#00FF00");

        overrides.insert("edge".to_string(), "red".to_string());
        assert!(matches!(
            Palette::with_overrides(&overrides),
            Err(ConfigError::InvalidColor { .. })
        ));

        let mut unknown = BTreeMap::new();
        unknown.insert("background".to_string(), "#000000".to_string());
        assert!(matches!(
            Palette::with_overrides(&unknown),
            Err(ConfigError::UnknownColorKey(_))
        ));
    }

    #[test]
    fn every_palette_key_is_settable() {
        let mut palette = Palette::default();
        for key in Palette::KEYS {
            palette.set(key, "#123456").expect("known key");
        }
        assert_eq!(palette.target_fill, "#123456");
        assert_eq!(palette.edge_peer, "#123456");
    }

    #[test]
    fn rankdir_parsing() {
        assert_eq!("tb".parse::<Rankdir>().expect("valid"), Rankdir::TopToBottom);
        assert!(matches!(
            "diagonal".parse::<Rankdir>(),
            Err(ConfigError::InvalidRankdir(_))
        ));
    }

    #[test]
    fn legend_omits_suppressed_tiers() {
        let full = legend(&RenderOptions::default(), true);
        assert_eq!(full.len(), 9);

        let options = RenderOptions {
            highlight_cycles: false,
            system_highlight: false,
            ..RenderOptions::default()
        };
        let reduced = legend(&options, false);
        let labels: Vec<&str> = reduced
            .iter()
            .map(|e| match e {
                LegendEntry::Node { label, .. } | LegendEntry::Edge { label, .. } => *label,
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                "Target",
                "3rd-party Library/Framework",
                "SPM product",
                "normal edge",
                "target → target"
            ]
        );
    }
}
