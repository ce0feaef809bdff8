use std::fmt;

use crate::graph::NodeId;

/// Machine-readable error codes for CI scripts and JSON consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidPattern,
    InvalidColor,
    InvalidRankdir,
    InvalidSuffix,
    NoViewSelected,
    ConfigParseError,
    DanglingEdge,
    IndexMismatch,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidPattern => "E1001",
            Self::InvalidColor => "E1002",
            Self::InvalidRankdir => "E1003",
            Self::InvalidSuffix => "E1004",
            Self::NoViewSelected => "E1005",
            Self::ConfigParseError => "E1006",
            Self::DanglingEdge => "E9001",
            Self::IndexMismatch => "E9002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidPattern => "Invalid filter or highlight pattern",
            Self::InvalidColor => "Invalid color override",
            Self::InvalidRankdir => "Invalid graph direction",
            Self::InvalidSuffix => "Invalid suffix token",
            Self::NoViewSelected => "No output view selected",
            Self::ConfigParseError => "Config file parse error",
            Self::DanglingEdge => "Edge references a missing node",
            Self::IndexMismatch => "Graph index out of sync",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidPattern => Some("Patterns use Rust regex syntax; escape literal dots as `\\.`."),
            Self::InvalidColor => Some(
                "Colors must be six-digit hex values such as `#ff3b30`, keyed by palette slot (`target_fill`, `edge_cycle`, ...).",
            ),
            Self::InvalidRankdir => Some("Use one of LR, RL, TB, BT."),
            Self::InvalidSuffix => Some("Use .framework, .a, .tbd, .dylib or spm."),
            Self::NoViewSelected => {
                Some("Enable the full graph, the cycle view, or per-framework views.")
            }
            Self::ConfigParseError => Some("Fix syntax in .xcdeps.toml and retry."),
            Self::DanglingEdge | Self::IndexMismatch => {
                Some("This is a bug in xcdeps. Report it with the facts file that triggers it.")
            }
        }
    }

    /// `true` for configuration problems the user can fix.
    #[must_use]
    pub const fn is_config(self) -> bool {
        !matches!(self, Self::DanglingEdge | Self::IndexMismatch)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Configuration problems. Always raised before any graph work begins.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid regex `{pattern}` for --{option}: {source}")]
    InvalidPattern {
        option: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid color `{value}` for {key}; expected #RRGGBB")]
    InvalidColor { key: String, value: String },

    #[error("unknown color key `{0}`")]
    UnknownColorKey(String),

    #[error("invalid rankdir `{0}`; expected LR, RL, TB or BT")]
    InvalidRankdir(String),

    #[error("empty suffix token for --{0}")]
    EmptySuffix(&'static str),

    #[error("no output view selected (full graph, cycle view and framework views are all disabled)")]
    NoViewSelected,

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            Self::InvalidColor { .. } | Self::UnknownColorKey(_) => ErrorCode::InvalidColor,
            Self::InvalidRankdir(_) => ErrorCode::InvalidRankdir,
            Self::EmptySuffix(_) => ErrorCode::InvalidSuffix,
            Self::NoViewSelected => ErrorCode::NoViewSelected,
            Self::Parse(_) => ErrorCode::ConfigParseError,
        }
    }
}

/// Internal-consistency failures of a built graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("edge {from} -> {to} references a node that is not in the graph")]
    DanglingEdge { from: NodeId, to: NodeId },

    #[error("node map entry {id} points at index {index}, which holds a different node")]
    IndexMismatch { id: NodeId, index: usize },
}

impl GraphError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DanglingEdge { .. } => ErrorCode::DanglingEdge,
            Self::IndexMismatch { .. } => ErrorCode::IndexMismatch,
        }
    }
}

/// Anything that aborts an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal consistency failure: {0}")]
    Graph(#[from] GraphError),
}

impl AnalysisError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(e) => e.code(),
            Self::Graph(e) => e.code(),
        }
    }
}
