//! Node and edge identities shared by every stage after filtering.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::fact::Suffix;

/// Classification of a graph node.
///
/// The derived ordering (targets first) is the order exporters list nodes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Target,
    SystemFramework,
    ThirdPartyFramework,
    SpmProduct,
}

impl NodeKind {
    #[must_use]
    pub const fn is_target(self) -> bool {
        matches!(self, Self::Target)
    }

    /// Anything a target links: frameworks, libraries and package products.
    #[must_use]
    pub const fn is_library(self) -> bool {
        !self.is_target()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::SystemFramework => "system_framework",
            Self::ThirdPartyFramework => "third_party_framework",
            Self::SpmProduct => "spm_product",
        }
    }
}

/// Identity of a node: canonical name plus kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId {
    pub name: String,
    pub kind: NodeKind,
}

impl NodeId {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    #[must_use]
    pub fn target(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Target)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.kind.as_str())
    }
}

/// How an edge was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    TargetToLibrary,
    TargetToTarget,
    SpmDependency,
}

impl EdgeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetToLibrary => "target_to_library",
            Self::TargetToTarget => "target_to_target",
            Self::SpmDependency => "spm_dependency",
        }
    }
}

/// Node weight stored in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    /// First subtitle seen for this node (SPM repository URL, usually).
    pub subtitle: Option<String>,
    pub suffix: Suffix,
    /// Raw names merged into this node by suffix collapsing.
    pub collapsed_from: BTreeSet<String>,
    /// Filled in by the builder's final degree pass.
    pub in_degree: usize,
    pub out_degree: usize,
}

impl Node {
    #[must_use]
    pub fn new(id: NodeId, suffix: Suffix) -> Self {
        Self {
            id,
            subtitle: None,
            suffix,
            collapsed_from: BTreeSet::new(),
            in_degree: 0,
            out_degree: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.id.kind
    }

    #[must_use]
    pub const fn degree(&self) -> usize {
        self.in_degree + self.out_degree
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        !self.collapsed_from.is_empty()
    }
}
