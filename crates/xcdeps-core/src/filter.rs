//! Include/exclude/collapse rules applied to facts before graph construction.
//!
//! Patterns are compiled once by [`FilterConfig::compile`]; an invalid regex
//! is a [`ConfigError`] raised before any fact is looked at. The compiled
//! [`CompiledFilter`] is a pure decision function:
//!
//! 1. an exclude pattern of the candidate's scope matches → drop
//! 2. the include list is non-empty and nothing matches → drop
//! 3. exclude-suffix lists the candidate's suffix → drop
//! 4. include-suffix is non-empty and does not list it → drop
//! 5. collapse-suffix lists it → keep under the identity `*<suffix>`
//!
//! Suffix rules only apply to library candidates. A collapsed group is one
//! node: it is a system framework when any member is, third-party otherwise.
//!
//! Facts with an empty source or destination never reach the rules; they are
//! reported as [`FactWarning::EmptyIdentity`].

use std::collections::{BTreeSet, HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fact::{DependencyKind, Fact, Suffix};
use crate::graph::{EdgeKind, FactWarning, Node, NodeId, NodeKind};

/// Raw filter options as written in config files or passed on the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include_target: Vec<String>,
    pub exclude_target: Vec<String>,
    pub include_lib: Vec<String>,
    pub exclude_lib: Vec<String>,
    pub include_suffix: Vec<String>,
    pub exclude_suffix: Vec<String>,
    pub collapse_suffix: Vec<String>,
    pub highlight_target: Vec<String>,
    /// Matched against the node name and, for collapsed nodes, every raw
    /// name merged into it.
    pub highlight_lib: Vec<String>,
    /// Silence duplicate-edge warnings. Duplicates are merged either way.
    pub ignore_duplicates: bool,
    /// Keep a target as a node even when every one of its facts was dropped.
    pub keep_isolated_targets: bool,
}

impl FilterConfig {
    /// Compile every pattern list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] naming the option and pattern
    /// that failed, or [`ConfigError::EmptySuffix`] for a blank suffix token.
    pub fn compile(&self) -> Result<CompiledFilter, ConfigError> {
        Ok(CompiledFilter {
            include_target: PatternSet::compile("include-target", &self.include_target)?,
            exclude_target: PatternSet::compile("exclude-target", &self.exclude_target)?,
            include_lib: PatternSet::compile("include-lib", &self.include_lib)?,
            exclude_lib: PatternSet::compile("exclude-lib", &self.exclude_lib)?,
            include_suffix: SuffixSet::compile("include-suffix", &self.include_suffix)?,
            exclude_suffix: SuffixSet::compile("exclude-suffix", &self.exclude_suffix)?,
            collapse_suffix: SuffixSet::compile("collapse-suffix", &self.collapse_suffix)?,
            highlight: HighlightRules {
                targets: PatternSet::compile("highlight-target", &self.highlight_target)?,
                libs: PatternSet::compile("highlight-lib", &self.highlight_lib)?,
            },
            ignore_duplicates: self.ignore_duplicates,
            keep_isolated_targets: self.keep_isolated_targets,
        })
    }

    /// Suffix tokens in normalized form, for reporting.
    #[must_use]
    pub fn normalized_suffixes(tokens: &[String]) -> Vec<String> {
        let set: BTreeSet<String> = tokens
            .iter()
            .filter_map(|t| Suffix::normalize_token(t))
            .collect();
        set.into_iter().collect()
    }
}

/// A compiled list of regexes. Matching is unanchored.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    fn compile(option: &'static str, raw: &[String]) -> Result<Self, ConfigError> {
        let patterns = raw
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    option,
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Normalized suffix tokens (`.a`, `.framework`, `spm`, ...).
#[derive(Debug, Clone, Default)]
struct SuffixSet {
    tokens: HashSet<String>,
}

impl SuffixSet {
    fn compile(option: &'static str, raw: &[String]) -> Result<Self, ConfigError> {
        let tokens = raw
            .iter()
            .map(|t| Suffix::normalize_token(t).ok_or(ConfigError::EmptySuffix(option)))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { tokens })
    }

    fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn contains(&self, suffix: Suffix) -> bool {
        self.tokens.contains(suffix.as_str())
    }
}

/// Which pattern lists apply to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Target,
    Library,
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Excluded,
    NotIncluded,
    SuffixExcluded,
    SuffixNotIncluded,
}

/// Outcome of filtering one candidate identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep the candidate under `identity` (rewritten when collapsed).
    Keep { identity: String },
    Drop(DropReason),
}

impl Decision {
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep { .. })
    }
}

/// Highlight patterns, consumed by the attribute resolver.
#[derive(Debug, Clone, Default)]
pub struct HighlightRules {
    pub targets: PatternSet,
    pub libs: PatternSet,
}

impl HighlightRules {
    /// Target patterns apply to targets, library patterns to everything else.
    #[must_use]
    pub fn matches(&self, id: &NodeId) -> bool {
        if id.kind.is_target() {
            self.targets.matches(&id.name)
        } else {
            self.libs.matches(&id.name)
        }
    }

    /// Like [`Self::matches`], but a collapsed node also matches through
    /// the raw names it absorbed.
    #[must_use]
    pub fn matches_node(&self, node: &Node) -> bool {
        if self.matches(&node.id) {
            return true;
        }
        let patterns = if node.kind().is_target() {
            &self.targets
        } else {
            &self.libs
        };
        node.collapsed_from.iter().any(|raw| patterns.matches(raw))
    }
}

/// A fact that survived filtering, with canonical identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFact {
    /// Position of the fact in the input list, for warnings.
    pub position: usize,
    pub source: NodeId,
    pub destination: NodeId,
    pub kind: EdgeKind,
    /// Canonical destination name before collapsing.
    pub raw_destination: String,
    pub suffix: Suffix,
    pub subtitle: Option<String>,
    pub self_loop_valid: bool,
}

impl ResolvedFact {
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.raw_destination != self.destination.name
    }
}

/// What filtering made of one fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Keep(ResolvedFact),
    /// Source target kept, destination dropped.
    SourceOnly(NodeId),
    Drop,
    /// Empty source or destination.
    Malformed,
}

/// Surviving facts plus the isolated targets to keep as nodes.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<ResolvedFact>,
    pub isolated_targets: Vec<NodeId>,
    pub dropped: usize,
    /// Malformed facts, in input order.
    pub warnings: Vec<FactWarning>,
}

/// Compiled form of [`FilterConfig`].
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    include_target: PatternSet,
    exclude_target: PatternSet,
    include_lib: PatternSet,
    exclude_lib: PatternSet,
    include_suffix: SuffixSet,
    exclude_suffix: SuffixSet,
    collapse_suffix: SuffixSet,
    pub highlight: HighlightRules,
    pub ignore_duplicates: bool,
    pub keep_isolated_targets: bool,
}

impl CompiledFilter {
    /// Decide whether `candidate` survives and under which identity.
    #[must_use]
    pub fn decide(&self, candidate: &str, scope: Scope, suffix: Suffix) -> Decision {
        let (include, exclude) = match scope {
            Scope::Target => (&self.include_target, &self.exclude_target),
            Scope::Library => (&self.include_lib, &self.exclude_lib),
        };

        if exclude.matches(candidate) {
            return Decision::Drop(DropReason::Excluded);
        }
        if !include.is_empty() && !include.matches(candidate) {
            return Decision::Drop(DropReason::NotIncluded);
        }

        if scope == Scope::Target {
            return Decision::Keep {
                identity: candidate.to_string(),
            };
        }

        if self.exclude_suffix.contains(suffix) {
            return Decision::Drop(DropReason::SuffixExcluded);
        }
        if !self.include_suffix.is_empty() && !self.include_suffix.contains(suffix) {
            return Decision::Drop(DropReason::SuffixNotIncluded);
        }

        let identity = if self.collapse_suffix.contains(suffix) {
            collapsed_identity(suffix)
        } else {
            candidate.to_string()
        };
        Decision::Keep { identity }
    }

    /// Filter one fact.
    ///
    /// A collapsed library keeps its own system/third-party kind here;
    /// [`Self::apply`] settles one kind per collapsed group.
    #[must_use]
    pub fn resolve(&self, position: usize, fact: &Fact) -> Resolution {
        let source_name = fact.source_name();
        if source_name.is_empty() || fact.canonical_destination().is_empty() {
            return Resolution::Malformed;
        }
        let Decision::Keep { identity: source } =
            self.decide(source_name, Scope::Target, Suffix::None)
        else {
            return Resolution::Drop;
        };
        let source = NodeId::target(source);

        let raw_destination = fact.canonical_destination();
        let suffix = fact.suffix();
        let scope = match fact.kind {
            DependencyKind::Target => Scope::Target,
            DependencyKind::Library | DependencyKind::SpmProduct => Scope::Library,
        };

        match self.decide(&raw_destination, scope, suffix) {
            Decision::Keep { identity } => Resolution::Keep(ResolvedFact {
                position,
                source,
                destination: NodeId::new(identity, fact.destination_kind()),
                kind: fact.kind.edge_kind(),
                raw_destination,
                suffix,
                subtitle: fact.subtitle.clone(),
                self_loop_valid: fact.self_loop_valid,
            }),
            Decision::Drop(_) => Resolution::SourceOnly(source),
        }
    }

    /// Filter a whole fact list, preserving input order.
    #[must_use]
    pub fn apply(&self, facts: &[Fact]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        let mut seen_isolated: HashSet<NodeId> = HashSet::new();

        for (position, fact) in facts.iter().enumerate() {
            match self.resolve(position, fact) {
                Resolution::Keep(resolved) => outcome.kept.push(resolved),
                Resolution::SourceOnly(source) => {
                    outcome.dropped += 1;
                    if self.keep_isolated_targets
                        && !source.name.is_empty()
                        && seen_isolated.insert(source.clone())
                    {
                        outcome.isolated_targets.push(source);
                    }
                }
                Resolution::Drop => outcome.dropped += 1,
                Resolution::Malformed => {
                    outcome.warnings.push(FactWarning::EmptyIdentity { position });
                }
            }
        }

        unify_collapsed_kinds(&mut outcome.kept);
        outcome
    }
}

/// Give every member of a collapsed library group the same node kind.
fn unify_collapsed_kinds(kept: &mut [ResolvedFact]) {
    let collapsed_library = |fact: &ResolvedFact| {
        fact.is_collapsed()
            && matches!(
                fact.destination.kind,
                NodeKind::SystemFramework | NodeKind::ThirdPartyFramework
            )
    };
    let mut system: HashMap<String, bool> = HashMap::new();
    for fact in kept.iter().filter(|f| collapsed_library(f)) {
        *system.entry(fact.destination.name.clone()).or_default() |=
            fact.destination.kind == NodeKind::SystemFramework;
    }
    for fact in kept.iter_mut().filter(|f| collapsed_library(f)) {
        if system.get(&fact.destination.name).copied().unwrap_or_default() {
            fact.destination.kind = NodeKind::SystemFramework;
        } else {
            fact.destination.kind = NodeKind::ThirdPartyFramework;
        }
    }
}

/// Identity shared by every dependency collapsed under `suffix`.
#[must_use]
pub fn collapsed_identity(suffix: Suffix) -> String {
    format!("*{}", suffix.as_str())
}
