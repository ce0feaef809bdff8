//! The analysis pipeline: filter → build → cycles → attributes → views.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::attrs::AttributeSet;
use crate::config::{AnalysisConfig, CompiledConfig};
use crate::error::{AnalysisError, GraphError};
use crate::fact::Fact;
use crate::graph::build::build;
use crate::graph::{CycleSet, DependencyGraph, FactWarning, NodeKind, detect_cycles};
use crate::split::{CycleView, FrameworkView, cycle_view, split_by_framework};

/// Process status derived from an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Cycles were found and `fail_on_cycles` is set.
    CyclesFound,
}

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::CyclesFound => 2,
        }
    }
}

/// Counts for terminal and JSON reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub facts: usize,
    pub facts_dropped: usize,
    pub warnings: usize,
    pub targets: usize,
    pub libraries: usize,
    pub system_frameworks: usize,
    pub third_party_frameworks: usize,
    pub spm_products: usize,
    pub edges: usize,
    pub cycles: usize,
    pub cycle_nodes: usize,
    pub cycle_edges: usize,
}

/// Result of one analysis run. Read-only.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub config: CompiledConfig,
    pub graph: DependencyGraph,
    pub cycles: CycleSet,
    pub attrs: AttributeSet,
    /// Framework views, when selected.
    pub framework_views: Vec<FrameworkView>,
    /// Cycle-only view, when selected.
    pub cycle_view: Option<CycleView>,
    pub warnings: Vec<FactWarning>,
    facts: usize,
    facts_dropped: usize,
}

impl Analysis {
    /// Validate `config`, then run the pipeline over `facts`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] before touching any fact when the
    /// configuration is invalid, or [`AnalysisError::Graph`] if the built
    /// graph fails its consistency check.
    #[instrument(skip_all, fields(facts = facts.len()))]
    pub fn run(facts: &[Fact], config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let compiled = config.compile()?;
        Ok(Self::run_compiled(facts, compiled)?)
    }

    /// Run with an already validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the built graph is inconsistent.
    pub fn run_compiled(facts: &[Fact], config: CompiledConfig) -> Result<Self, GraphError> {
        let outcome = config.filter.apply(facts);
        debug!(
            kept = outcome.kept.len(),
            dropped = outcome.dropped,
            isolated = outcome.isolated_targets.len(),
            "facts filtered"
        );

        let built = build(&outcome, config.filter.ignore_duplicates);
        built.graph.validate()?;

        let cycles = detect_cycles(&built.graph);
        let attrs =
            AttributeSet::resolve(&built.graph, &cycles, &config.filter.highlight, &config.render);

        let framework_views = if config.views.framework_views {
            split_by_framework(&built.graph, &config.split)
        } else {
            Vec::new()
        };
        let cycle_view = config.views.cycle_graph.then(|| cycle_view(&cycles));

        info!(
            nodes = built.graph.node_count(),
            edges = built.graph.edge_count(),
            cycles = cycles.len(),
            "analysis complete"
        );

        Ok(Self {
            config,
            graph: built.graph,
            cycles,
            attrs,
            framework_views,
            cycle_view,
            warnings: built.warnings,
            facts: facts.len(),
            facts_dropped: outcome.dropped,
        })
    }

    #[must_use]
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    #[must_use]
    pub fn cycles_count(&self) -> usize {
        self.cycles.len()
    }

    /// `true` when any node matched a highlight pattern.
    #[must_use]
    pub fn has_highlights(&self) -> bool {
        self.attrs.any_highlighted()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            facts: self.facts,
            facts_dropped: self.facts_dropped,
            warnings: self.warnings.len(),
            edges: self.graph.edge_count(),
            cycles: self.cycles.len(),
            cycle_nodes: self.cycles.nodes().count(),
            cycle_edges: self.cycles.edge_count(),
            ..Summary::default()
        };
        for (_, node) in self.graph.nodes() {
            match node.kind() {
                NodeKind::Target => summary.targets += 1,
                NodeKind::SystemFramework => summary.system_frameworks += 1,
                NodeKind::ThirdPartyFramework => summary.third_party_frameworks += 1,
                NodeKind::SpmProduct => summary.spm_products += 1,
            }
        }
        summary.libraries =
            summary.system_frameworks + summary.third_party_frameworks + summary.spm_products;
        summary
    }

    /// 2 when cycles exist and `fail_on_cycles` is set, 0 otherwise.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        if self.config.fail_on_cycles && self.has_cycles() {
            ExitStatus::CyclesFound
        } else {
            ExitStatus::Success
        }
    }
}
