//! Command-line flags and how they layer over `.xcdeps.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use xcdeps_core::{AnalysisConfig, ConfigError};

use crate::output::OutputMode;

/// Config file looked up in the analysis root.
pub const CONFIG_FILE: &str = ".xcdeps.toml";

#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
#[command(
    name = "xcdeps",
    author,
    version,
    about = "xcdeps: dependency graphs and cycle gating for Xcode projects",
    long_about = None,
    after_help = "EXAMPLES:\n    # Analyze the current directory\n    xcdeps\n\n    # Fail CI on cycles and keep a JSON report\n    xcdeps --path ~/src/shop --fail-on-cycles --json-out deps.json\n\n    # Per-framework views only, without rendering\n    xcdeps --split-only --split-max 10 --no-render\n\nEXIT CODES:\n    0 ok, 1 error, 2 cycles with --fail-on-cycles, 3 configuration, 4 extraction"
)]
pub struct Cli {
    /// Root directory to search for .xcodeproj and .xcworkspace.
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Read facts from a JSON array instead of scanning projects.
    #[arg(long, value_name = "FILE")]
    pub facts: Option<PathBuf>,

    /// Configuration file (default: <path>/.xcdeps.toml when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base name for output files, without extension.
    #[arg(long, default_value = "xcode_deps_graph")]
    pub output: PathBuf,

    /// Also write the JSON report to this file.
    #[arg(long, value_name = "FILE")]
    pub json_out: Option<PathBuf>,

    /// Write DOT only; do not run Graphviz.
    #[arg(long)]
    pub no_render: bool,

    /// Leave the generation timestamp out of DOT and JSON.
    #[arg(long)]
    pub no_timestamp: bool,

    /// Exit with code 2 when cycles exist (after writing outputs).
    #[arg(long)]
    pub fail_on_cycles: bool,

    #[arg(long, help_heading = "Styling")]
    pub no_cycle_highlight: bool,

    #[arg(long, help_heading = "Styling")]
    pub no_system_highlight: bool,

    /// Palette override, e.g. `edge_cycle=#d70015`. Repeatable.
    #[arg(long = "color", value_name = "KEY=#RRGGBB", help_heading = "Styling")]
    pub colors: Vec<String>,

    /// Layout direction: LR, RL, TB or BT.
    #[arg(long, help_heading = "Styling")]
    pub rankdir: Option<String>,

    #[arg(long, help_heading = "Styling")]
    pub title: Option<String>,

    #[arg(long, help_heading = "Styling")]
    pub subtitle: Option<String>,

    #[arg(long, help_heading = "Styling")]
    pub font: Option<String>,

    /// Regex of targets to keep. Repeatable.
    #[arg(long, value_name = "REGEX", help_heading = "Filters")]
    pub include_target: Vec<String>,

    /// Regex of targets to drop; beats --include-target.
    #[arg(long, value_name = "REGEX", help_heading = "Filters")]
    pub exclude_target: Vec<String>,

    #[arg(long, value_name = "REGEX", help_heading = "Filters")]
    pub include_lib: Vec<String>,

    #[arg(long, value_name = "REGEX", help_heading = "Filters")]
    pub exclude_lib: Vec<String>,

    /// Library suffix to keep: .framework, .a, .tbd, .dylib or spm.
    #[arg(long, value_name = "SUFFIX", help_heading = "Filters")]
    pub include_suffix: Vec<String>,

    #[arg(long, value_name = "SUFFIX", help_heading = "Filters")]
    pub exclude_suffix: Vec<String>,

    /// Merge every library with this suffix into one node.
    #[arg(long, value_name = "SUFFIX", help_heading = "Filters")]
    pub collapse_suffix: Vec<String>,

    #[arg(long, value_name = "REGEX", help_heading = "Filters")]
    pub highlight_target: Vec<String>,

    #[arg(long, value_name = "REGEX", help_heading = "Filters")]
    pub highlight_lib: Vec<String>,

    /// Do not warn about repeated edges.
    #[arg(long, help_heading = "Filters")]
    pub ignore_duplicates: bool,

    /// Keep a target whose dependencies were all filtered out.
    #[arg(long, help_heading = "Filters")]
    pub keep_isolated_targets: bool,

    /// Write the cycle-only view instead of the full graph.
    #[arg(long, help_heading = "Views")]
    pub only_cycles: bool,

    /// Also write one view per framework.
    #[arg(long, help_heading = "Views")]
    pub split_by_framework: bool,

    /// Write per-framework views without the full graph.
    #[arg(long, help_heading = "Views")]
    pub split_only: bool,

    /// Directory for per-framework views (default: `<output>_by_framework`).
    #[arg(long, value_name = "DIR", help_heading = "Views")]
    pub split_dir: Option<PathBuf>,

    /// One directory for all views instead of one per framework.
    #[arg(long, help_heading = "Views")]
    pub split_flat: bool,

    #[arg(long, help_heading = "Views")]
    pub split_include_target_deps: bool,

    #[arg(long, help_heading = "Views")]
    pub split_include_peer_libs: bool,

    /// Cap on the number of framework views; 0 keeps all.
    #[arg(long, value_name = "N", help_heading = "Views")]
    pub split_max: Option<usize>,

    /// Minimum number of linking targets for a framework view.
    #[arg(long, value_name = "N", help_heading = "Views")]
    pub split_min_degree: Option<usize>,

    /// Terminal output format.
    #[arg(long, value_enum)]
    pub format: Option<OutputMode>,

    /// Alias for --format json.
    #[arg(long, hide = true)]
    pub json: bool,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load the config file, if any, and layer the flags on top.
    ///
    /// An explicit `--config` must exist; the implicit `.xcdeps.toml` is
    /// optional.
    ///
    /// # Errors
    ///
    /// Returns I/O errors for an unreadable file and [`ConfigError`] for bad
    /// contents or flags.
    pub fn analysis_config(&self, root: &Path) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => {
                let implicit = root.join(CONFIG_FILE);
                if implicit.is_file() {
                    load_config(&implicit)?
                } else {
                    AnalysisConfig::default()
                }
            }
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    /// Lists append, booleans OR, scalars replace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidColor`] for a `--color` without `=`.
    pub fn apply(&self, config: &mut AnalysisConfig) -> Result<(), ConfigError> {
        let filter = &mut config.filter;
        filter.include_target.extend(self.include_target.iter().cloned());
        filter.exclude_target.extend(self.exclude_target.iter().cloned());
        filter.include_lib.extend(self.include_lib.iter().cloned());
        filter.exclude_lib.extend(self.exclude_lib.iter().cloned());
        filter.include_suffix.extend(self.include_suffix.iter().cloned());
        filter.exclude_suffix.extend(self.exclude_suffix.iter().cloned());
        filter.collapse_suffix.extend(self.collapse_suffix.iter().cloned());
        filter.highlight_target.extend(self.highlight_target.iter().cloned());
        filter.highlight_lib.extend(self.highlight_lib.iter().cloned());
        filter.ignore_duplicates |= self.ignore_duplicates;
        filter.keep_isolated_targets |= self.keep_isolated_targets;

        let split = &mut config.split;
        split.include_target_deps |= self.split_include_target_deps;
        split.include_peer_libs |= self.split_include_peer_libs;
        if let Some(max) = self.split_max {
            split.max = max;
        }
        if let Some(min_degree) = self.split_min_degree {
            split.min_degree = min_degree;
        }

        let render = &mut config.render;
        if self.no_cycle_highlight {
            render.highlight_cycles = false;
        }
        if self.no_system_highlight {
            render.system_highlight = false;
        }
        if let Some(rankdir) = &self.rankdir {
            render.rankdir.clone_from(rankdir);
        }
        if self.title.is_some() {
            render.title.clone_from(&self.title);
        }
        if self.subtitle.is_some() {
            render.subtitle.clone_from(&self.subtitle);
        }
        if self.font.is_some() {
            render.font.clone_from(&self.font);
        }
        for raw in &self.colors {
            let (key, value) = raw.split_once('=').ok_or_else(|| ConfigError::InvalidColor {
                key: raw.clone(),
                value: String::new(),
            })?;
            render
                .colors
                .insert(key.trim().to_string(), value.trim().to_string());
        }

        let views = &mut config.views;
        if self.only_cycles {
            views.full_graph = false;
            views.cycle_graph = true;
        }
        if self.split_only {
            views.full_graph = false;
            views.framework_views = true;
        }
        views.framework_views |= self.split_by_framework;

        config.fail_on_cycles |= self.fail_on_cycles;
        Ok(())
    }
}

fn load_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    AnalysisConfig::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
}
