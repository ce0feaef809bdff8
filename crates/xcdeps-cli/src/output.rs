//! Terminal output with pretty/text/JSON parity.
//!
//! Output mode precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY, [`OutputMode::Text`] if piped.
//!
//! Logs go to stderr; everything here goes to stdout.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use serde::Serialize;
use xcdeps_core::Summary;
use xcdeps_core::export::summary::CycleDetail;

/// Shared width for pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Left-aligned key/value line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and rules for people.
    Pretty,
    /// Compact lines for scripts and pipes.
    Text,
    /// One JSON object.
    Json,
}

fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    if json_flag {
        return OutputMode::Json;
    }
    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {}
        }
    }
    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from flags, `FORMAT` and TTY detection.
#[must_use]
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, json_flag, env_val.as_deref(), is_tty)
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// What one run found and wrote.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub banner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub projects: usize,
    pub has_cycles: bool,
    pub cycles_count: usize,
    pub summary: Summary,
    pub cycles: Vec<CycleDetail>,
    pub outputs: Vec<String>,
    pub exit_code: u8,
}

impl RunReport {
    fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.banner)?;
        pretty_rule(w)?;
        for (i, cycle) in self.cycles.iter().enumerate() {
            writeln!(w, "Cycle #{}: nodes = {}", i + 1, cycle.members.join(", "))?;
            for (from, to) in &cycle.edges {
                writeln!(w, "    {from} → {to}")?;
            }
        }
        if !self.cycles.is_empty() {
            writeln!(w)?;
        }

        pretty_section(w, "Summary")?;
        if let Some(root) = &self.root {
            pretty_kv(w, "Root", root)?;
            pretty_kv(w, "Projects", self.projects.to_string())?;
        }
        let s = &self.summary;
        pretty_kv(w, "Facts", format!("{} ({} dropped)", s.facts, s.facts_dropped))?;
        pretty_kv(w, "Targets", s.targets.to_string())?;
        pretty_kv(
            w,
            "Libraries",
            format!(
                "{} ({} system, {} third-party, {} SPM)",
                s.libraries, s.system_frameworks, s.third_party_frameworks, s.spm_products
            ),
        )?;
        pretty_kv(w, "Edges", s.edges.to_string())?;
        pretty_kv(
            w,
            "Cycle nodes",
            format!("{}  •  cycle edges: {}", s.cycle_nodes, s.cycle_edges),
        )?;
        if s.warnings > 0 {
            pretty_kv(w, "Warnings", s.warnings.to_string())?;
        }

        if !self.outputs.is_empty() {
            writeln!(w)?;
            pretty_section(w, "Outputs")?;
            for path in &self.outputs {
                writeln!(w, "{path}")?;
            }
        }
        Ok(())
    }

    fn write_text(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}", self.banner)?;
        for (i, cycle) in self.cycles.iter().enumerate() {
            writeln!(w, "cycle {}: {}", i + 1, cycle.members.join(","))?;
            for (from, to) in &cycle.edges {
                writeln!(w, "  {from} -> {to}")?;
            }
        }
        let s = &self.summary;
        writeln!(
            w,
            "targets={} libraries={} edges={} cycle_nodes={} cycle_edges={} warnings={}",
            s.targets, s.libraries, s.edges, s.cycle_nodes, s.cycle_edges, s.warnings
        )?;
        for path in &self.outputs {
            writeln!(w, "wrote {path}")?;
        }
        Ok(())
    }

    /// Render to `w` in `mode`.
    ///
    /// # Errors
    ///
    /// Propagates write and serialization failures.
    pub fn write(&self, mode: OutputMode, w: &mut dyn Write) -> anyhow::Result<()> {
        match mode {
            OutputMode::Pretty => self.write_pretty(w)?,
            OutputMode::Text => self.write_text(w)?,
            OutputMode::Json => {
                serde_json::to_writer_pretty(&mut *w, self)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }

    /// Render to stdout in `mode`.
    ///
    /// # Errors
    ///
    /// Propagates write and serialization failures.
    pub fn print(&self, mode: OutputMode) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write(mode, &mut out)
    }
}
