#![forbid(unsafe_code)]

mod cli;
mod discover;
mod exit;
mod output;
mod source;
mod write;

use std::collections::BTreeMap;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use xcdeps_core::export::{dot, json, summary};
use xcdeps_core::{Analysis, Fact};

use cli::Cli;
use exit::XcdepsExit;
use output::RunReport;
use source::{FactsFile, FallbackSource, PlistSource};
use write::{OutputPaths, Renderer, write_file};

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("XCDEPS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "xcdeps=debug,info"
        } else {
            "xcdeps=info,warn"
        })
    });

    let format = env::var("XCDEPS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

/// Facts plus where they came from.
struct Input {
    facts: Vec<Fact>,
    root: Option<PathBuf>,
    projects: usize,
}

fn load_input(cli: &Cli) -> anyhow::Result<Option<Input>> {
    if let Some(path) = &cli.facts {
        let facts = FactsFile::new(path).load()?;
        info!(facts = facts.len(), path = %path.display(), "facts loaded");
        return Ok(Some(Input {
            facts,
            root: None,
            projects: 0,
        }));
    }

    if !cli.path.exists() {
        bail!("analysis root {} does not exist", cli.path.display());
    }
    let root = cli
        .path
        .canonicalize()
        .with_context(|| format!("resolving {}", cli.path.display()))?;
    info!(root = %root.display(), "starting Xcode dependency analysis");

    let found = discover::discover(&root);
    info!(
        projects = found.projects.len(),
        workspaces = found.workspaces.len(),
        "containers found"
    );
    let projects = found.all_projects();
    if projects.is_empty() {
        warn!(root = %root.display(), "no .xcodeproj found; nothing to do");
        return Ok(None);
    }

    let plist =
        env::var("XCDEPS_PLUTIL").map_or_else(|_| PlistSource::default(), PlistSource::with_tool);
    let facts = source::extract_all(&FallbackSource::new(plist), &projects)?;
    Ok(Some(Input {
        facts,
        root: Some(root),
        projects: projects.len(),
    }))
}

/// Per-view file names; a name shared by nodes of different kinds gets the
/// kind appended.
fn framework_names(analysis: &Analysis) -> Vec<String> {
    let names: Vec<(&str, &str)> = analysis
        .framework_views
        .iter()
        .filter_map(|view| analysis.graph.node(view.focus))
        .map(|node| (node.name(), node.kind().as_str()))
        .collect();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (name, _) in &names {
        *counts.entry(*name).or_default() += 1;
    }
    names
        .iter()
        .map(|(name, kind)| {
            if counts.get(name).copied().unwrap_or_default() > 1 {
                format!("{name}-{kind}")
            } else {
                (*name).to_string()
            }
        })
        .collect()
}

struct Timestamps {
    dot: String,
    json: String,
}

impl Timestamps {
    fn now() -> Self {
        let now = chrono::Local::now();
        Self {
            dot: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            json: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

fn write_outputs(
    cli: &Cli,
    analysis: &Analysis,
    config: &xcdeps_core::AnalysisConfig,
    root: Option<&Path>,
) -> anyhow::Result<Vec<String>> {
    let paths = OutputPaths::new(cli.output.clone(), cli.split_dir.clone(), cli.split_flat);
    let stamp = (!cli.no_timestamp).then(Timestamps::now);
    let dot_stamp = stamp.as_ref().map(|s| s.dot.as_str());
    let renderer = (!cli.no_render).then(Renderer::detect);
    let mut written = Vec::new();

    let mut emit = |path: PathBuf, contents: &str, render: bool| -> anyhow::Result<()> {
        write_file(&path, contents)?;
        if render && let Some(renderer) = &renderer {
            renderer.render(&path);
        }
        written.push(path.display().to_string());
        Ok(())
    };

    emit(
        paths.cycles_txt(),
        &summary::cycles_txt(&analysis.cycles.cycles),
        false,
    )?;

    if let Some(json_path) = &cli.json_out {
        let meta = json::ReportMeta {
            generated_at: stamp.as_ref().map(|s| s.json.clone()),
            root: root.map(|r| r.display().to_string()),
        };
        let report = json::report(analysis, &config.filter, meta);
        let mut text = json::to_json_string(&report).context("serializing JSON report")?;
        text.push('\n');
        emit(json_path.clone(), &text, false)?;
    }

    let views = analysis.config.views;
    if views.framework_views {
        if analysis.framework_views.is_empty() {
            warn!("no framework meets the split criteria");
        }
        for (view, name) in analysis.framework_views.iter().zip(framework_names(analysis)) {
            let contents = dot::framework_graph(analysis, view, dot_stamp);
            emit(paths.framework_dot(&name), &contents, true)?;
        }
        info!(
            views = analysis.framework_views.len(),
            dir = %paths.split_dir().display(),
            "framework views written"
        );
    }

    if views.full_graph {
        emit(paths.full_dot(), &dot::full_graph(analysis, dot_stamp), true)?;
    }

    if views.cycle_graph {
        emit(paths.cycle_dot(), &dot::cycle_graph(analysis, dot_stamp), true)?;
    }

    Ok(written)
}

fn run(cli: &Cli) -> anyhow::Result<XcdepsExit> {
    let mode = output::resolve_output_mode(cli.format, cli.json);

    let config = cli.analysis_config(&cli.path)?;
    let compiled = config.compile()?;

    let Some(input) = load_input(cli)? else {
        return Ok(XcdepsExit::Success);
    };

    let analysis = Analysis::run_compiled(&input.facts, compiled)?;
    for (i, cycle) in summary::cycle_details(&analysis).iter().enumerate() {
        warn!(cycle = i + 1, members = %cycle.members.join(", "), "dependency cycle");
    }

    let outputs = write_outputs(cli, &analysis, &config, input.root.as_deref())?;

    let status = XcdepsExit::from(analysis.exit_status());
    if status == XcdepsExit::CyclesFound {
        warn!("cycles found with --fail-on-cycles; exiting with code 2");
    }

    RunReport {
        banner: summary::banner(&analysis),
        root: input.root.map(|r| r.display().to_string()),
        projects: input.projects,
        has_cycles: analysis.has_cycles(),
        cycles_count: analysis.cycles_count(),
        summary: analysis.summary(),
        cycles: summary::cycle_details(&analysis),
        outputs,
        exit_code: status.code(),
    }
    .print(mode)?;

    Ok(status)
}

fn main() -> XcdepsExit {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                XcdepsExit::Config
            } else {
                XcdepsExit::Success
            };
        }
    };
    init_tracing(cli.verbose);
    XcdepsExit::from(run(&cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xcdeps_core::AnalysisConfig;

    #[test]
    fn framework_names_disambiguate_kinds() {
        let facts = [
            Fact::library("App", "Charts.framework"),
            Fact::spm("App", "Charts"),
            Fact::library("App", "Lottie.framework"),
        ];
        let mut config = AnalysisConfig::default();
        config.views.framework_views = true;
        let analysis = Analysis::run(&facts, &config).expect("analysis");

        let mut names = framework_names(&analysis);
        names.sort();
        assert_eq!(
            names,
            vec!["Charts-spm_product", "Charts-third_party_framework", "Lottie"]
        );
    }
}
