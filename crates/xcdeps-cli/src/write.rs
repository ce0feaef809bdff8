//! Output files and Graphviz rendering.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use tracing::{info, warn};

static SLUG_REJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("slug pattern compiles"));

const RENDER_FORMATS: [&str; 2] = ["png", "svg"];

/// File-system safe name: runs of other characters become `_`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let slug = SLUG_REJECT.replace_all(name.trim(), "_");
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug.into_owned()
    }
}

/// Where every output of a run goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    base: PathBuf,
    split_dir: PathBuf,
    split_flat: bool,
}

impl OutputPaths {
    /// `split_dir` defaults to `<base>_by_framework`.
    #[must_use]
    pub fn new(base: PathBuf, split_dir: Option<PathBuf>, split_flat: bool) -> Self {
        let split_dir = split_dir.unwrap_or_else(|| {
            let mut dir = base.clone().into_os_string();
            dir.push("_by_framework");
            PathBuf::from(dir)
        });
        Self {
            base,
            split_dir,
            split_flat,
        }
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut path = self.base.clone().into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }

    #[must_use]
    pub fn full_dot(&self) -> PathBuf {
        self.with_suffix(".dot")
    }

    #[must_use]
    pub fn cycle_dot(&self) -> PathBuf {
        self.with_suffix(".cycles-only.dot")
    }

    #[must_use]
    pub fn cycles_txt(&self) -> PathBuf {
        self.with_suffix(".cycles.txt")
    }

    #[must_use]
    pub fn split_dir(&self) -> &Path {
        &self.split_dir
    }

    /// `<split_dir>/<slug>/<slug>.dot`, or `<split_dir>/<slug>.dot` when flat.
    #[must_use]
    pub fn framework_dot(&self, name: &str) -> PathBuf {
        let slug = slugify(name);
        let file = format!("{slug}.dot");
        if self.split_flat {
            self.split_dir.join(file)
        } else {
            self.split_dir.join(slug).join(file)
        }
    }
}

/// Write `contents` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an I/O error with the path as context.
pub fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "wrote output");
    Ok(())
}

/// Locate an executable on `PATH`.
#[must_use]
pub fn which(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Runs Graphviz `dot` next to each DOT file it is given.
#[derive(Debug, Clone)]
pub struct Renderer {
    dot: Option<PathBuf>,
}

impl Renderer {
    /// Look up `dot` on `PATH`; warns once when it is missing.
    #[must_use]
    pub fn detect() -> Self {
        let dot = which("dot");
        if dot.is_none() {
            warn!("Graphviz `dot` not found on PATH; skipping PNG/SVG rendering");
        }
        Self { dot }
    }

    /// `<file>.png` and `<file>.svg` beside `dot_file`. Failures are logged,
    /// never fatal.
    pub fn render(&self, dot_file: &Path) {
        let Some(dot) = &self.dot else {
            return;
        };
        for format in RENDER_FORMATS {
            let out = dot_file.with_extension(format);
            let status = Command::new(dot)
                .arg(format!("-T{format}"))
                .arg(dot_file)
                .arg("-o")
                .arg(&out)
                .status();
            match status {
                Ok(status) if status.success() => {
                    info!(path = %out.display(), "rendered");
                }
                Ok(status) => {
                    warn!(path = %out.display(), %status, "dot exited with failure");
                }
                Err(err) => {
                    warn!(path = %out.display(), error = %err, "failed to run dot");
                }
            }
        }
    }
}
