//! Fact extraction. Turns an `.xcodeproj` (or a facts file) into the ordered
//! fact list the core consumes.

mod plist;
mod text;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use xcdeps_core::Fact;

pub use plist::PlistSource;
pub use text::TextSource;

/// Why a project produced no facts.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{0} has no project.pbxproj")]
    MissingPbxproj(PathBuf),

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run `{tool}`")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("`{tool}` failed on {path}: {stderr}")]
    ToolFailed {
        tool: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Something that can list the dependency facts of one project.
pub trait FactSource {
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the project cannot be read or parsed.
    fn extract(&self, project: &Path) -> Result<Vec<Fact>, SourceError>;
}

/// Structured extraction first, text scan when that fails.
#[derive(Debug, Default)]
pub struct FallbackSource<P = PlistSource> {
    primary: P,
    fallback: TextSource,
}

impl<P> FallbackSource<P> {
    #[must_use]
    pub const fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: TextSource,
        }
    }
}

impl<P: FactSource> FactSource for FallbackSource<P> {
    fn extract(&self, project: &Path) -> Result<Vec<Fact>, SourceError> {
        match self.primary.extract(project) {
            Ok(facts) => Ok(facts),
            Err(err @ SourceError::MissingPbxproj(_)) => Err(err),
            Err(err) => {
                warn!(
                    project = %project.display(),
                    error = %err,
                    "structured extraction failed, scanning project text"
                );
                self.fallback.extract(project)
            }
        }
    }
}

/// Facts of every project, in the order given.
///
/// A failing project is logged and skipped. The run fails only when no
/// project could be read at all.
///
/// # Errors
///
/// Returns the first [`SourceError`] when every project failed.
pub fn extract_all<S: FactSource>(source: &S, projects: &[PathBuf]) -> Result<Vec<Fact>, SourceError> {
    let mut facts = Vec::new();
    let mut first_error = None;
    let mut extracted = 0usize;
    for project in projects {
        info!(project = %project.display(), "processing project");
        match source.extract(project) {
            Ok(found) => {
                extracted += 1;
                facts.extend(found);
            }
            Err(err) => {
                warn!(project = %project.display(), error = %err, "skipping project");
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) if extracted == 0 => Err(err),
        _ => Ok(facts),
    }
}

/// Path of the `project.pbxproj` inside `project`, if present.
fn pbxproj_path(project: &Path) -> Result<PathBuf, SourceError> {
    let path = project.join("project.pbxproj");
    if path.is_file() {
        Ok(path)
    } else {
        Err(SourceError::MissingPbxproj(project.to_path_buf()))
    }
}

/// A JSON array of facts, as written by another tool or by hand.
#[derive(Debug, Clone)]
pub struct FactsFile {
    path: PathBuf,
}

impl FactsFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// # Errors
    ///
    /// Returns [`SourceError::Read`] or [`SourceError::Json`].
    pub fn load(&self) -> Result<Vec<Fact>, SourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SourceError::Json {
            path: self.path.clone(),
            source,
        })
    }
}
