//! Last-resort extraction: scan `project.pbxproj` for library paths.
//!
//! Target structure is lost, so every library hangs off a synthetic target
//! named `[<ProjectName>]`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use xcdeps_core::Fact;

use super::{FactSource, SourceError, pbxproj_path};

static LIBRARY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)path\s*=\s*"?([^";]*?\.(?:framework|a|tbd|dylib))"?\s*;"#)
        .expect("library path pattern compiles")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct TextSource;

impl TextSource {
    /// Library facts found in `contents`, one per canonical name, sorted.
    #[must_use]
    pub fn scan(project_name: &str, contents: &str) -> Vec<Fact> {
        let target = format!("[{project_name}]");
        let mut found: BTreeMap<String, String> = BTreeMap::new();
        for capture in LIBRARY_PATH.captures_iter(contents) {
            let raw = capture[1].trim().to_string();
            let probe = Fact::library(&target, raw.as_str());
            found.entry(probe.canonical_destination()).or_insert(raw);
        }
        found
            .into_values()
            .map(|raw| Fact::library(&target, raw))
            .collect()
    }
}

impl FactSource for TextSource {
    fn extract(&self, project: &Path) -> Result<Vec<Fact>, SourceError> {
        let pbxproj = pbxproj_path(project)?;
        let bytes = fs::read(&pbxproj).map_err(|source| SourceError::Read {
            path: pbxproj.clone(),
            source,
        })?;
        let contents = String::from_utf8_lossy(&bytes);
        let name = project
            .file_stem()
            .map_or_else(|| project.display().to_string(), |s| s.to_string_lossy().into_owned());
        let facts = Self::scan(&name, &contents);
        debug!(project = %project.display(), facts = facts.len(), "text scan");
        Ok(facts)
    }
}
