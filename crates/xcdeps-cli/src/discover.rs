//! Project discovery under an analysis root.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

const SKIP_DIRS: [&str; 4] = [".git", "DerivedData", "build", ".build"];

static FILE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<FileRef\s+location\s*=\s*"([^"]+)""#).expect("FileRef pattern compiles")
});

/// Containers found under a root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub projects: Vec<PathBuf>,
    pub workspaces: Vec<PathBuf>,
}

impl Discovery {
    /// Projects found directly plus those referenced by workspaces, sorted
    /// and deduplicated.
    #[must_use]
    pub fn all_projects(&self) -> Vec<PathBuf> {
        let mut all: BTreeSet<PathBuf> = self.projects.iter().cloned().collect();
        for workspace in &self.workspaces {
            all.extend(
                workspace_projects(workspace)
                    .into_iter()
                    .filter(|path| has_extension(path, "xcodeproj")),
            );
        }
        all.into_iter().collect()
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

/// Walk `root` for `.xcodeproj` and `.xcworkspace` directories.
///
/// Container directories are not descended into, so workspaces embedded in
/// a project bundle are not listed twice.
#[must_use]
pub fn discover(root: &Path) -> Discovery {
    let mut found = Discovery::default();
    let mut walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry));

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if has_extension(path, "xcodeproj") {
            found.projects.push(path.to_path_buf());
            walker.skip_current_dir();
        } else if has_extension(path, "xcworkspace") {
            found.workspaces.push(path.to_path_buf());
            walker.skip_current_dir();
        }
    }

    debug!(
        projects = found.projects.len(),
        workspaces = found.workspaces.len(),
        "discovery complete"
    );
    found
}

/// Paths referenced by `contents.xcworkspacedata` that exist on disk.
///
/// `group:` and bare locations resolve against the workspace directory;
/// `absolute:` locations are taken as-is. Other prefixes such as
/// `container:` are resolved like `group:`.
#[must_use]
pub fn workspace_projects(workspace: &Path) -> Vec<PathBuf> {
    let data = workspace.join("contents.xcworkspacedata");
    let Ok(contents) = fs::read_to_string(&data) else {
        return Vec::new();
    };
    parse_file_refs(&contents)
        .into_iter()
        .map(|location| resolve_location(workspace, &location))
        .filter(|path| path.exists())
        .map(|path| fs::canonicalize(&path).unwrap_or(path))
        .collect()
}

fn resolve_location(workspace: &Path, location: &str) -> PathBuf {
    if let Some(absolute) = location.strip_prefix("absolute:") {
        return PathBuf::from(absolute);
    }
    let relative = location
        .split_once(':')
        .map_or(location, |(_, rest)| rest);
    workspace.join(relative)
}

fn parse_file_refs(contents: &str) -> Vec<String> {
    FILE_REF
        .captures_iter(contents)
        .map(|capture| capture[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkdir(path: &Path) {
        fs::create_dir_all(path).expect("mkdir");
    }

    #[test]
    fn finds_projects_and_skips_build_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        mkdir(&root.join("App/App.xcodeproj/project.xcworkspace"));
        mkdir(&root.join("Modules/Core/Core.xcodeproj"));
        mkdir(&root.join("build/Stale.xcodeproj"));
        mkdir(&root.join(".git/Hidden.xcodeproj"));
        mkdir(&root.join("DerivedData/Cached.xcodeproj"));
        mkdir(&root.join("Shop.xcworkspace"));

        let found = discover(root);
        assert_eq!(
            found.projects,
            vec![
                root.join("App/App.xcodeproj"),
                root.join("Modules/Core/Core.xcodeproj")
            ]
        );
        assert_eq!(found.workspaces, vec![root.join("Shop.xcworkspace")]);
    }

    #[test]
    fn parses_file_ref_locations() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Workspace version = "1.0">
   <FileRef location = "group:App/App.xcodeproj"></FileRef>
   <FileRef location="absolute:/opt/Shared.xcodeproj"></FileRef>
</Workspace>"#;
        assert_eq!(
            parse_file_refs(xml),
            vec!["group:App/App.xcodeproj", "absolute:/opt/Shared.xcodeproj"]
        );
    }

    #[test]
    fn resolves_location_prefixes() {
        let ws = Path::new("/repo/Shop.xcworkspace");
        assert_eq!(
            resolve_location(ws, "group:App/App.xcodeproj"),
            PathBuf::from("/repo/Shop.xcworkspace/App/App.xcodeproj")
        );
        assert_eq!(
            resolve_location(ws, "absolute:/opt/Shared.xcodeproj"),
            PathBuf::from("/opt/Shared.xcodeproj")
        );
        assert_eq!(
            resolve_location(ws, "Plain.xcodeproj"),
            PathBuf::from("/repo/Shop.xcworkspace/Plain.xcodeproj")
        );
    }

    #[test]
    fn workspace_references_join_discovered_projects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = fs::canonicalize(dir.path()).expect("canonical root");
        let outside = tempfile::tempdir().expect("second tempdir");
        let shared = fs::canonicalize(outside.path())
            .expect("canonical")
            .join("Shared.xcodeproj");
        mkdir(&shared);
        mkdir(&root.join("App.xcodeproj"));
        mkdir(&root.join("Shop.xcworkspace"));
        fs::write(
            root.join("Shop.xcworkspace/contents.xcworkspacedata"),
            format!(
                "<Workspace>\n<FileRef location=\"absolute:{}\"></FileRef>\n\
                 <FileRef location=\"group:Missing.xcodeproj\"></FileRef>\n</Workspace>",
                shared.display()
            ),
        )
        .expect("write workspace");

        let found = discover(&root);
        assert_eq!(
            found.all_projects(),
            vec![root.join("App.xcodeproj"), shared]
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        );
    }
}
