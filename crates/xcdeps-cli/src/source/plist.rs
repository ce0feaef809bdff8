//! Structured extraction through `plutil`, which converts the old-style property list
//! in `project.pbxproj` to JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use serde_json::{Map, Value};
use tracing::{debug, instrument};
use xcdeps_core::{Fact, Suffix};

use super::{FactSource, SourceError, pbxproj_path};

const DEFAULT_TOOL: &str = "plutil";
const SPM_SUBTITLE: &str = "Swift Package";

#[derive(Debug, Clone)]
pub struct PlistSource {
    tool: String,
}

impl Default for PlistSource {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
        }
    }
}

impl PlistSource {
    /// Use a different converter binary with `plutil`'s command line.
    #[must_use]
    pub fn with_tool(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    fn convert(&self, pbxproj: &Path) -> Result<Value, SourceError> {
        let output = Command::new(&self.tool)
            .args(["-convert", "json", "-o", "-"])
            .arg(pbxproj)
            .output()
            .map_err(|source| SourceError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SourceError::ToolFailed {
                tool: self.tool.clone(),
                path: pbxproj.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|source| SourceError::Json {
            path: pbxproj.to_path_buf(),
            source,
        })
    }
}

impl FactSource for PlistSource {
    #[instrument(skip_all, fields(project = %project.display()))]
    fn extract(&self, project: &Path) -> Result<Vec<Fact>, SourceError> {
        let pbxproj = pbxproj_path(project)?;
        let document = self.convert(&pbxproj)?;
        let facts = facts_from_objects(&document);
        debug!(facts = facts.len(), "project parsed");
        Ok(facts)
    }
}

// ---------------------------------------------------------------------------
// Object table walk
// ---------------------------------------------------------------------------

fn isa(object: &Value) -> Option<&str> {
    object.get("isa").and_then(Value::as_str)
}

fn text<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn ids<'a>(object: &'a Value, key: &str) -> impl Iterator<Item = &'a str> {
    object
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn lookup<'a>(objects: &'a Map<String, Value>, id: &str, kind: &str) -> Option<&'a Value> {
    objects.get(id).filter(|object| isa(object) == Some(kind))
}

/// Facts declared in a converted `project.pbxproj` document.
///
/// Emits, in order: linked libraries per native target, Swift package
/// products per target, then explicit target dependencies. Targets are
/// visited in object-id order.
#[must_use]
pub fn facts_from_objects(document: &Value) -> Vec<Fact> {
    let Some(objects) = document.get("objects").and_then(Value::as_object) else {
        return Vec::new();
    };

    let targets: BTreeMap<&str, (&str, &Value)> = objects
        .iter()
        .filter(|(_, object)| isa(object) == Some("PBXNativeTarget"))
        .map(|(id, object)| (id.as_str(), (text(object, "name").unwrap_or(id.as_str()), object)))
        .collect();

    let mut facts = Vec::new();

    for (name, target) in targets.values() {
        for phase in ids(target, "buildPhases")
            .filter_map(|id| lookup(objects, id, "PBXFrameworksBuildPhase"))
        {
            for build_file in ids(phase, "files").filter_map(|id| objects.get(id)) {
                let Some(file_ref) = text(build_file, "fileRef")
                    .and_then(|id| lookup(objects, id, "PBXFileReference"))
                else {
                    continue;
                };
                if let Some(fact) = library_fact(name, file_ref) {
                    facts.push(fact);
                }
            }
        }
    }

    for (name, target) in targets.values() {
        for (id, product) in ids(target, "packageProductDependencies").filter_map(|id| {
            lookup(objects, id, "XCSwiftPackageProductDependency").map(|object| (id, object))
        }) {
            let product_name = text(product, "productName")
                .map_or_else(|| format!("SPMProduct:{id}"), str::to_string);
            let subtitle = text(product, "package")
                .and_then(|package| objects.get(package))
                .and_then(|package| text(package, "repositoryURL"))
                .unwrap_or(SPM_SUBTITLE);
            facts.push(Fact::spm(*name, product_name).with_subtitle(subtitle));
        }
    }

    for (source_id, (name, target)) in &targets {
        for dependency in ids(target, "dependencies")
            .filter_map(|id| lookup(objects, id, "PBXTargetDependency"))
        {
            let Some(target_id) = text(dependency, "target") else {
                continue;
            };
            let destination = targets.get(target_id).map_or(target_id, |(name, _)| *name);
            let fact = Fact::target(*name, destination);
            // a target that names itself did so explicitly
            facts.push(if target_id == *source_id {
                fact.allow_self_loop()
            } else {
                fact
            });
        }
    }

    facts
}

fn library_fact(target: &str, file_ref: &Value) -> Option<Fact> {
    let location = text(file_ref, "path").or_else(|| text(file_ref, "name"))?;
    if Suffix::of(location) == Suffix::None {
        return None;
    }
    let mut fact = Fact::library(target, location);
    if let Some(path) = text(file_ref, "path") {
        fact = fact.with_path(path);
    }
    if let Some(tree) = text(file_ref, "sourceTree") {
        fact = fact.with_source_tree(tree);
    }
    Some(fact)
}
