//! Dependency facts as delivered by a fact source.
//!
//! A [`Fact`] is one declared edge: a target links a library, depends on
//! another target, or consumes a Swift package product. Facts carry the raw
//! strings the extractor saw; classification helpers derive the suffix,
//! canonical name and system/third-party kind from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, NodeKind};

/// Library extensions recognised in paths and names, longest first.
const LIBRARY_EXTENSIONS: [(&str, Suffix); 4] = [
    (".framework", Suffix::Framework),
    (".dylib", Suffix::Dylib),
    (".tbd", Suffix::Tbd),
    (".a", Suffix::Static),
];

/// Path fragments that mark a library as shipped with the platform SDK.
const SYSTEM_PATH_MARKERS: [&str; 2] = ["system/library/frameworks", "/usr/lib/"];

/// `sourceTree` values that resolve inside the SDK or the toolchain.
const SYSTEM_SOURCE_TREES: [&str; 2] = ["SDKROOT", "DEVELOPER_DIR"];

/// How the destination of a fact was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Linked in a frameworks build phase.
    Library,
    /// Explicit target dependency.
    Target,
    /// Swift Package Manager product dependency.
    SpmProduct,
}

impl DependencyKind {
    #[must_use]
    pub const fn edge_kind(self) -> EdgeKind {
        match self {
            Self::Library => EdgeKind::TargetToLibrary,
            Self::Target => EdgeKind::TargetToTarget,
            Self::SpmProduct => EdgeKind::SpmDependency,
        }
    }
}

/// Trailing library marker used by suffix filters and collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suffix {
    Framework,
    Static,
    Tbd,
    Dylib,
    Spm,
    None,
}

impl Suffix {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Framework => ".framework",
            Self::Static => ".a",
            Self::Tbd => ".tbd",
            Self::Dylib => ".dylib",
            Self::Spm => "spm",
            Self::None => "",
        }
    }

    /// Detect the library extension at the end of `name`, ignoring case.
    #[must_use]
    pub fn of(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        LIBRARY_EXTENSIONS
            .iter()
            .find(|(ext, _)| lowered.ends_with(ext))
            .map_or(Self::None, |(_, suffix)| *suffix)
    }

    /// Normalize a user-supplied suffix token: lowercase, leading dot unless
    /// the token is `spm`. Returns `None` for blank tokens.
    #[must_use]
    pub fn normalize_token(token: &str) -> Option<String> {
        let lowered = token.trim().to_ascii_lowercase();
        if lowered.is_empty() || lowered == "." {
            return None;
        }
        if lowered == "spm" || lowered.starts_with('.') {
            Some(lowered)
        } else {
            Some(format!(".{lowered}"))
        }
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dependency edge as reported by a fact source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Name of the declaring target.
    pub source: String,
    /// Name of the dependency (library file name, target name or product).
    pub destination: String,
    pub kind: DependencyKind,
    /// Raw file path of a linked library, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Xcode `sourceTree` of the library file reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tree: Option<String>,
    /// Extra label such as an SPM repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Set by the extractor when a target-to-itself fact is intentional.
    #[serde(default)]
    pub self_loop_valid: bool,
}

impl Fact {
    fn new(source: impl Into<String>, destination: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            kind,
            path: None,
            source_tree: None,
            subtitle: None,
            self_loop_valid: false,
        }
    }

    /// `source` links the library `destination` (file name or path).
    #[must_use]
    pub fn library(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(source, destination, DependencyKind::Library)
    }

    /// `source` depends on the target `destination`.
    #[must_use]
    pub fn target(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(source, destination, DependencyKind::Target)
    }

    /// `source` consumes the Swift package product `destination`.
    #[must_use]
    pub fn spm(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::new(source, destination, DependencyKind::SpmProduct)
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_source_tree(mut self, source_tree: impl Into<String>) -> Self {
        self.source_tree = Some(source_tree.into());
        self
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub const fn allow_self_loop(mut self) -> Self {
        self.self_loop_valid = true;
        self
    }

    /// Suffix of the destination: path first, then the destination name.
    #[must_use]
    pub fn suffix(&self) -> Suffix {
        match self.kind {
            DependencyKind::SpmProduct => Suffix::Spm,
            DependencyKind::Target => Suffix::None,
            DependencyKind::Library => {
                let from_path = self.path.as_deref().map_or(Suffix::None, Suffix::of);
                if from_path == Suffix::None {
                    Suffix::of(&self.destination)
                } else {
                    from_path
                }
            }
        }
    }

    /// Trimmed source target name.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.trim()
    }

    /// Destination name with directories and library extensions removed.
    #[must_use]
    pub fn canonical_destination(&self) -> String {
        let trimmed = self.destination.trim();
        match self.kind {
            DependencyKind::Library => strip_library_extension(basename(trimmed)).to_string(),
            DependencyKind::Target | DependencyKind::SpmProduct => trimmed.to_string(),
        }
    }

    /// `true` when the library resolves inside the SDK or the toolchain.
    #[must_use]
    pub fn is_system(&self) -> bool {
        if self.kind != DependencyKind::Library {
            return false;
        }
        let location = self
            .path
            .as_deref()
            .unwrap_or(&self.destination)
            .to_ascii_lowercase();
        if SYSTEM_PATH_MARKERS.iter().any(|marker| location.contains(marker)) {
            return true;
        }
        self.source_tree.as_deref().is_some_and(|tree| {
            SYSTEM_SOURCE_TREES
                .iter()
                .any(|known| tree.trim().eq_ignore_ascii_case(known))
        })
    }

    /// Node kind of the destination.
    #[must_use]
    pub fn destination_kind(&self) -> NodeKind {
        match self.kind {
            DependencyKind::Target => NodeKind::Target,
            DependencyKind::SpmProduct => NodeKind::SpmProduct,
            DependencyKind::Library if self.is_system() => NodeKind::SystemFramework,
            DependencyKind::Library => NodeKind::ThirdPartyFramework,
        }
    }
}

fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

fn strip_library_extension(name: &str) -> &str {
    let lowered = name.to_ascii_lowercase();
    LIBRARY_EXTENSIONS
        .iter()
        .find(|(ext, _)| lowered.ends_with(ext) && lowered.len() > ext.len())
        .map_or(name, |(ext, _)| &name[..name.len() - ext.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_detection_ignores_case() {
        assert_eq!(Suffix::of("Alamofire.framework"), Suffix::Framework);
        assert_eq!(Suffix::of("libz.TBD"), Suffix::Tbd);
        assert_eq!(Suffix::of("libFoo.a"), Suffix::Static);
        assert_eq!(Suffix::of("libswift.dylib"), Suffix::Dylib);
        assert_eq!(Suffix::of("CoreModule"), Suffix::None);
    }

    #[test]
    fn suffix_prefers_path_over_name() {
        let fact = Fact::library("App", "Foo").with_path("Vendor/Foo.framework");
        assert_eq!(fact.suffix(), Suffix::Framework);

        let fact = Fact::library("App", "libBar.a").with_path("Vendor/libBar");
        assert_eq!(fact.suffix(), Suffix::Static);
    }

    #[test]
    fn spm_and_target_suffixes() {
        assert_eq!(Fact::spm("App", "Alamofire").suffix(), Suffix::Spm);
        assert_eq!(Fact::target("App", "Core.framework").suffix(), Suffix::None);
    }

    #[test]
    fn canonical_destination_strips_path_and_extension() {
        let fact = Fact::library("App", "Frameworks/Alamofire.framework");
        assert_eq!(fact.canonical_destination(), "Alamofire");

        let fact = Fact::library("App", "libz.tbd");
        assert_eq!(fact.canonical_destination(), "libz");

        // a bare extension is kept rather than producing an empty identity
        let fact = Fact::library("App", ".a");
        assert_eq!(fact.canonical_destination(), ".a");

        let fact = Fact::target("App", "  Core.framework ");
        assert_eq!(fact.canonical_destination(), "Core.framework");
    }

    #[test]
    fn system_detection_from_path_and_source_tree() {
        let sdk = Fact::library("App", "UIKit.framework")
            .with_path("System/Library/Frameworks/UIKit.framework");
        assert!(sdk.is_system());
        assert_eq!(sdk.destination_kind(), NodeKind::SystemFramework);

        let usr_lib = Fact::library("App", "libz.tbd").with_path("/usr/lib/libz.tbd");
        assert!(usr_lib.is_system());

        let tree = Fact::library("App", "XCTest.framework").with_source_tree("DEVELOPER_DIR");
        assert!(tree.is_system());

        let vendored = Fact::library("App", "Alamofire.framework")
            .with_path("Carthage/Build/iOS/Alamofire.framework")
            .with_source_tree("<group>");
        assert!(!vendored.is_system());
        assert_eq!(vendored.destination_kind(), NodeKind::ThirdPartyFramework);
    }

    #[test]
    fn normalize_token_adds_dot() {
        assert_eq!(Suffix::normalize_token("A"), Some(".a".to_string()));
        assert_eq!(Suffix::normalize_token(".Framework"), Some(".framework".to_string()));
        assert_eq!(Suffix::normalize_token("SPM"), Some("spm".to_string()));
        assert_eq!(Suffix::normalize_token("  "), None);
    }

    #[test]
    fn facts_round_trip_through_json_with_defaults() {
        let json = r#"{"source":"App","destination":"Core","kind":"target"}"#;
        let fact: Fact = serde_json::from_str(json).expect("parse fact");
        assert_eq!(fact, Fact::target("App", "Core"));
        assert!(!fact.self_loop_valid);

        let encoded = serde_json::to_string(&Fact::spm("App", "Alamofire")).expect("encode");
        assert!(encoded.contains(r#""kind":"spm_product""#));
        assert!(!encoded.contains("path"));
    }
}
