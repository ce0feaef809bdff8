//! Analysis configuration: raw serde structs plus their validated form.
//!
//! ```toml
//! fail_on_cycles = true
//!
//! [filter]
//! exclude_target = ["Tests$"]
//! collapse_suffix = [".a"]
//!
//! [split]
//! max = 10
//!
//! [render]
//! rankdir = "TB"
//! colors = { edge_cycle = "#d70015" }
//!
//! [views]
//! framework_views = true
//! ```

use serde::{Deserialize, Serialize};

use crate::attrs::{RenderConfig, RenderOptions};
use crate::error::ConfigError;
use crate::filter::{CompiledFilter, FilterConfig};
use crate::split::SplitOptions;

const fn default_true() -> bool {
    true
}

/// Which outputs an analysis produces. Flags compose freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSelection {
    #[serde(default = "default_true")]
    pub full_graph: bool,
    #[serde(default)]
    pub cycle_graph: bool,
    #[serde(default)]
    pub framework_views: bool,
}

impl Default for ViewSelection {
    fn default() -> Self {
        Self {
            full_graph: default_true(),
            cycle_graph: false,
            framework_views: false,
        }
    }
}

impl ViewSelection {
    #[must_use]
    pub const fn any(self) -> bool {
        self.full_graph || self.cycle_graph || self.framework_views
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::NoViewSelected`] when every flag is off.
    pub const fn validate(self) -> Result<(), ConfigError> {
        if self.any() {
            Ok(())
        } else {
            Err(ConfigError::NoViewSelected)
        }
    }
}

/// Everything an analysis run needs besides the facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub split: SplitOptions,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub views: ViewSelection,
    #[serde(default)]
    pub fail_on_cycles: bool,
}

impl AnalysisConfig {
    /// Parse a TOML document. Validation happens in [`Self::compile`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown types.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Validate every option and compile patterns.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: view selection, then
    /// patterns and suffixes, then render options.
    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        self.views.validate()?;
        Ok(CompiledConfig {
            filter: self.filter.compile()?,
            split: self.split.clone(),
            render: self.render.compile()?,
            views: self.views,
            fail_on_cycles: self.fail_on_cycles,
        })
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub filter: CompiledFilter,
    pub split: SplitOptions,
    pub render: RenderOptions,
    pub views: ViewSelection,
    pub fail_on_cycles: bool,
}
