//! xcdeps-core: the dependency graph engine behind `xcdeps`.
//!
//! Facts go in, an annotated graph and its reports come out:
//!
//! ```text
//! Fact ─► filter ─► graph::build ─► graph::cycles ─► attrs ─► export::{dot,json,summary}
//!                                                      └───► split ─► export::dot
//! ```
//!
//! The crate does no file or process I/O.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums ([`ConfigError`], [`GraphError`],
//!   [`AnalysisError`]) with stable [`ErrorCode`]s. Bad input facts are
//!   warnings, not errors.
//! - **Logging**: `tracing` macros; `#[instrument]` on pipeline stages.

#![forbid(unsafe_code)]

pub mod analysis;
pub mod attrs;
pub mod config;
pub mod error;
pub mod export;
pub mod fact;
pub mod filter;
pub mod graph;
pub mod split;

pub use analysis::{Analysis, ExitStatus, Summary};
pub use config::{AnalysisConfig, CompiledConfig, ViewSelection};
pub use error::{AnalysisError, ConfigError, ErrorCode, GraphError};
pub use fact::{DependencyKind, Fact, Suffix};
pub use filter::FilterConfig;
pub use graph::{DependencyGraph, FactWarning, NodeId, NodeKind};
