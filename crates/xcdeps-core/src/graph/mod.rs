//! Dependency graph construction and cycle detection.
//!
//! ```text
//! ResolvedFact ─► GraphBuilder ─► DependencyGraph ─► detect_cycles ─► CycleSet
//! ```
//!
//! - [`types`]: node/edge identities and node weights.
//! - [`build`]: the builder, the read-only graph, fact warnings.
//! - [`cycles`]: Tarjan SCC cycle enumeration.

pub mod build;
pub mod cycles;
pub mod types;

pub use build::{BuildOutput, DependencyGraph, Edge, FactWarning, GraphBuilder};
pub use cycles::{CycleSet, detect_cycles};
pub use types::{EdgeKind, Node, NodeId, NodeKind};
