//! Exporters. Each one reads an [`Analysis`](crate::analysis::Analysis) and
//! returns a string or a serializable struct; none of them touch the
//! filesystem.

pub mod dot;
pub mod json;
pub mod summary;
