//! Serialization of diff results.
//!
//! [`json::export_json`] writes a [`ProjectDiff`](crate::ProjectDiff) as is,
//! with nodes as `{file, node}` indices. [`json::export_annotated_json`]
//! resolves every node against its snapshot so a viewer needs nothing else.

pub mod json;

pub use json::{export_annotated_json, export_json};
