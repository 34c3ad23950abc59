//! Command implementations.

pub mod completions;
pub mod embeddings;
pub mod launcher;
pub mod version;
