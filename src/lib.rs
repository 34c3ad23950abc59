//! Chroma embedding functions and CLI launcher.
//!
//! # Architecture
//!
//! - [`embeddings`] - Embedding function trait, provider adapters, registry
//! - [`launcher`] - Locate, install, and run the native Chroma CLI
//! - [`chroma_error`] - Typed errors for Chroma API failures
//! - [`cli`] - `chroma-embed` command-line interface using clap
//! - [`error`] - Crate error type, exit codes, hints

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chroma_error;
pub mod cli;
pub mod embeddings;
pub mod error;
pub mod launcher;

pub use chroma_error::{create_error_by_type, ChromaError, ChromaErrorKind};
pub use embeddings::{BoxedEmbeddingFunction, EmbeddingFunction};
pub use error::{Error, Result};
