//! Embedding functions.
//!
//! Every provider adapter implements [`EmbeddingFunction`]: text in, one
//! vector per text out, in input order.
//!
//! - **Remote**: Bedrock, Cohere, Jina, Google Generative AI, Cloudflare
//!   Workers AI, OpenAI, HuggingFace, Ollama
//! - **Local**: Model2Vec static embeddings (feature `local`)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  CLI / caller    │
//! └────────┬─────────┘
//!          │ ProviderKind + ProviderSettings
//!          ▼
//! ┌─────────────────┐
//! │    Registry     │  ← explicit → env → config file → default
//! └────────┬────────┘
//!          │ BoxedEmbeddingFunction
//!     ┌────┴─────┬──────────┐
//!     ▼          ▼          ▼
//! ┌────────┐ ┌────────┐ ┌───────┐
//! │ Remote │ │ Ollama │ │ Local │
//! └────────┘ └────────┘ └───────┘
//!     │          │          │
//!   HTTPS     HTTP      in-process
//! ```
//!
//! Clients and models are created on first `generate`, once per function.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chroma::embeddings::{create_from_config, get_embedding_settings, config_path, ProviderKind};
//!
//! let file = get_embedding_settings(&config_path()?)?;
//! let function = create_from_config(Some(ProviderKind::Jina), Default::default(), &file)?;
//! let vectors = function.generate(&["Hello world"]).await?;
//! println!("Dimensions: {}", vectors[0].len());
//! ```

pub mod bedrock;
pub mod cloudflare;
pub mod cohere;
pub mod config;
pub mod function;
pub mod google;
mod http;
pub mod huggingface;
pub mod jina;
#[cfg(feature = "local")]
pub mod local;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod types;

// Re-exports for convenience
pub use bedrock::{BedrockConfig, BedrockEmbeddingFunction};
pub use cloudflare::{CloudflareConfig, CloudflareEmbeddingFunction};
pub use cohere::{CohereConfig, CohereEmbeddingFunction};
pub use config::{
    config_path, get_embedding_settings, reset_embedding_settings, resolve_settings, save_provider_settings,
};
pub use function::{BoxedEmbeddingFunction, EmbeddingFunction};
pub use google::{GoogleConfig, GoogleEmbeddingFunction};
pub use huggingface::{HuggingFaceConfig, HuggingFaceEmbeddingFunction};
pub use jina::{JinaConfig, JinaEmbeddingFunction};
#[cfg(feature = "local")]
pub use local::{LocalConfig, LocalEmbeddingFunction};
pub use ollama::{OllamaConfig, OllamaEmbeddingFunction};
pub use openai::{OpenAiConfig, OpenAiEmbeddingFunction};
pub use registry::{catalog, check_servers, create_embedding_function, create_from_config, select_provider, ProviderStatus};
pub use types::{ChromaConfig, EmbeddingSettings, ProviderInfo, ProviderKind, ProviderSettings};
