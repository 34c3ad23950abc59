//! Embedding function trait.
//!
//! Defines the interface every provider adapter implements.
//! Uses async methods for HTTP-based providers.

use crate::error::{Error, Result};
use super::types::ProviderInfo;

/// Trait for embedding functions.
///
/// `generate` returns one vector per input text, in input order.
pub trait EmbeddingFunction: Send + Sync {
    /// Get adapter metadata.
    fn info(&self) -> ProviderInfo;

    /// Generate embeddings for a batch of texts.
    fn generate(&self, texts: &[&str]) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Generate the embedding for a single text.
    ///
    /// Default implementation sends a batch of one.
    fn generate_one(&self, text: &str) -> impl std::future::Future<Output = Result<Vec<f32>>> + Send {
        async move {
            let batch = [text];
            self.generate(&batch)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| Error::InvalidResponse {
                    provider: "embedding function",
                    message: "no embedding returned".into(),
                })
        }
    }
}

/// Boxed embedding function for dynamic dispatch.
///
/// Since the trait has async methods with `impl Future`, we need this wrapper
/// for runtime polymorphism.
pub struct BoxedEmbeddingFunction {
    inner: Box<dyn EmbeddingFunctionBoxed + Send + Sync>,
}

impl std::fmt::Debug for BoxedEmbeddingFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEmbeddingFunction").finish_non_exhaustive()
    }
}

/// Object-safe version of `EmbeddingFunction` for boxing.
pub trait EmbeddingFunctionBoxed: Send + Sync {
    fn info(&self) -> ProviderInfo;
    fn generate_boxed(&self, texts: &[&str]) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send + '_>>;
}

impl BoxedEmbeddingFunction {
    /// Create a new boxed embedding function.
    pub fn new<F: EmbeddingFunction + 'static>(function: F) -> Self {
        Self {
            inner: Box::new(BoxedWrapper(function)),
        }
    }

    /// Get adapter metadata.
    pub fn info(&self) -> ProviderInfo {
        self.inner.info()
    }

    /// Generate embeddings for a batch of texts.
    pub async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.inner.generate_boxed(texts).await
    }
}

impl EmbeddingFunction for BoxedEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        self.inner.info()
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.inner.generate_boxed(texts).await
    }
}

/// Wrapper to implement `EmbeddingFunctionBoxed` for any `EmbeddingFunction`.
struct BoxedWrapper<F: EmbeddingFunction + 'static>(F);

impl<F: EmbeddingFunction + 'static> EmbeddingFunctionBoxed for BoxedWrapper<F> {
    fn info(&self) -> ProviderInfo {
        self.0.info()
    }

    fn generate_boxed(&self, texts: &[&str]) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send + '_>> {
        // Own the texts so the future only borrows `self`.
        let texts_owned: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();
        Box::pin(async move {
            let refs: Vec<&str> = texts_owned.iter().map(String::as_str).collect();
            self.0.generate(&refs).await
        })
    }
}
