//! Local embedding function backed by Model2Vec static embeddings.
//!
//! Runs entirely in-process: the model is fetched from the Hugging Face Hub
//! (or read from a local directory) on first use and kept in memory for the
//! lifetime of the function. Model2Vec averages pre-computed token vectors
//! instead of running transformer inference, so encoding is fast enough to
//! run on the blocking pool without batching concerns.

use crate::error::{Error, Result};
use model2vec_rs::model::StaticModel;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::function::EmbeddingFunction;
use super::http::{check_batch_size, ensure_aligned};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "local";

pub const DEFAULT_LOCAL_MODEL: &str = "minishlab/potion-base-8M";

/// Local model configuration.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Hub repository id or path to a model directory.
    pub model: String,
    /// Token for gated Hub repositories.
    pub token: Option<String>,
    pub normalize: Option<bool>,
    pub max_batch_size: Option<usize>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LOCAL_MODEL.to_string(),
            token: None,
            normalize: None,
            max_batch_size: None,
        }
    }
}

impl LocalConfig {
    #[must_use]
    pub fn from_settings(settings: ProviderSettings) -> Self {
        let normalize = settings.extra.get("normalize").and_then(serde_json::Value::as_bool);
        Self {
            model: settings.model.unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            token: settings.api_key,
            normalize,
            max_batch_size: settings.max_batch_size,
        }
    }
}

/// Local embedding function.
pub struct LocalEmbeddingFunction {
    config: LocalConfig,
    model: OnceCell<Arc<StaticModel>>,
}

impl LocalEmbeddingFunction {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// Load the model now instead of on the first `generate` call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the model cannot be fetched or parsed.
    pub async fn init(&self) -> Result<()> {
        self.model().await.map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<&Arc<StaticModel>> {
        self.model
            .get_or_try_init(|| async {
                let config = self.config.clone();
                info!(model = %config.model, "Loading local embedding model");

                let loaded = tokio::task::spawn_blocking(move || {
                    StaticModel::from_pretrained(&config.model, config.token.as_deref(), config.normalize, None)
                        .map_err(|e| e.to_string())
                })
                .await
                .map_err(|e| Error::ModelLoad {
                    model: self.config.model.clone(),
                    message: e.to_string(),
                })?
                .map_err(|message| Error::ModelLoad {
                    model: self.config.model.clone(),
                    message,
                })?;

                Ok(Arc::new(loaded))
            })
            .await
    }
}

impl EmbeddingFunction for LocalEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: known_dimensions(ProviderKind::Local, &self.config.model),
            max_batch_size: self.config.max_batch_size,
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), self.config.max_batch_size)?;

        let model = Arc::clone(self.model().await?);
        let sentences: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();
        debug!(count = sentences.len(), "Encoding locally");

        let vectors = tokio::task::spawn_blocking(move || model.encode(&sentences))
            .await
            .map_err(|e| Error::Other(format!("local encoding task failed: {e}")))?;

        ensure_aligned(PROVIDER, texts.len(), vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_map_to_config() {
        let mut settings = ProviderSettings {
            model: Some("minishlab/potion-base-32M".into()),
            ..Default::default()
        };
        settings.extra.insert("normalize".into(), json!(false));

        let config = LocalConfig::from_settings(settings);
        assert_eq!(config.model, "minishlab/potion-base-32M");
        assert_eq!(config.normalize, Some(false));
    }

    #[tokio::test]
    async fn test_empty_input_does_not_load_model() {
        let function = LocalEmbeddingFunction::new(LocalConfig::default());
        assert!(function.generate(&[]).await.unwrap().is_empty());
        assert!(!function.is_loaded());
        assert_eq!(function.info().dimensions, Some(256));
    }

    #[tokio::test]
    async fn test_missing_model_directory_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-model");
        let function = LocalEmbeddingFunction::new(LocalConfig {
            model: missing.to_string_lossy().into_owned(),
            ..Default::default()
        });

        let err = function.generate(&["hello"]).await.unwrap_err();
        assert!(matches!(err, Error::ModelLoad { .. }), "got: {err:?}");
        assert!(!function.is_loaded());
    }

    #[tokio::test]
    async fn test_init_failure_leaves_model_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-model");
        let function = LocalEmbeddingFunction::new(LocalConfig {
            model: missing.to_string_lossy().into_owned(),
            ..Default::default()
        });

        let err = function.init().await.unwrap_err();
        assert!(matches!(&err, Error::ModelLoad { model, .. } if *model == function.config.model), "got: {err:?}");
        assert!(!function.is_loaded());

        // A failed load is retried rather than cached.
        assert!(function.init().await.is_err());
        assert!(!function.is_loaded());
    }
}
