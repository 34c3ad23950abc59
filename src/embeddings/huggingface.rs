//! HuggingFace Inference API embedding function.
//!
//! Uses HuggingFace's hosted feature-extraction pipeline.
//! Requires a HuggingFace API token (`HF_TOKEN`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, ensure_aligned, join_url, post_json, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "huggingface";

pub const DEFAULT_HF_ENDPOINT: &str = "https://router.huggingface.co/hf-inference";
pub const DEFAULT_HF_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// HuggingFace configuration.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub token: String,
    pub model: String,
    pub endpoint: String,
    pub max_batch_size: Option<usize>,
    pub headers: BTreeMap<String, String>,
}

impl HuggingFaceConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            model: DEFAULT_HF_MODEL.to_string(),
            endpoint: DEFAULT_HF_ENDPOINT.to_string(),
            max_batch_size: None,
            headers: BTreeMap::new(),
        }
    }

    /// Build from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if no token is set.
    pub fn from_settings(settings: ProviderSettings) -> Result<Self> {
        let token = settings.api_key.ok_or(Error::MissingCredential {
            provider: PROVIDER,
            env: api_key_env(ProviderKind::Huggingface),
        })?;

        Ok(Self {
            token,
            model: settings.model.unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
            endpoint: settings.endpoint.unwrap_or_else(|| DEFAULT_HF_ENDPOINT.to_string()),
            max_batch_size: settings.max_batch_size,
            headers: settings.headers,
        })
    }
}

/// HuggingFace Inference API embedding function.
pub struct HuggingFaceEmbeddingFunction {
    config: HuggingFaceConfig,
    client: LazyClient,
}

impl HuggingFaceEmbeddingFunction {
    pub fn new(config: HuggingFaceConfig) -> Self {
        let client = LazyClient::bearer(PROVIDER, &config.token, &config.headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct HfEmbedRequest<'a> {
    inputs: &'a [&'a str],
    options: HfOptions,
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

/// Feature-extraction output shape depends on the model.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfEmbedResponse {
    /// Pooled: one vector per input
    Pooled(Vec<Vec<f32>>),
    /// Token-level: `[[embedding]]` per input, first row taken
    Nested(Vec<Vec<Vec<f32>>>),
}

impl EmbeddingFunction for HuggingFaceEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: known_dimensions(ProviderKind::Huggingface, &self.config.model),
            max_batch_size: self.config.max_batch_size,
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), self.config.max_batch_size)?;

        let client = self.client.get().await?;
        let url = join_url(
            &self.config.endpoint,
            &format!("/models/{}/pipeline/feature-extraction", self.config.model),
        );
        let request = HfEmbedRequest {
            inputs: texts,
            options: HfOptions { wait_for_model: true },
        };

        let response: HfEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
        let vectors = match response {
            HfEmbedResponse::Pooled(vectors) => vectors,
            HfEmbedResponse::Nested(batch) => batch
                .into_iter()
                .filter_map(|nested| nested.into_iter().next())
                .collect(),
        };
        ensure_aligned(PROVIDER, texts.len(), vectors)
    }
}
