//! OpenAI embedding function.
//!
//! Also works with OpenAI-compatible servers via `OPENAI_BASE_URL`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, join_url, post_json, sort_by_index, IndexedEmbedding, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "openai";

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
/// The embeddings endpoint accepts at most 2048 inputs.
pub const OPENAI_MAX_BATCH_SIZE: usize = 2048;

/// OpenAI configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub dimensions: Option<usize>,
    pub max_batch_size: usize,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            dimensions: None,
            max_batch_size: OPENAI_MAX_BATCH_SIZE,
            headers: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if no API key is set.
    pub fn from_settings(settings: ProviderSettings) -> Result<Self> {
        let api_key = settings.api_key.ok_or(Error::MissingCredential {
            provider: PROVIDER,
            env: api_key_env(ProviderKind::OpenAi),
        })?;

        Ok(Self {
            api_key,
            model: settings.model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            endpoint: settings.endpoint.unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            dimensions: settings.dimensions,
            max_batch_size: settings.max_batch_size.unwrap_or(OPENAI_MAX_BATCH_SIZE),
            headers: settings.headers,
            extra: settings.extra,
        })
    }
}

/// OpenAI embedding function.
pub struct OpenAiEmbeddingFunction {
    config: OpenAiConfig,
    client: LazyClient,
}

impl OpenAiEmbeddingFunction {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = LazyClient::bearer(PROVIDER, &config.api_key, &config.headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiEmbedRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'static str,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<IndexedEmbedding>,
}

impl EmbeddingFunction for OpenAiEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: self
                .config
                .dimensions
                .or_else(|| known_dimensions(ProviderKind::OpenAi, &self.config.model)),
            max_batch_size: Some(self.config.max_batch_size),
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), Some(self.config.max_batch_size))?;

        let client = self.client.get().await?;
        let url = join_url(&self.config.endpoint, "/embeddings");
        let request = OpenAiEmbedRequest {
            input: texts,
            model: &self.config.model,
            dimensions: self.config.dimensions,
            encoding_format: "float",
            extra: &self.config.extra,
        };

        let response: OpenAiEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
        sort_by_index(PROVIDER, texts.len(), response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma_error::ChromaErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_with_dimensions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({
                "model": "text-embedding-3-small",
                "dimensions": 2,
                "encoding_format": "float"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = OpenAiConfig::new("sk").with_endpoint(server.uri());
        config.dimensions = Some(2);
        let vectors = OpenAiEmbeddingFunction::new(config)
            .generate(&["x", "y"])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })))
            .mount(&server)
            .await;

        let err = OpenAiEmbeddingFunction::new(OpenAiConfig::new("sk").with_endpoint(server.uri()))
            .generate(&["x"])
            .await
            .unwrap_err();
        match err {
            Error::Provider { source, .. } => assert_eq!(source.kind(), ChromaErrorKind::RateLimit),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
