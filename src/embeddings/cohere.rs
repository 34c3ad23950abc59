//! Cohere embedding function.
//!
//! Calls `POST /v1/embed`. v3 models require an `input_type`; documents are
//! embedded as `search_document` unless the task says otherwise.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, ensure_aligned, join_url, post_json, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "cohere";

pub const DEFAULT_COHERE_ENDPOINT: &str = "https://api.cohere.com";
pub const DEFAULT_COHERE_MODEL: &str = "embed-english-v3.0";
pub const DEFAULT_COHERE_INPUT_TYPE: &str = "search_document";
/// Cohere accepts at most 96 texts per call.
pub const COHERE_MAX_BATCH_SIZE: usize = 96;

/// Cohere configuration.
#[derive(Debug, Clone)]
pub struct CohereConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub input_type: String,
    pub max_batch_size: usize,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CohereConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_COHERE_MODEL.to_string(),
            endpoint: DEFAULT_COHERE_ENDPOINT.to_string(),
            input_type: DEFAULT_COHERE_INPUT_TYPE.to_string(),
            max_batch_size: COHERE_MAX_BATCH_SIZE,
            headers: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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
            env: api_key_env(ProviderKind::Cohere),
        })?;

        Ok(Self {
            api_key,
            model: settings.model.unwrap_or_else(|| DEFAULT_COHERE_MODEL.to_string()),
            endpoint: settings.endpoint.unwrap_or_else(|| DEFAULT_COHERE_ENDPOINT.to_string()),
            input_type: settings.task.unwrap_or_else(|| DEFAULT_COHERE_INPUT_TYPE.to_string()),
            max_batch_size: settings.max_batch_size.unwrap_or(COHERE_MAX_BATCH_SIZE),
            headers: settings.headers,
            extra: settings.extra,
        })
    }
}

/// Cohere embedding function.
pub struct CohereEmbeddingFunction {
    config: CohereConfig,
    client: LazyClient,
}

impl CohereEmbeddingFunction {
    pub fn new(config: CohereConfig) -> Self {
        let client = LazyClient::bearer(PROVIDER, &config.api_key, &config.headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct CohereEmbedRequest<'a> {
    texts: &'a [&'a str],
    model: &'a str,
    input_type: &'a str,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CohereEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingFunction for CohereEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: known_dimensions(ProviderKind::Cohere, &self.config.model),
            max_batch_size: Some(self.config.max_batch_size),
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), Some(self.config.max_batch_size))?;

        let client = self.client.get().await?;
        let url = join_url(&self.config.endpoint, "/v1/embed");
        let request = CohereEmbedRequest {
            texts,
            model: &self.config.model,
            input_type: &self.config.input_type,
            extra: &self.config.extra,
        };

        let response: CohereEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
        ensure_aligned(PROVIDER, texts.len(), response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_sends_input_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embed"))
            .and(header("authorization", "Bearer co-key"))
            .and(body_partial_json(json!({
                "texts": ["hello", "world"],
                "model": "embed-english-v3.0",
                "input_type": "search_document"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc",
                "embeddings": [[0.1, 0.2], [0.3, 0.4]],
                "texts": ["hello", "world"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cohere = CohereEmbeddingFunction::new(CohereConfig::new("co-key").with_endpoint(server.uri()));
        let vectors = cohere.generate(&["hello", "world"]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn test_batch_limit_checked_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = CohereConfig::new("k").with_endpoint(server.uri());
        config.max_batch_size = 1;
        let err = CohereEmbeddingFunction::new(config)
            .generate(&["a", "b"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BatchTooLarge { actual: 2, max: 1, .. }));
    }

    #[test]
    fn test_task_maps_to_input_type() {
        let config = CohereConfig::from_settings(ProviderSettings {
            api_key: Some("k".into()),
            task: Some("search_query".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.input_type, "search_query");
        assert_eq!(config.max_batch_size, COHERE_MAX_BATCH_SIZE);
    }
}
