//! Google Generative AI (Gemini) embedding function.
//!
//! Uses `models/{model}:batchEmbedContents` so a whole batch is one call.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, ensure_aligned, join_url, post_json, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "google";

pub const DEFAULT_GOOGLE_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GOOGLE_MODEL: &str = "text-embedding-004";
/// `batchEmbedContents` accepts at most 100 requests.
pub const GOOGLE_MAX_BATCH_SIZE: usize = 100;

/// Google Generative AI configuration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: String,
    /// Model name, with or without the `models/` prefix.
    pub model: String,
    pub endpoint: String,
    /// e.g. `RETRIEVAL_DOCUMENT`, `SEMANTIC_SIMILARITY`
    pub task_type: Option<String>,
    pub dimensions: Option<usize>,
    pub max_batch_size: usize,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GoogleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GOOGLE_MODEL.to_string(),
            endpoint: DEFAULT_GOOGLE_ENDPOINT.to_string(),
            task_type: None,
            dimensions: None,
            max_batch_size: GOOGLE_MAX_BATCH_SIZE,
            headers: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
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
            env: api_key_env(ProviderKind::Google),
        })?;

        Ok(Self {
            api_key,
            model: settings.model.unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_string()),
            endpoint: settings.endpoint.unwrap_or_else(|| DEFAULT_GOOGLE_ENDPOINT.to_string()),
            task_type: settings.task,
            dimensions: settings.dimensions,
            max_batch_size: settings.max_batch_size.unwrap_or(GOOGLE_MAX_BATCH_SIZE),
            headers: settings.headers,
            extra: settings.extra,
        })
    }

    /// Model name without the `models/` prefix.
    fn model_id(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }
}

/// Google Generative AI embedding function.
pub struct GoogleEmbeddingFunction {
    config: GoogleConfig,
    client: LazyClient,
}

impl GoogleEmbeddingFunction {
    pub fn new(config: GoogleConfig) -> Self {
        let mut headers = vec![("x-goog-api-key".to_string(), config.api_key.clone())];
        headers.extend(config.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        let client = LazyClient::new(PROVIDER, headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl EmbeddingFunction for GoogleEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model_id().to_string(),
            dimensions: self
                .config
                .dimensions
                .or_else(|| known_dimensions(ProviderKind::Google, self.config.model_id())),
            max_batch_size: Some(self.config.max_batch_size),
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), Some(self.config.max_batch_size))?;

        let client = self.client.get().await?;
        let model_id = self.config.model_id();
        let url = join_url(
            &self.config.endpoint,
            &format!("/v1beta/models/{model_id}:batchEmbedContents"),
        );
        let qualified = format!("models/{model_id}");

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: &qualified,
                    content: Content {
                        parts: [Part { text }],
                    },
                    task_type: self.config.task_type.as_deref(),
                    output_dimensionality: self.config.dimensions,
                    extra: &self.config.extra,
                })
                .collect(),
        };

        let response: BatchEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
        let vectors = response.embeddings.into_iter().map(|e| e.values).collect();
        ensure_aligned(PROVIDER, texts.len(), vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_batch_embed_contents_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:batchEmbedContents"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({
                "requests": [
                    {
                        "model": "models/text-embedding-004",
                        "content": {"parts": [{"text": "first"}]},
                        "taskType": "RETRIEVAL_DOCUMENT"
                    },
                    {
                        "model": "models/text-embedding-004",
                        "content": {"parts": [{"text": "second"}]},
                        "taskType": "RETRIEVAL_DOCUMENT"
                    }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [{"values": [1.0, 0.0]}, {"values": [0.0, 1.0]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = GoogleConfig::new("g-key")
            .with_endpoint(server.uri())
            .with_task_type("RETRIEVAL_DOCUMENT");
        let vectors = GoogleEmbeddingFunction::new(config)
            .generate(&["first", "second"])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_model_prefix_is_normalized() {
        let mut config = GoogleConfig::new("k");
        config.model = "models/text-embedding-004".into();
        assert_eq!(config.model_id(), "text-embedding-004");
        assert_eq!(GoogleEmbeddingFunction::new(config).info().dimensions, Some(768));
    }
}
