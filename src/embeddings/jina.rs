//! Jina AI embedding function.
//!
//! Calls `POST /v1/embeddings`. Jina tags each result with the index of its
//! input, so results are re-sorted before being returned.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, join_url, post_json, sort_by_index, IndexedEmbedding, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "jina";

pub const DEFAULT_JINA_ENDPOINT: &str = "https://api.jina.ai";
pub const DEFAULT_JINA_MODEL: &str = "jina-embeddings-v3";

/// Jina configuration.
#[derive(Debug, Clone)]
pub struct JinaConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub dimensions: Option<usize>,
    /// e.g. `retrieval.passage`, `text-matching`
    pub task: Option<String>,
    pub max_batch_size: Option<usize>,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl JinaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_JINA_MODEL.to_string(),
            endpoint: DEFAULT_JINA_ENDPOINT.to_string(),
            dimensions: None,
            task: None,
            max_batch_size: None,
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

    #[must_use]
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
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
            env: api_key_env(ProviderKind::Jina),
        })?;

        Ok(Self {
            api_key,
            model: settings.model.unwrap_or_else(|| DEFAULT_JINA_MODEL.to_string()),
            endpoint: settings.endpoint.unwrap_or_else(|| DEFAULT_JINA_ENDPOINT.to_string()),
            dimensions: settings.dimensions,
            task: settings.task,
            max_batch_size: settings.max_batch_size,
            headers: settings.headers,
            extra: settings.extra,
        })
    }
}

/// Jina embedding function.
pub struct JinaEmbeddingFunction {
    config: JinaConfig,
    client: LazyClient,
}

impl JinaEmbeddingFunction {
    pub fn new(config: JinaConfig) -> Self {
        let client = LazyClient::bearer(PROVIDER, &config.api_key, &config.headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct JinaEmbedRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a str>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct JinaEmbedResponse {
    data: Vec<IndexedEmbedding>,
}

impl EmbeddingFunction for JinaEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: self
                .config
                .dimensions
                .or_else(|| known_dimensions(ProviderKind::Jina, &self.config.model)),
            max_batch_size: self.config.max_batch_size,
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), self.config.max_batch_size)?;

        let client = self.client.get().await?;
        let url = join_url(&self.config.endpoint, "/v1/embeddings");
        let request = JinaEmbedRequest {
            input: texts,
            model: &self.config.model,
            dimensions: self.config.dimensions,
            task: self.config.task.as_deref(),
            extra: &self.config.extra,
        };

        let response: JinaEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
        sort_by_index(PROVIDER, texts.len(), response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma_error::ChromaErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn function(server: &MockServer) -> JinaEmbeddingFunction {
        JinaEmbeddingFunction::new(JinaConfig::new("test-key").with_endpoint(server.uri()))
    }

    #[tokio::test]
    async fn test_generate_restores_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "jina-embeddings-v3",
                "input": ["a", "b", "c"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "jina-embeddings-v3",
                "data": [
                    {"object": "embedding", "index": 2, "embedding": [0.3, 0.3]},
                    {"object": "embedding", "index": 0, "embedding": [0.1, 0.1]},
                    {"object": "embedding", "index": 1, "embedding": [0.2, 0.2]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vectors = function(&server).generate(&["a", "b", "c"]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.1, 0.1], vec![0.2, 0.2], vec![0.3, 0.3]]);
    }

    #[tokio::test]
    async fn test_task_and_extra_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"task": "retrieval.query", "late_chunking": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = JinaConfig::new("k")
            .with_endpoint(server.uri())
            .with_task("retrieval.query");
        config.extra.insert("late_chunking".into(), json!(true));

        let vectors = JinaEmbeddingFunction::new(config).generate(&["q"]).await.unwrap();
        assert_eq!(vectors.len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = function(&server).generate(&["a"]).await.unwrap_err();
        match err {
            Error::Provider { provider, source } => {
                assert_eq!(provider, "jina");
                assert_eq!(source.kind(), ChromaErrorKind::Unauthorized);
                assert_eq!(source.message(), "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_short_response_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let err = function(&server).generate(&["a", "b"]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_empty_input_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let jina = function(&server);
        assert!(jina.generate(&[]).await.unwrap().is_empty());
        assert!(!jina.client.is_initialized());
    }

    #[test]
    fn test_from_settings_requires_key() {
        let err = JinaConfig::from_settings(ProviderSettings::default()).unwrap_err();
        assert!(err.to_string().contains("JINA_API_KEY"));
    }
}
