//! Ollama embedding function.
//!
//! Uses a local Ollama server for embedding generation. No credentials
//! required.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::function::EmbeddingFunction;
use super::http::{check_batch_size, ensure_aligned, join_url, post_json, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "ollama";

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

/// Ollama configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub max_batch_size: Option<usize>,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            max_batch_size: None,
            headers: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl OllamaConfig {
    #[must_use]
    pub fn from_settings(settings: ProviderSettings) -> Self {
        Self {
            endpoint: settings.endpoint.unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
            model: settings.model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            max_batch_size: settings.max_batch_size,
            headers: settings.headers,
            extra: settings.extra,
        }
    }
}

/// Ollama embedding function.
pub struct OllamaEmbeddingFunction {
    config: OllamaConfig,
    client: LazyClient,
}

impl OllamaEmbeddingFunction {
    pub fn new(config: OllamaConfig) -> Self {
        let headers = config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let client = LazyClient::new(PROVIDER, headers);
        Self { config, client }
    }

    /// Check whether the server is up and has the configured model pulled.
    pub async fn is_available(&self) -> bool {
        let Ok(client) = self.client.get().await else {
            return false;
        };
        let url = join_url(&self.config.endpoint, "/api/tags");

        let response = match client.get(&url).timeout(Duration::from_secs(2)).send().await {
            Ok(r) if r.status().is_success() => r,
            _ => return false,
        };

        let Ok(data) = response.json::<OllamaTagsResponse>().await else {
            return false;
        };

        let prefix = format!("{}:", self.config.model);
        data.models.is_some_and(|models| {
            models
                .iter()
                .any(|m| m.name == self.config.model || m.name.starts_with(&prefix))
        })
    }
}

/// Ollama API response for listing models.
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Option<Vec<OllamaModel>>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingFunction for OllamaEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: known_dimensions(ProviderKind::Ollama, &self.config.model),
            max_batch_size: self.config.max_batch_size,
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), self.config.max_batch_size)?;

        let client = self.client.get().await?;
        let url = join_url(&self.config.endpoint, "/api/embed");
        let request = OllamaEmbedRequest {
            model: &self.config.model,
            input: texts,
            extra: &self.config.extra,
        };

        let response: OllamaEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
        ensure_aligned(PROVIDER, texts.len(), response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn function(server: &MockServer) -> OllamaEmbeddingFunction {
        OllamaEmbeddingFunction::new(OllamaConfig {
            endpoint: server.uri(),
            ..Default::default()
        })
    }

    #[test]
    fn test_ollama_custom_config() {
        let function = OllamaEmbeddingFunction::new(OllamaConfig::from_settings(ProviderSettings {
            endpoint: Some("http://custom:11434".into()),
            model: Some("mxbai-embed-large".into()),
            ..Default::default()
        }));
        let info = function.info();
        assert_eq!(info.model, "mxbai-embed-large");
        assert_eq!(info.dimensions, Some(1024));
    }

    #[tokio::test]
    async fn test_generate_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_json(json!({"model": "nomic-embed-text", "input": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "nomic-embed-text",
                "embeddings": [[0.1], [0.2]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vectors = function(&server).generate(&["a", "b"]).await.unwrap();
        assert_eq!(vectors, vec![vec![0.1], vec![0.2]]);
    }

    #[tokio::test]
    async fn test_is_available_matches_tagged_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "nomic-embed-text:latest"}]
            })))
            .mount(&server)
            .await;

        assert!(function(&server).is_available().await);
    }

    #[tokio::test]
    async fn test_is_available_false_when_model_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&server)
            .await;

        assert!(!function(&server).is_available().await);
    }
}
