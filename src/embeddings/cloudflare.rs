//! Cloudflare Workers AI embedding function.
//!
//! Runs a Workers AI text-embedding model either directly against the
//! Cloudflare API or through an AI Gateway when a gateway id is configured.

use crate::chroma_error::ChromaError;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, ensure_aligned, join_url, post_json, sort_by_index, IndexedEmbedding, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "cloudflare";

pub const DEFAULT_CLOUDFLARE_ENDPOINT: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_CLOUDFLARE_GATEWAY_ENDPOINT: &str = "https://gateway.ai.cloudflare.com/v1";
pub const DEFAULT_CLOUDFLARE_MODEL: &str = "@cf/baai/bge-base-en-v1.5";

/// Cloudflare Workers AI configuration.
#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_key: String,
    pub account_id: String,
    /// Route through this AI Gateway instead of the direct API.
    pub gateway_id: Option<String>,
    pub model: String,
    /// Overrides the API base (or the gateway base when `gateway_id` is set).
    pub endpoint: Option<String>,
    pub max_batch_size: Option<usize>,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CloudflareConfig {
    pub fn new(api_key: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            account_id: account_id.into(),
            gateway_id: None,
            model: DEFAULT_CLOUDFLARE_MODEL.to_string(),
            endpoint: None,
            max_batch_size: None,
            headers: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_gateway(mut self, gateway_id: impl Into<String>) -> Self {
        self.gateway_id = Some(gateway_id.into());
        self
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }

    /// Build from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] if the API key or account id is
    /// missing.
    pub fn from_settings(settings: ProviderSettings) -> Result<Self> {
        let api_key = settings.api_key.ok_or(Error::MissingCredential {
            provider: PROVIDER,
            env: api_key_env(ProviderKind::Cloudflare),
        })?;
        let account_id = settings.account_id.ok_or(Error::MissingCredential {
            provider: PROVIDER,
            env: "CLOUDFLARE_ACCOUNT_ID",
        })?;

        Ok(Self {
            api_key,
            account_id,
            gateway_id: settings.gateway_id,
            model: settings.model.unwrap_or_else(|| DEFAULT_CLOUDFLARE_MODEL.to_string()),
            endpoint: settings.endpoint,
            max_batch_size: settings.max_batch_size,
            headers: settings.headers,
            extra: settings.extra,
        })
    }

    fn url(&self) -> String {
        match &self.gateway_id {
            Some(gateway) => {
                let base = self.endpoint.as_deref().unwrap_or(DEFAULT_CLOUDFLARE_GATEWAY_ENDPOINT);
                join_url(base, &format!("{}/{gateway}/workers-ai/{}", self.account_id, self.model))
            }
            None => {
                let base = self.endpoint.as_deref().unwrap_or(DEFAULT_CLOUDFLARE_ENDPOINT);
                join_url(base, &format!("accounts/{}/ai/run/{}", self.account_id, self.model))
            }
        }
    }
}

/// Cloudflare Workers AI embedding function.
pub struct CloudflareEmbeddingFunction {
    config: CloudflareConfig,
    client: LazyClient,
}

impl CloudflareEmbeddingFunction {
    pub fn new(config: CloudflareConfig) -> Self {
        let client = LazyClient::bearer(PROVIDER, &config.api_key, &config.headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
struct WorkersAiRequest<'a> {
    text: &'a [&'a str],
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WorkersAiResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    errors: Vec<WorkersAiMessage>,
    result: Option<WorkersAiResult>,
}

const fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WorkersAiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct WorkersAiResult {
    data: Vec<DataEntry>,
}

/// Models return either bare vectors or index-tagged entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataEntry {
    Plain(Vec<f32>),
    Indexed(IndexedEmbedding),
}

fn into_vectors(expected: usize, data: Vec<DataEntry>) -> Result<Vec<Vec<f32>>> {
    if data.iter().all(|e| matches!(e, DataEntry::Plain(_))) {
        let vectors = data
            .into_iter()
            .filter_map(|e| match e {
                DataEntry::Plain(v) => Some(v),
                DataEntry::Indexed(_) => None,
            })
            .collect();
        return ensure_aligned(PROVIDER, expected, vectors);
    }

    let mut indexed = Vec::with_capacity(data.len());
    for entry in data {
        match entry {
            DataEntry::Indexed(e) => indexed.push(e),
            DataEntry::Plain(_) => {
                return Err(Error::InvalidResponse {
                    provider: PROVIDER,
                    message: "response mixes indexed and plain embeddings".into(),
                });
            }
        }
    }
    sort_by_index(PROVIDER, expected, indexed)
}

impl EmbeddingFunction for CloudflareEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: known_dimensions(ProviderKind::Cloudflare, &self.config.model),
            max_batch_size: self.config.max_batch_size,
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), self.config.max_batch_size)?;

        let client = self.client.get().await?;
        let url = self.config.url();
        debug!(gateway = self.config.gateway_id.is_some(), "Running Workers AI model");

        let request = WorkersAiRequest {
            text: texts,
            extra: &self.config.extra,
        };
        let response: WorkersAiResponse = post_json(client, PROVIDER, &url, &request).await?;

        if !response.success {
            let message = response
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            let message = if message.is_empty() { "request was not successful".to_string() } else { message };
            return Err(Error::provider(PROVIDER, ChromaError::server(message)));
        }

        let result = response.result.ok_or_else(|| Error::InvalidResponse {
            provider: PROVIDER,
            message: "missing result".into(),
        })?;
        into_vectors(texts.len(), result.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chroma_error::ChromaErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_batch_limit_rejects_oversized_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = CloudflareConfig::new("cf-key", "acct")
            .with_endpoint(server.uri())
            .with_max_batch_size(2);
        let err = CloudflareEmbeddingFunction::new(config)
            .generate(&["a", "b", "c"])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("3 > 2"), "got: {err}");
    }

    #[tokio::test]
    async fn test_indexed_data_is_resorted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/accounts/acct/ai/run/@cf/baai/bge-base-en-v1.5"))
            .and(header("authorization", "Bearer cf-key"))
            .and(body_json(json!({"text": ["a", "b", "c"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": {
                    "shape": [3, 1],
                    "data": [
                        {"index": 2, "embedding": [3.0]},
                        {"index": 0, "embedding": [1.0]},
                        {"index": 1, "embedding": [2.0]}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = CloudflareConfig::new("cf-key", "acct").with_endpoint(server.uri());
        let vectors = CloudflareEmbeddingFunction::new(config)
            .generate(&["a", "b", "c"])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
    }

    #[tokio::test]
    async fn test_plain_data_through_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/acct/gw/workers-ai/@cf/baai/bge-base-en-v1.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "result": {"data": [[0.5, 0.5], [0.25, 0.75]]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = CloudflareConfig::new("k", "acct")
            .with_gateway("gw")
            .with_endpoint(server.uri());
        let vectors = CloudflareEmbeddingFunction::new(config)
            .generate(&["x", "y"])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.5], vec![0.25, 0.75]]);
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errors": [{"code": 5006, "message": "model overloaded"}],
                "result": null
            })))
            .mount(&server)
            .await;

        let config = CloudflareConfig::new("k", "acct").with_endpoint(server.uri());
        let err = CloudflareEmbeddingFunction::new(config)
            .generate(&["x"])
            .await
            .unwrap_err();
        match err {
            Error::Provider { source, .. } => {
                assert_eq!(source.kind(), ChromaErrorKind::Server);
                assert_eq!(source.message(), "model overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mixed_entries_are_rejected() {
        let data = vec![
            DataEntry::Plain(vec![1.0]),
            DataEntry::Indexed(IndexedEmbedding {
                index: 1,
                embedding: vec![2.0],
            }),
        ];
        assert!(matches!(into_vectors(2, data), Err(Error::InvalidResponse { .. })));
    }

    #[test]
    fn test_default_urls() {
        let direct = CloudflareConfig::new("k", "acct");
        assert_eq!(
            direct.url(),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/baai/bge-base-en-v1.5"
        );
        let gateway = direct.with_gateway("gw");
        assert_eq!(
            gateway.url(),
            "https://gateway.ai.cloudflare.com/v1/acct/gw/workers-ai/@cf/baai/bge-base-en-v1.5"
        );
    }

    #[test]
    fn test_from_settings_requires_account() {
        let err = CloudflareConfig::from_settings(ProviderSettings {
            api_key: Some("k".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("CLOUDFLARE_ACCOUNT_ID"));
    }
}
