//! Amazon Bedrock embedding function.
//!
//! Invokes a Titan text-embedding model through the Bedrock runtime
//! `InvokeModel` API. Titan embeds one text per call, so a batch is sent as
//! one request per text, in input order.
//!
//! Authenticates with a Bedrock API key (`AWS_BEARER_TOKEN_BEDROCK`) sent as a
//! bearer token.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::config::api_key_env;
use super::function::EmbeddingFunction;
use super::http::{check_batch_size, join_url, post_json, LazyClient};
use super::types::{known_dimensions, ProviderInfo, ProviderKind, ProviderSettings};

const PROVIDER: &str = "bedrock";

pub const DEFAULT_BEDROCK_MODEL: &str = "amazon.titan-embed-text-v2:0";
pub const DEFAULT_BEDROCK_REGION: &str = "us-east-1";

/// Amazon Bedrock configuration.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub api_key: String,
    pub model: String,
    pub region: String,
    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`.
    pub endpoint: Option<String>,
    /// Titan v2 only: 256, 512, or 1024.
    pub dimensions: Option<usize>,
    pub max_batch_size: Option<usize>,
    pub headers: BTreeMap<String, String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BedrockConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_BEDROCK_MODEL.to_string(),
            region: DEFAULT_BEDROCK_REGION.to_string(),
            endpoint: None,
            dimensions: None,
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
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
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
            env: api_key_env(ProviderKind::Bedrock),
        })?;

        Ok(Self {
            api_key,
            model: settings.model.unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string()),
            region: settings.region.unwrap_or_else(|| DEFAULT_BEDROCK_REGION.to_string()),
            endpoint: settings.endpoint,
            dimensions: settings.dimensions,
            max_batch_size: settings.max_batch_size,
            headers: settings.headers,
            extra: settings.extra,
        })
    }

    fn invoke_url(&self) -> String {
        let base = self
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region));
        join_url(&base, &format!("model/{}/invoke", self.model))
    }
}

/// Amazon Bedrock embedding function.
pub struct BedrockEmbeddingFunction {
    config: BedrockConfig,
    client: LazyClient,
}

impl BedrockEmbeddingFunction {
    pub fn new(config: BedrockConfig) -> Self {
        let client = LazyClient::bearer(PROVIDER, &config.api_key, &config.headers);
        Self { config, client }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbedRequest<'a> {
    input_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TitanEmbedResponse {
    embedding: Vec<f32>,
}

impl EmbeddingFunction for BedrockEmbeddingFunction {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: PROVIDER.to_string(),
            model: self.config.model.clone(),
            dimensions: self
                .config
                .dimensions
                .or_else(|| known_dimensions(ProviderKind::Bedrock, &self.config.model)),
            max_batch_size: self.config.max_batch_size,
        }
    }

    async fn generate(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        check_batch_size(PROVIDER, texts.len(), self.config.max_batch_size)?;

        let client = self.client.get().await?;
        let url = self.config.invoke_url();
        debug!(model = %self.config.model, count = texts.len(), "Invoking Bedrock model");

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let request = TitanEmbedRequest {
                input_text: text,
                dimensions: self.config.dimensions,
                extra: &self.config.extra,
            };
            let response: TitanEmbedResponse = post_json(client, PROVIDER, &url, &request).await?;
            vectors.push(response.embedding);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_text(server: &MockServer, text: &str, value: f32) {
        Mock::given(method("POST"))
            .and(path("/model/amazon.titan-embed-text-v2:0/invoke"))
            .and(header("authorization", "Bearer br-key"))
            .and(body_json(json!({"inputText": text, "dimensions": 256})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": [value],
                "inputTextTokenCount": 1
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_one_call_per_text_in_order() {
        let server = MockServer::start().await;
        mount_text(&server, "first", 1.0).await;
        mount_text(&server, "second", 2.0).await;

        let mut config = BedrockConfig::new("br-key").with_endpoint(server.uri());
        config.dimensions = Some(256);
        let vectors = BedrockEmbeddingFunction::new(config)
            .generate(&["first", "second"])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_invoke_url_uses_region() {
        let config = BedrockConfig::new("k").with_region("eu-west-1");
        assert_eq!(
            config.invoke_url(),
            "https://bedrock-runtime.eu-west-1.amazonaws.com/model/amazon.titan-embed-text-v2:0/invoke"
        );
    }

    #[test]
    fn test_from_settings_requires_key() {
        let err = BedrockConfig::from_settings(ProviderSettings::default()).unwrap_err();
        assert!(err.to_string().contains("AWS_BEARER_TOKEN_BEDROCK"));
    }
}
