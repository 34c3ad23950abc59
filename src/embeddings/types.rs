//! Embedding types and configuration.
//!
//! The serialized shapes here are what `~/.chroma/embeddings.json` holds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Embedding provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon Bedrock (Titan text embeddings)
    Bedrock,
    Cohere,
    Jina,
    /// Google Generative AI (Gemini)
    #[serde(alias = "gemini")]
    Google,
    /// Cloudflare Workers AI
    #[serde(alias = "workers-ai")]
    Cloudflare,
    /// In-process static embeddings (Model2Vec)
    #[serde(alias = "transformers", alias = "model2vec")]
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
    #[serde(alias = "hf")]
    Huggingface,
}

impl ProviderKind {
    /// Every provider, in display order.
    pub const ALL: [Self; 9] = [
        Self::Bedrock,
        Self::Cohere,
        Self::Jina,
        Self::Google,
        Self::Cloudflare,
        Self::Local,
        Self::OpenAi,
        Self::Ollama,
        Self::Huggingface,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::Cohere => "cohere",
            Self::Jina => "jina",
            Self::Google => "google",
            Self::Cloudflare => "cloudflare",
            Self::Local => "local",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Huggingface => "huggingface",
        }
    }

    /// Cargo feature and crate a provider needs, if it is optional.
    #[must_use]
    pub const fn optional_dependency(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Local => Some(("local", "model2vec-rs")),
            _ => None,
        }
    }

    /// Whether this build includes the provider.
    #[must_use]
    pub const fn is_compiled(&self) -> bool {
        match self {
            Self::Local => cfg!(feature = "local"),
            _ => true,
        }
    }

    /// Whether the provider cannot work without an API key.
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Local | Self::Ollama)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bedrock" | "amazon-bedrock" | "aws" => Ok(Self::Bedrock),
            "cohere" => Ok(Self::Cohere),
            "jina" | "jinaai" => Ok(Self::Jina),
            "google" | "gemini" | "google-genai" => Ok(Self::Google),
            "cloudflare" | "workers-ai" | "cloudflare-workers-ai" => Ok(Self::Cloudflare),
            "local" | "transformers" | "model2vec" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "huggingface" | "hf" => Ok(Self::Huggingface),
            _ => Err(crate::error::Error::UnknownProvider(s.to_string())),
        }
    }
}

/// Per-provider settings as stored in the config file or passed on the
/// command line. Every field is optional; adapters fill in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Base URL override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Cloudflare account id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Cloudflare AI Gateway id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    /// AWS region for Bedrock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Jina `task`, Cohere `input_type`, Google `taskType`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Extra HTTP headers sent with every request.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Extra request-body parameters merged into the provider payload.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProviderSettings {
    /// Fill unset fields from `fallback`. Values already set win, including
    /// individual header and extra entries.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        let mut headers = fallback.headers.clone();
        headers.extend(self.headers);
        let mut extra = fallback.extra.clone();
        extra.extend(self.extra);

        Self {
            api_key: self.api_key.or_else(|| fallback.api_key.clone()),
            model: self.model.or_else(|| fallback.model.clone()),
            endpoint: self.endpoint.or_else(|| fallback.endpoint.clone()),
            account_id: self.account_id.or_else(|| fallback.account_id.clone()),
            gateway_id: self.gateway_id.or_else(|| fallback.gateway_id.clone()),
            region: self.region.or_else(|| fallback.region.clone()),
            max_batch_size: self.max_batch_size.or(fallback.max_batch_size),
            dimensions: self.dimensions.or(fallback.dimensions),
            task: self.task.or_else(|| fallback.task.clone()),
            headers,
            extra,
        }
    }

    /// True when nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Embedding section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<ProviderKind>,
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
}

impl EmbeddingSettings {
    /// Stored settings for one provider (empty if none).
    #[must_use]
    pub fn provider(&self, kind: ProviderKind) -> ProviderSettings {
        self.providers.get(&kind).cloned().unwrap_or_default()
    }
}

/// Local configuration file structure.
///
/// Stored at `~/.chroma/embeddings.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaConfig {
    pub embeddings: EmbeddingSettings,
}

/// Adapter metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    /// Output dimensions when known ahead of a call.
    pub dimensions: Option<usize>,
    pub max_batch_size: Option<usize>,
}

/// Known output dimensions for common models.
///
/// Unknown models return `None`; the real size shows up on the first call.
#[must_use]
pub fn known_dimensions(kind: ProviderKind, model: &str) -> Option<usize> {
    match (kind, model) {
        (ProviderKind::Jina, "jina-embeddings-v3") => Some(1024),
        (ProviderKind::Jina, "jina-embeddings-v2-base-en") => Some(768),
        (ProviderKind::Cohere, "embed-english-v3.0" | "embed-multilingual-v3.0") => Some(1024),
        (ProviderKind::Cohere, "embed-english-light-v3.0") => Some(384),
        (ProviderKind::Google, "text-embedding-004") => Some(768),
        (ProviderKind::Cloudflare, "@cf/baai/bge-base-en-v1.5") => Some(768),
        (ProviderKind::Cloudflare, "@cf/baai/bge-small-en-v1.5") => Some(384),
        (ProviderKind::Cloudflare, "@cf/baai/bge-large-en-v1.5") => Some(1024),
        (ProviderKind::Bedrock, "amazon.titan-embed-text-v2:0") => Some(1024),
        (ProviderKind::Bedrock, "amazon.titan-embed-text-v1") => Some(1536),
        (ProviderKind::OpenAi, "text-embedding-3-small" | "text-embedding-ada-002") => Some(1536),
        (ProviderKind::OpenAi, "text-embedding-3-large") => Some(3072),
        (ProviderKind::Ollama, "nomic-embed-text") => Some(768),
        (ProviderKind::Ollama, "mxbai-embed-large") => Some(1024),
        (ProviderKind::Ollama, "all-minilm") => Some(384),
        (ProviderKind::Huggingface, "sentence-transformers/all-MiniLM-L6-v2") => Some(384),
        (ProviderKind::Huggingface, "sentence-transformers/all-mpnet-base-v2") => Some(768),
        (
            ProviderKind::Local,
            "minishlab/potion-base-8M" | "minishlab/potion-base-32M" | "minishlab/potion-multilingual-128M",
        ) => Some(256),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_aliases() {
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("Workers-AI".parse::<ProviderKind>().unwrap(), ProviderKind::Cloudflare);
        assert_eq!("transformers".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert_eq!("hf".parse::<ProviderKind>().unwrap(), ProviderKind::Huggingface);
        assert!("voyage".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_every_canonical_name_parses() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_settings_or_prefers_self() {
        let explicit = ProviderSettings {
            model: Some("a".into()),
            headers: BTreeMap::from([("x-one".to_string(), "explicit".to_string())]),
            ..Default::default()
        };
        let file = ProviderSettings {
            model: Some("b".into()),
            api_key: Some("key".into()),
            headers: BTreeMap::from([
                ("x-one".to_string(), "file".to_string()),
                ("x-two".to_string(), "file".to_string()),
            ]),
            ..Default::default()
        };

        let merged = explicit.or(&file);
        assert_eq!(merged.model.as_deref(), Some("a"));
        assert_eq!(merged.api_key.as_deref(), Some("key"));
        assert_eq!(merged.headers["x-one"], "explicit");
        assert_eq!(merged.headers["x-two"], "file");
    }

    #[test]
    fn test_config_round_trips_provider_keys() {
        let json = r#"{"embeddings":{"default_provider":"jina","providers":{"jina":{"api_key":"k"},"gemini":{"model":"m"}}}}"#;
        let config: ChromaConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.embeddings.default_provider, Some(ProviderKind::Jina));
        assert_eq!(
            config.embeddings.provider(ProviderKind::Google).model.as_deref(),
            Some("m")
        );
        assert!(config.embeddings.provider(ProviderKind::Cohere).is_empty());
    }
}
