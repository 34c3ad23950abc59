//! Embedding function registry.
//!
//! Maps a [`ProviderKind`] and its resolved settings to a boxed embedding
//! function. Providers behind a cargo feature report
//! [`Error::MissingDependency`] when the feature is compiled out.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::bedrock::{BedrockConfig, BedrockEmbeddingFunction};
use super::cloudflare::{CloudflareConfig, CloudflareEmbeddingFunction};
use super::cohere::{CohereConfig, CohereEmbeddingFunction};
use super::config::{api_key_env, resolve_settings, resolve_settings_with};
use super::function::BoxedEmbeddingFunction;
use super::google::{GoogleConfig, GoogleEmbeddingFunction};
use super::huggingface::{HuggingFaceConfig, HuggingFaceEmbeddingFunction};
use super::jina::{JinaConfig, JinaEmbeddingFunction};
use super::ollama::{OllamaConfig, OllamaEmbeddingFunction};
use super::openai::{OpenAiConfig, OpenAiEmbeddingFunction};
use super::types::{EmbeddingSettings, ProviderInfo, ProviderKind, ProviderSettings};

/// Provider used when neither the caller nor the config file names one.
pub const FALLBACK_PROVIDER: ProviderKind = ProviderKind::Local;

/// Create an embedding function from already-resolved settings.
///
/// No network or model I/O happens here; clients and models load on first
/// use.
///
/// # Errors
///
/// Returns [`Error::MissingCredential`](crate::error::Error::MissingCredential)
/// when a required key is absent and
/// [`Error::MissingDependency`] when the provider was compiled out.
pub fn create_embedding_function(
    kind: ProviderKind,
    settings: ProviderSettings,
) -> Result<BoxedEmbeddingFunction> {
    debug!(provider = %kind, "Creating embedding function");

    let function = match kind {
        ProviderKind::Bedrock => {
            BoxedEmbeddingFunction::new(BedrockEmbeddingFunction::new(BedrockConfig::from_settings(settings)?))
        }
        ProviderKind::Cohere => {
            BoxedEmbeddingFunction::new(CohereEmbeddingFunction::new(CohereConfig::from_settings(settings)?))
        }
        ProviderKind::Jina => {
            BoxedEmbeddingFunction::new(JinaEmbeddingFunction::new(JinaConfig::from_settings(settings)?))
        }
        ProviderKind::Google => {
            BoxedEmbeddingFunction::new(GoogleEmbeddingFunction::new(GoogleConfig::from_settings(settings)?))
        }
        ProviderKind::Cloudflare => BoxedEmbeddingFunction::new(CloudflareEmbeddingFunction::new(
            CloudflareConfig::from_settings(settings)?,
        )),
        ProviderKind::OpenAi => {
            BoxedEmbeddingFunction::new(OpenAiEmbeddingFunction::new(OpenAiConfig::from_settings(settings)?))
        }
        ProviderKind::Ollama => {
            BoxedEmbeddingFunction::new(OllamaEmbeddingFunction::new(OllamaConfig::from_settings(settings)))
        }
        ProviderKind::Huggingface => BoxedEmbeddingFunction::new(HuggingFaceEmbeddingFunction::new(
            HuggingFaceConfig::from_settings(settings)?,
        )),
        ProviderKind::Local => create_local(settings)?,
    };

    Ok(function)
}

#[cfg(feature = "local")]
#[allow(clippy::unnecessary_wraps)]
fn create_local(settings: ProviderSettings) -> Result<BoxedEmbeddingFunction> {
    use super::local::{LocalConfig, LocalEmbeddingFunction};
    Ok(BoxedEmbeddingFunction::new(LocalEmbeddingFunction::new(LocalConfig::from_settings(
        settings,
    ))))
}

#[cfg(not(feature = "local"))]
fn create_local(_settings: ProviderSettings) -> Result<BoxedEmbeddingFunction> {
    Err(missing_dependency(ProviderKind::Local))
}

/// Error for a provider whose cargo feature is compiled out.
#[cfg_attr(feature = "local", allow(dead_code))]
fn missing_dependency(kind: ProviderKind) -> Error {
    match kind.optional_dependency() {
        Some((feature, package)) => Error::MissingDependency {
            provider: kind.as_str(),
            package,
            feature,
        },
        None => Error::Other(format!("{kind} has no optional dependency")),
    }
}

/// Pick the provider to use: explicit choice, then the config default,
/// then [`FALLBACK_PROVIDER`].
#[must_use]
pub fn select_provider(explicit: Option<ProviderKind>, file: &EmbeddingSettings) -> ProviderKind {
    explicit.or(file.default_provider).unwrap_or(FALLBACK_PROVIDER)
}

/// Resolve settings for the selected provider and create its function.
///
/// # Errors
///
/// See [`create_embedding_function`].
pub fn create_from_config(
    kind: Option<ProviderKind>,
    explicit: ProviderSettings,
    file: &EmbeddingSettings,
) -> Result<BoxedEmbeddingFunction> {
    let kind = select_provider(kind, file);
    create_embedding_function(kind, resolve_settings(kind, explicit, file))
}

/// Readiness of one provider in this build and environment.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub compiled: bool,
    pub is_default: bool,
    /// Whether an API key was found (always true for keyless providers).
    pub credentials: bool,
    /// Variable the API key is read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ProviderInfo>,
    /// Why the provider cannot be created, if it cannot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    /// Server answered and has the model (server-backed providers only,
    /// filled by [`check_servers`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

/// Report the status of every provider.
#[must_use]
pub fn catalog(file: &EmbeddingSettings) -> Vec<ProviderStatus> {
    catalog_with(file, |name| std::env::var(name).ok())
}

/// [`catalog`] with an injectable environment lookup.
#[must_use]
pub fn catalog_with(file: &EmbeddingSettings, env: impl Fn(&str) -> Option<String>) -> Vec<ProviderStatus> {
    let default = select_provider(None, file);

    ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            let settings = resolve_settings_with(kind, ProviderSettings::default(), file, &env);
            let credentials = !kind.requires_api_key() || settings.api_key.is_some();
            let (info, issue) = match create_embedding_function(kind, settings) {
                Ok(function) => (Some(function.info()), None),
                Err(e) => (None, Some(e.to_string())),
            };

            ProviderStatus {
                provider: kind,
                compiled: kind.is_compiled(),
                is_default: kind == default,
                credentials,
                env: kind.requires_api_key().then(|| api_key_env(kind)),
                info,
                issue,
                reachable: None,
            }
        })
        .collect()
}

/// Contact server-backed providers and record whether they can serve
/// their configured model.
pub async fn check_servers(statuses: &mut [ProviderStatus], file: &EmbeddingSettings) {
    check_servers_with(statuses, file, |name| std::env::var(name).ok()).await;
}

/// [`check_servers`] with an injectable environment lookup.
pub async fn check_servers_with(
    statuses: &mut [ProviderStatus],
    file: &EmbeddingSettings,
    env: impl Fn(&str) -> Option<String>,
) {
    for status in statuses.iter_mut().filter(|s| s.provider == ProviderKind::Ollama) {
        let settings = resolve_settings_with(ProviderKind::Ollama, ProviderSettings::default(), file, &env);
        let function = OllamaEmbeddingFunction::new(OllamaConfig::from_settings(settings));
        let reachable = function.is_available().await;
        debug!(provider = %status.provider, reachable, "Checked provider server");
        status.reachable = Some(reachable);
    }
}
