//! Embedding configuration management.
//!
//! Loads and saves provider settings from `~/.chroma/embeddings.json`
//! (or `CHROMA_EMBED_CONFIG`). Values resolve in this order:
//! explicit setting → environment variable → config file → adapter default.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{ChromaConfig, EmbeddingSettings, ProviderKind, ProviderSettings};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CHROMA_EMBED_CONFIG";

/// Environment variables consulted for one provider, in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvNames {
    pub api_key: &'static [&'static str],
    pub model: &'static [&'static str],
    pub endpoint: &'static [&'static str],
    pub account_id: &'static [&'static str],
    pub gateway_id: &'static [&'static str],
    pub region: &'static [&'static str],
}

/// Environment variable names for a provider.
#[must_use]
pub const fn env_names(kind: ProviderKind) -> EnvNames {
    const NONE: &[&str] = &[];
    let names = EnvNames {
        api_key: NONE,
        model: NONE,
        endpoint: NONE,
        account_id: NONE,
        gateway_id: NONE,
        region: NONE,
    };
    match kind {
        ProviderKind::Bedrock => EnvNames {
            api_key: &["AWS_BEARER_TOKEN_BEDROCK"],
            region: &["AWS_REGION", "AWS_DEFAULT_REGION"],
            ..names
        },
        ProviderKind::Cohere => EnvNames {
            api_key: &["COHERE_API_KEY"],
            ..names
        },
        ProviderKind::Jina => EnvNames {
            api_key: &["JINA_API_KEY"],
            ..names
        },
        ProviderKind::Google => EnvNames {
            api_key: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            ..names
        },
        ProviderKind::Cloudflare => EnvNames {
            api_key: &["CLOUDFLARE_API_KEY", "CLOUDFLARE_API_TOKEN"],
            account_id: &["CLOUDFLARE_ACCOUNT_ID"],
            gateway_id: &["CLOUDFLARE_GATEWAY_ID"],
            ..names
        },
        ProviderKind::OpenAi => EnvNames {
            api_key: &["OPENAI_API_KEY"],
            endpoint: &["OPENAI_BASE_URL"],
            ..names
        },
        ProviderKind::Ollama => EnvNames {
            model: &["OLLAMA_MODEL"],
            endpoint: &["OLLAMA_ENDPOINT"],
            ..names
        },
        ProviderKind::Huggingface => EnvNames {
            api_key: &["HF_TOKEN"],
            model: &["HF_MODEL"],
            endpoint: &["HF_ENDPOINT"],
            ..names
        },
        ProviderKind::Local => names,
    }
}

/// Primary API key variable, used in error messages.
#[must_use]
pub fn api_key_env(kind: ProviderKind) -> &'static str {
    env_names(kind).api_key.first().copied().unwrap_or("API_KEY")
}

/// Get the config file path.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".chroma").join("embeddings.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Load the configuration, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ChromaConfig> {
    if !path.exists() {
        return Ok(ChromaConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the full configuration.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config(path: &Path, config: &ChromaConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

/// Get the embedding section of the config file.
///
/// # Errors
///
/// Propagates [`load_config`] errors.
pub fn get_embedding_settings(path: &Path) -> Result<EmbeddingSettings> {
    Ok(load_config(path)?.embeddings)
}

/// Save settings for one provider, merging over what is already stored.
///
/// # Errors
///
/// Propagates load/save errors.
pub fn save_provider_settings(
    path: &Path,
    kind: ProviderKind,
    settings: ProviderSettings,
    make_default: bool,
) -> Result<ProviderSettings> {
    let mut config = load_config(path)?;

    let existing = config.embeddings.provider(kind);
    let merged = settings.or(&existing);
    config.embeddings.providers.insert(kind, merged.clone());
    if make_default {
        config.embeddings.default_provider = Some(kind);
    }

    save_config(path, &config)?;
    Ok(merged)
}

/// Remove stored settings for one provider, or all embedding settings.
///
/// # Errors
///
/// Propagates load/save errors.
pub fn reset_embedding_settings(path: &Path, kind: Option<ProviderKind>) -> Result<()> {
    let mut config = load_config(path)?;
    match kind {
        Some(kind) => {
            config.embeddings.providers.remove(&kind);
            if config.embeddings.default_provider == Some(kind) {
                config.embeddings.default_provider = None;
            }
        }
        None => config.embeddings = EmbeddingSettings::default(),
    }
    save_config(path, &config)
}

/// First non-empty value among the named environment variables.
fn first_env(names: &[&str], env: &impl Fn(&str) -> Option<String>) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env(name))
        .find(|value| !value.is_empty())
}

/// Resolve a provider's settings from explicit values, the environment, and
/// the config file.
#[must_use]
pub fn resolve_settings(
    kind: ProviderKind,
    explicit: ProviderSettings,
    file: &EmbeddingSettings,
) -> ProviderSettings {
    resolve_settings_with(kind, explicit, file, |name| std::env::var(name).ok())
}

/// [`resolve_settings`] with an injectable environment lookup.
#[must_use]
pub fn resolve_settings_with(
    kind: ProviderKind,
    explicit: ProviderSettings,
    file: &EmbeddingSettings,
    env: impl Fn(&str) -> Option<String>,
) -> ProviderSettings {
    let names = env_names(kind);
    let from_env = ProviderSettings {
        api_key: first_env(names.api_key, &env),
        model: first_env(names.model, &env),
        endpoint: first_env(names.endpoint, &env),
        account_id: first_env(names.account_id, &env),
        gateway_id: first_env(names.gateway_id, &env),
        region: first_env(names.region, &env),
        ..ProviderSettings::default()
    };

    explicit.or(&from_env).or(&file.provider(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn file_with(kind: ProviderKind, settings: ProviderSettings) -> EmbeddingSettings {
        let mut file = EmbeddingSettings::default();
        file.providers.insert(kind, settings);
        file
    }

    #[test]
    fn test_resolution_order() {
        let file = file_with(
            ProviderKind::Cloudflare,
            ProviderSettings {
                api_key: Some("from-file".into()),
                account_id: Some("acct-file".into()),
                model: Some("@cf/baai/bge-small-en-v1.5".into()),
                ..Default::default()
            },
        );
        let env = env_from(&[
            ("CLOUDFLARE_API_KEY", "from-env"),
            ("CLOUDFLARE_ACCOUNT_ID", ""),
        ]);
        let explicit = ProviderSettings {
            model: Some("@cf/baai/bge-large-en-v1.5".into()),
            ..Default::default()
        };

        let resolved = resolve_settings_with(ProviderKind::Cloudflare, explicit, &file, env);
        assert_eq!(resolved.api_key.as_deref(), Some("from-env"));
        // Empty env values are ignored
        assert_eq!(resolved.account_id.as_deref(), Some("acct-file"));
        assert_eq!(resolved.model.as_deref(), Some("@cf/baai/bge-large-en-v1.5"));
    }

    #[test]
    fn test_google_falls_back_to_second_env_name() {
        let resolved = resolve_settings_with(
            ProviderKind::Google,
            ProviderSettings::default(),
            &EmbeddingSettings::default(),
            env_from(&[("GOOGLE_API_KEY", "g-key")]),
        );
        assert_eq!(resolved.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ChromaConfig::default());
    }

    #[test]
    fn test_save_merges_and_reset_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("embeddings.json");

        save_provider_settings(
            &path,
            ProviderKind::Jina,
            ProviderSettings {
                api_key: Some("k1".into()),
                ..Default::default()
            },
            true,
        )
        .unwrap();
        let merged = save_provider_settings(
            &path,
            ProviderKind::Jina,
            ProviderSettings {
                model: Some("jina-embeddings-v2-base-en".into()),
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert_eq!(merged.api_key.as_deref(), Some("k1"));

        let settings = get_embedding_settings(&path).unwrap();
        assert_eq!(settings.default_provider, Some(ProviderKind::Jina));
        assert_eq!(
            settings.provider(ProviderKind::Jina).model.as_deref(),
            Some("jina-embeddings-v2-base-en")
        );

        reset_embedding_settings(&path, Some(ProviderKind::Jina)).unwrap();
        let settings = get_embedding_settings(&path).unwrap();
        assert!(settings.default_provider.is_none());
        assert!(settings.providers.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_config(&path), Err(Error::Config(_))));
    }
}
