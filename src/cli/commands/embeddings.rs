//! Embeddings command implementation.
//!
//! Provides CLI commands for embedding providers:
//! - `status` - Show every provider and whether it can be used
//! - `configure` - Save provider settings to the config file
//! - `reset` - Remove saved settings
//! - `generate` - Embed texts with a provider

use crate::cli::{EmbeddingsCommands, ProviderArgs};
use crate::embeddings::{
    catalog, check_servers, config_path, create_from_config, get_embedding_settings, reset_embedding_settings,
    save_provider_settings, select_provider, ProviderInfo, ProviderKind, ProviderSettings,
};
use crate::error::{Error, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Number of leading values shown per vector without `--full`.
const PREVIEW_LEN: usize = 5;

/// Output for configure command.
#[derive(Serialize)]
struct ConfigureOutput {
    success: bool,
    provider: ProviderKind,
    is_default: bool,
    config_path: PathBuf,
    settings: ProviderSettings,
}

/// Output for reset command.
#[derive(Serialize)]
struct ResetOutput {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderKind>,
    config_path: PathBuf,
}

/// Output for generate command.
#[derive(Serialize)]
struct GenerateOutput<'a> {
    provider: &'a ProviderInfo,
    count: usize,
    dimensions: Option<usize>,
    embeddings: &'a [Vec<f32>],
}

/// Execute embeddings command.
///
/// # Errors
///
/// Returns config, credential, or provider errors from the subcommand.
pub fn execute(command: EmbeddingsCommands, config: Option<&Path>, json: bool) -> Result<()> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };

    match command {
        EmbeddingsCommands::Status => execute_status(&path, json),
        EmbeddingsCommands::Configure {
            provider,
            default,
            settings,
        } => execute_configure(&path, provider, default, settings, json),
        EmbeddingsCommands::Reset { provider } => execute_reset(&path, provider, json),
        EmbeddingsCommands::Generate {
            texts,
            provider,
            full,
            settings,
        } => {
            // Create tokio runtime for async operations
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
            rt.block_on(execute_generate(&path, texts, provider, settings, full, json))
        }
    }
}

impl TryFrom<ProviderArgs> for ProviderSettings {
    type Error = Error;

    fn try_from(args: ProviderArgs) -> Result<Self> {
        let headers = args
            .headers
            .iter()
            .map(|h| parse_header(h))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            api_key: args.api_key,
            model: args.model,
            endpoint: args.endpoint,
            account_id: args.account_id,
            gateway_id: args.gateway_id,
            region: args.region,
            max_batch_size: args.max_batch_size,
            dimensions: args.dimensions,
            task: args.task,
            headers,
            extra: BTreeMap::new(),
        })
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::InvalidArgument(format!(
            "Invalid header '{raw}'. Expected NAME=VALUE"
        ))),
    }
}

/// Mask a secret for display, keeping the last four characters.
fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

/// Show provider status.
fn execute_status(path: &Path, json: bool) -> Result<()> {
    let settings = get_embedding_settings(path)?;
    let mut statuses = catalog(&settings);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    rt.block_on(check_servers(&mut statuses, &settings));

    if json {
        let output = serde_json::json!({
            "config_path": path,
            "default_provider": select_provider(None, &settings),
            "providers": statuses,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Embedding Providers");
    println!("===================");
    println!();
    println!("Config: {}", path.display());
    println!();

    for status in &statuses {
        let usable = status.issue.is_none() && status.reachable != Some(false);
        let mark = if usable { "✓".green() } else { "✗".red() };
        print!("  {mark} {}", status.provider);
        if let Some(info) = &status.info {
            print!(" ({})", info.model);
        }
        if status.is_default {
            print!(" {}", "[default]".bold());
        }
        println!();

        if let Some(issue) = &status.issue {
            println!("      {}", issue.dimmed());
        } else if status.reachable == Some(false) {
            println!("      {}", "server not reachable or model not pulled".dimmed());
        }
    }

    Ok(())
}

/// Save provider settings.
fn execute_configure(
    path: &Path,
    provider: ProviderKind,
    make_default: bool,
    args: ProviderArgs,
    json: bool,
) -> Result<()> {
    let settings = ProviderSettings::try_from(args)?;
    let mut saved = save_provider_settings(path, provider, settings, make_default)?;
    if let Some(key) = saved.api_key.as_mut() {
        *key = mask_secret(key);
    }

    if json {
        let output = ConfigureOutput {
            success: true,
            provider,
            is_default: make_default,
            config_path: path.to_path_buf(),
            settings: saved,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} Saved {provider} settings to {}", "✓".green(), path.display());
    if make_default {
        println!("  Default provider: {provider}");
    }
    if let Some(model) = &saved.model {
        println!("  Model:    {model}");
    }
    if let Some(endpoint) = &saved.endpoint {
        println!("  Endpoint: {endpoint}");
    }
    if let Some(key) = &saved.api_key {
        println!("  API key:  {key}");
    }

    Ok(())
}

/// Remove saved settings.
fn execute_reset(path: &Path, provider: Option<ProviderKind>, json: bool) -> Result<()> {
    reset_embedding_settings(path, provider)?;

    if json {
        let output = ResetOutput {
            success: true,
            provider,
            config_path: path.to_path_buf(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    match provider {
        Some(p) => println!("{} Removed {p} settings", "✓".green()),
        None => println!("{} Removed all embedding settings", "✓".green()),
    }
    Ok(())
}

/// Embed texts and print the result.
async fn execute_generate(
    path: &Path,
    texts: Vec<String>,
    provider: Option<ProviderKind>,
    args: ProviderArgs,
    full: bool,
    json: bool,
) -> Result<()> {
    let file = get_embedding_settings(path)?;
    let function = create_from_config(provider, ProviderSettings::try_from(args)?, &file)?;
    let info = function.info();

    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = function.generate(&refs).await?;
    let dimensions = embeddings.first().map(Vec::len);

    if json {
        let output = GenerateOutput {
            provider: &info,
            count: embeddings.len(),
            dimensions,
            embeddings: &embeddings,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Provider:   {} ({})", info.name, info.model);
    if let Some(d) = dimensions {
        println!("Dimensions: {d}");
    }
    println!();

    for (text, vector) in texts.iter().zip(&embeddings) {
        println!("{}", text.bold());
        if full || vector.len() <= PREVIEW_LEN {
            println!("  {vector:?}");
        } else {
            println!("  {:?} … ({} more)", &vector[..PREVIEW_LEN], vector.len() - PREVIEW_LEN);
        }
    }

    Ok(())
}
