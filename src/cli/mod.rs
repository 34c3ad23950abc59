//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::embeddings::config::CONFIG_PATH_ENV;
use crate::embeddings::ProviderKind;

pub mod commands;

/// Chroma embedding functions and CLI launcher
#[derive(Parser, Debug)]
#[command(name = "chroma-embed", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ~/.chroma/embeddings.json)
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embedding provider configuration and generation
    Embeddings {
        #[command(subcommand)]
        command: EmbeddingsCommands,
    },

    /// Print the path of the installed Chroma CLI
    Locate,

    /// Install the Chroma CLI with the official install script
    Install {
        /// Install script URL override
        #[arg(long)]
        url: Option<String>,

        /// Reinstall even if a binary is already present
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Embeddings Commands
// ============================================================================

#[derive(Subcommand, Debug, Clone)]
pub enum EmbeddingsCommands {
    /// Show every provider and whether it is ready to use
    Status,

    /// Save settings for a provider
    Configure {
        /// Provider (bedrock, cohere, jina, google, cloudflare, local, openai, ollama, huggingface)
        provider: ProviderKind,

        /// Make this the default provider
        #[arg(long)]
        default: bool,

        #[command(flatten)]
        settings: ProviderArgs,
    },

    /// Remove saved settings (one provider, or everything)
    Reset {
        provider: Option<ProviderKind>,
    },

    /// Embed texts and print the vectors
    Generate {
        /// Texts to embed
        #[arg(required = true)]
        texts: Vec<String>,

        /// Provider (default: configured default, then local)
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Print full vectors instead of a preview
        #[arg(long)]
        full: bool,

        #[command(flatten)]
        settings: ProviderArgs,
    },
}

/// Per-provider overrides shared by `configure` and `generate`.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// API key or token
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model to use (provider-specific)
    #[arg(short, long)]
    pub model: Option<String>,

    /// API base URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Cloudflare account id
    #[arg(long)]
    pub account_id: Option<String>,

    /// Cloudflare AI Gateway id
    #[arg(long)]
    pub gateway_id: Option<String>,

    /// AWS region (Bedrock)
    #[arg(long)]
    pub region: Option<String>,

    /// Maximum texts per request
    #[arg(long)]
    pub max_batch_size: Option<usize>,

    /// Output dimensions (models that support truncation)
    #[arg(long)]
    pub dimensions: Option<usize>,

    /// Jina task, Cohere input type, or Google task type
    #[arg(long)]
    pub task: Option<String>,

    /// Extra request header (repeatable)
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,
}
