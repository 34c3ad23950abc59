//! Error types for the chroma crate.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=provider, 3=not_found, 4=validation, etc.)
//! - Retryability flags for callers that can correct their input
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::chroma_error::{ChromaError, ChromaErrorKind};

/// Result type alias for chroma operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Provider (exit 2)
    ProviderError,
    InvalidResponse,

    // Not Found (exit 3)
    BinaryNotFound,

    // Validation (exit 4)
    InvalidArgument,
    BatchTooLarge,
    UnknownProvider,

    // Launcher (exit 5)
    InstallFailed,
    ExecFailed,

    // Config (exit 6)
    ConfigError,
    MissingCredential,
    MissingDependency,
    ModelLoadFailed,

    // I/O (exit 7)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ProviderError => "PROVIDER_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::BinaryNotFound => "BINARY_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::BatchTooLarge => "BATCH_TOO_LARGE",
            Self::UnknownProvider => "UNKNOWN_PROVIDER",
            Self::InstallFailed => "INSTALL_FAILED",
            Self::ExecFailed => "EXEC_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::MissingDependency => "MISSING_DEPENDENCY",
            Self::ModelLoadFailed => "MODEL_LOAD_FAILED",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-7).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::ProviderError | Self::InvalidResponse => 2,
            Self::BinaryNotFound => 3,
            Self::InvalidArgument | Self::BatchTooLarge | Self::UnknownProvider => 4,
            Self::InstallFailed | Self::ExecFailed => 5,
            Self::ConfigError
            | Self::MissingCredential
            | Self::MissingDependency
            | Self::ModelLoadFailed => 6,
            Self::IoError | Self::JsonError => 7,
        }
    }

    /// Whether the caller should retry with corrected input.
    ///
    /// True for bad arguments, oversized batches, unknown provider names,
    /// and missing credentials. False for provider, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument
                | Self::BatchTooLarge
                | Self::UnknownProvider
                | Self::MissingCredential
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in embedding and launcher operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{provider} embedding request failed: {source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: ChromaError,
    },

    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Batch too large for {provider}: {actual} > {max} (maximum batch size)")]
    BatchTooLarge {
        provider: &'static str,
        actual: usize,
        max: usize,
    },

    #[error(
        "The {provider} embedding function requires the `{package}` package. \
         Install it by rebuilding with `--features {feature}`"
    )]
    MissingDependency {
        provider: &'static str,
        package: &'static str,
        feature: &'static str,
    },

    #[error("{provider} credentials not found (set {env})")]
    MissingCredential {
        provider: &'static str,
        env: &'static str,
    },

    #[error("Failed to load local model '{model}': {message}")]
    ModelLoad { model: String, message: String },

    #[error("Unknown embedding provider: {0}")]
    UnknownProvider(String),

    #[error("Chroma CLI binary not found ({} location(s) searched)", .searched.len())]
    BinaryNotFound { searched: Vec<PathBuf> },

    #[error("Chroma CLI installation failed: {0}")]
    InstallFailed(String),

    #[error("Failed to run {}: {source}", .path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a typed API error with the provider that produced it.
    #[must_use]
    pub fn provider(provider: &'static str, source: ChromaError) -> Self {
        Self::Provider { provider, source }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Provider { .. } => ErrorCode::ProviderError,
            Self::InvalidResponse { .. } => ErrorCode::InvalidResponse,
            Self::BatchTooLarge { .. } => ErrorCode::BatchTooLarge,
            Self::MissingDependency { .. } => ErrorCode::MissingDependency,
            Self::MissingCredential { .. } => ErrorCode::MissingCredential,
            Self::ModelLoad { .. } => ErrorCode::ModelLoadFailed,
            Self::UnknownProvider(_) => ErrorCode::UnknownProvider,
            Self::BinaryNotFound { .. } => ErrorCode::BinaryNotFound,
            Self::InstallFailed(_) => ErrorCode::InstallFailed,
            Self::Exec { .. } => ErrorCode::ExecFailed,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Provider { provider, source } => match source.kind() {
                ChromaErrorKind::Unauthorized | ChromaErrorKind::Forbidden => Some(format!(
                    "Check the {provider} API key. \
                     Use `chroma-embed embeddings configure {provider} --api-key <KEY>`."
                )),
                ChromaErrorKind::Connection => Some(format!(
                    "Could not reach {provider}. Check network access and the configured endpoint."
                )),
                ChromaErrorKind::RateLimit => {
                    Some(format!("{provider} is rate limiting requests. Try again later."))
                }
                ChromaErrorKind::NotFound => Some(format!(
                    "{provider} did not recognize the request target. Check the configured model."
                )),
                _ => None,
            },

            Self::BatchTooLarge { max, .. } => {
                Some(format!("Split the input into batches of at most {max} texts."))
            }

            Self::MissingDependency { feature, .. } => Some(format!(
                "cargo install chroma-rs --features {feature}"
            )),

            Self::MissingCredential { provider, env } => Some(format!(
                "Set {env}, or run `chroma-embed embeddings configure {provider} --api-key <KEY>`."
            )),

            Self::ModelLoad { .. } => Some(
                "The model is fetched from the Hugging Face Hub on first use. Check network access \
                 or pass a local model directory with --model."
                    .to_string(),
            ),

            Self::UnknownProvider(_) => Some(format!(
                "Valid providers: {}",
                crate::embeddings::ProviderKind::ALL
                    .iter()
                    .map(crate::embeddings::ProviderKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),

            Self::BinaryNotFound { searched } => {
                let mut hint = String::from("Searched:\n");
                for path in searched {
                    hint.push_str(&format!("    {}\n", path.display()));
                }
                hint.push_str("  Install: chroma-embed install\n");
                hint.push_str("  Or set CHROMA_CLI_PATH to an existing binary");
                Some(hint)
            }

            Self::InvalidResponse { .. }
            | Self::InstallFailed(_)
            | Self::Exec { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Self::Provider { source, .. } = self {
            obj["error"]["type"] = serde_json::Value::String(source.name().to_string());
        }

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_too_large_names_limit() {
        let err = Error::BatchTooLarge {
            provider: "cloudflare",
            actual: 3,
            max: 2,
        };
        assert!(err.to_string().contains("3 > 2"));
        assert_eq!(err.exit_code(), 4);
        assert!(err.error_code().is_retryable());
    }

    #[test]
    fn test_missing_dependency_names_package() {
        let err = Error::MissingDependency {
            provider: "local",
            package: "model2vec-rs",
            feature: "local",
        };
        let msg = err.to_string();
        assert!(msg.contains("model2vec-rs"));
        assert!(msg.contains("--features local"));
        assert_eq!(err.error_code(), ErrorCode::MissingDependency);
    }

    #[test]
    fn test_structured_json_for_provider_error() {
        let err = Error::provider("jina", ChromaError::from_status(401, "invalid token"));
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "PROVIDER_ERROR");
        assert_eq!(json["error"]["type"], "ChromaUnauthorizedError");
        assert_eq!(json["error"]["exit_code"], 2);
        assert!(json["error"]["hint"].as_str().unwrap().contains("jina"));
    }

    #[test]
    fn test_binary_not_found_hint_lists_paths() {
        let err = Error::BinaryNotFound {
            searched: vec![PathBuf::from("/usr/local/bin/chroma")],
        };
        let hint = err.hint().unwrap();
        assert!(hint.contains("/usr/local/bin/chroma"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_unknown_provider_hint_lists_valid_names() {
        let hint = Error::UnknownProvider("foo".into()).hint().unwrap();
        assert!(hint.contains("jina"));
        assert!(hint.contains("cloudflare"));
    }
}
