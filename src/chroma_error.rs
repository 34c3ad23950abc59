//! Typed errors for talking to a Chroma server (and other HTTP APIs).
//!
//! Every error carries a [`ChromaErrorKind`], a human-readable message, and
//! an optional underlying cause. Collaborators that receive a discriminator
//! string from the server use [`create_error_by_type`]; raw HTTP failures go
//! through [`ChromaError::from_response`] and the `From<reqwest::Error>`
//! conversion.

use serde::Deserialize;
use thiserror::Error;

/// Boxed underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaErrorKind {
    /// The server could not be reached.
    Connection,
    /// The server failed (5xx).
    Server,
    /// The request was rejected (4xx without a more specific kind).
    Client,
    Unauthorized,
    Forbidden,
    NotFound,
    /// A value supplied by the caller is invalid.
    Value,
    InvalidCollection,
    InvalidArgument,
    /// A uniqueness constraint was violated (409).
    Unique,
    RateLimit,
}

impl ChromaErrorKind {
    /// Stable type name, matching the names the server and other clients use.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connection => "ChromaConnectionError",
            Self::Server => "ChromaServerError",
            Self::Client => "ChromaClientError",
            Self::Unauthorized => "ChromaUnauthorizedError",
            Self::Forbidden => "ChromaForbiddenError",
            Self::NotFound => "ChromaNotFoundError",
            Self::Value => "ChromaValueError",
            Self::InvalidCollection => "InvalidCollectionError",
            Self::InvalidArgument => "InvalidArgumentError",
            Self::Unique => "ChromaUniqueError",
            Self::RateLimit => "ChromaRateLimitError",
        }
    }

    /// Classify an HTTP status code.
    ///
    /// Success codes have no meaningful kind and fall into `Client`.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Unique,
            422 => Self::Value,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Client,
        }
    }
}

impl std::fmt::Display for ChromaErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed Chroma API error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ChromaError {
    kind: ChromaErrorKind,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl ChromaError {
    /// Create an error of the given kind.
    pub fn new(kind: ChromaErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ChromaErrorKind::Connection, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ChromaErrorKind::Server, message)
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::new(ChromaErrorKind::Client, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ChromaErrorKind::Value, message)
    }

    #[must_use]
    pub const fn kind(&self) -> ChromaErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Type name of this error, e.g. `InvalidCollectionError`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Build an error from an HTTP status and message, classifying by status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ChromaErrorKind::from_status(status), message)
    }

    /// Build an error from a failed HTTP response.
    ///
    /// Bodies of the form `{"error": "<Type>", "message": "..."}` are routed
    /// through [`create_error_by_type`]. Anything else is classified by status
    /// with the raw body as the message.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        if let Ok(typed) = serde_json::from_str::<ServerErrorBody>(body) {
            let message = typed.message.unwrap_or_else(|| typed.error.clone());
            if let Some(err) = create_error_by_type(&typed.error, message.clone()) {
                return err;
            }
            return Self::from_status(status, message);
        }

        let body = body.trim();
        if body.is_empty() {
            Self::from_status(status, format!("HTTP {status}"))
        } else {
            Self::from_status(status, body)
        }
    }
}

impl From<reqwest::Error> for ChromaError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() || err.is_timeout() || err.is_request() {
            ChromaErrorKind::Connection
        } else if let Some(status) = err.status() {
            ChromaErrorKind::from_status(status.as_u16())
        } else if err.is_decode() || err.is_body() {
            ChromaErrorKind::Server
        } else {
            ChromaErrorKind::Client
        };
        Self::new(kind, err.to_string()).with_cause(err)
    }
}

#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    error: String,
    message: Option<String>,
}

/// Map a server-reported error type onto a typed error.
///
/// Returns `None` for types this client does not know; callers decide how
/// to surface an unclassified failure.
pub fn create_error_by_type(error_type: &str, message: impl Into<String>) -> Option<ChromaError> {
    let kind = match error_type {
        "InvalidCollection" => ChromaErrorKind::InvalidCollection,
        "InvalidArgumentError" => ChromaErrorKind::InvalidArgument,
        _ => return None,
    };
    Some(ChromaError::new(kind, message))
}
