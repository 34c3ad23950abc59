//! HTTP plumbing shared by the remote embedding functions.

use crate::chroma_error::ChromaError;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

/// HTTP client built on first use and reused for the adapter's lifetime.
///
/// Default headers (auth plus any configured extras) are baked into the
/// client when it is built.
pub(crate) struct LazyClient {
    provider: &'static str,
    headers: Vec<(String, String)>,
    cell: OnceCell<reqwest::Client>,
}

impl LazyClient {
    pub(crate) fn new(provider: &'static str, headers: Vec<(String, String)>) -> Self {
        Self {
            provider,
            headers,
            cell: OnceCell::new(),
        }
    }

    /// Client whose requests carry `Authorization: Bearer <token>`.
    pub(crate) fn bearer<'a>(
        provider: &'static str,
        token: &str,
        extra: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        let mut headers = vec![("authorization".to_string(), format!("Bearer {token}"))];
        headers.extend(extra.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::new(provider, headers)
    }

    pub(crate) async fn get(&self) -> Result<&reqwest::Client> {
        self.cell
            .get_or_try_init(|| async { self.build() })
            .await
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    fn build(&self) -> Result<reqwest::Client> {
        debug!(provider = self.provider, "Building HTTP client");

        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::Config(format!("Invalid header name '{name}' for {}: {e}", self.provider))
            })?;
            let mut header_value = HeaderValue::from_str(value).map_err(|e| {
                Error::Config(format!("Invalid value for header '{name}' for {}: {e}", self.provider))
            })?;
            if is_sensitive(&header) {
                header_value.set_sensitive(true);
            }
            map.insert(header, header_value);
        }

        reqwest::Client::builder()
            .default_headers(map)
            .user_agent(concat!("chroma-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::provider(self.provider, e.into()))
    }
}

fn is_sensitive(name: &HeaderName) -> bool {
    matches!(name.as_str(), "authorization" | "x-goog-api-key" | "x-api-key")
}

/// POST a JSON body and decode a JSON response.
///
/// Transport failures and non-success statuses become
/// [`Error::Provider`]; undecodable bodies become [`Error::InvalidResponse`].
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    provider: &'static str,
    url: &str,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    debug!(provider, url, "POST");

    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::provider(provider, e.into()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::provider(
            provider,
            ChromaError::from_response(status.as_u16(), &body),
        ));
    }

    response.json::<R>().await.map_err(|e| Error::InvalidResponse {
        provider,
        message: format!("failed to decode response: {e}"),
    })
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Reject batches larger than the provider accepts in one call.
pub(crate) fn check_batch_size(provider: &'static str, actual: usize, max: Option<usize>) -> Result<()> {
    match max {
        Some(max) if actual > max => Err(Error::BatchTooLarge { provider, actual, max }),
        _ => Ok(()),
    }
}

/// Check that the provider returned one vector per input.
pub(crate) fn ensure_aligned(
    provider: &'static str,
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>> {
    if vectors.len() == expected {
        Ok(vectors)
    } else {
        Err(Error::InvalidResponse {
            provider,
            message: format!("expected {expected} embeddings, got {}", vectors.len()),
        })
    }
}

/// A response entry tagged with the position of its input.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IndexedEmbedding {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// Restore input order from index-tagged entries.
///
/// Indices must cover `0..expected` exactly once.
pub(crate) fn sort_by_index(
    provider: &'static str,
    expected: usize,
    mut entries: Vec<IndexedEmbedding>,
) -> Result<Vec<Vec<f32>>> {
    entries.sort_by_key(|e| e.index);

    let in_order = entries.len() == expected && entries.iter().enumerate().all(|(i, e)| e.index == i);
    if !in_order {
        let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
        return Err(Error::InvalidResponse {
            provider,
            message: format!("expected indices 0..{expected}, got {indices:?}"),
        });
    }

    Ok(entries.into_iter().map(|e| e.embedding).collect())
}
