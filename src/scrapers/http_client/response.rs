//! Fetch results and streaming bodies.

use async_trait::async_trait;

/// Reason a request failed.
///
/// The `Display` form is `"<kind> | <detail>"`, which is what ends up after
/// the `[ERROR]: ` prefix of a failed [`PageResponse`] body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error | {status} for url: {url}")]
    Http { status: u16, url: String },

    #[error("Timeout | {0}")]
    Timeout(String),

    #[error("Bad request | {0}")]
    Connection(String),

    #[error("Unhandled error | {0}")]
    Other(String),
}

impl FetchError {
    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }
}

/// Page text plus the URL it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub body: String,
    pub final_url: String,
    pub ok: bool,
    pub error: Option<FetchError>,
}

impl PageResponse {
    pub fn success(body: impl Into<String>, final_url: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            final_url: final_url.into(),
            ok: true,
            error: None,
        }
    }

    /// Failed fetch. The body carries the `[ERROR]: ...` description.
    pub fn failure(final_url: impl Into<String>, error: FetchError) -> Self {
        Self {
            body: format!("[ERROR]: {error}"),
            final_url: final_url.into(),
            ok: false,
            error: Some(error),
        }
    }
}

/// Response body read chunk by chunk.
#[async_trait]
pub trait BodyStream: Send {
    /// Next chunk, or `None` once the body is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError>;
}
