//! HTTP transport behind the [`Fetcher`] trait.
//!
//! Everything that talks to the network goes through a `Fetcher`, so the
//! crawler, database loader and download engine can be driven by
//! [`MemoryFetcher`] in tests and offline replays.

mod memory;
mod response;
mod user_agent;

pub use memory::MemoryFetcher;
pub use response::{BodyStream, FetchError, PageResponse};
pub use user_agent::{resolve_user_agent, BROWSER_USER_AGENT, USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Settings;

/// Source of pages and binary bodies.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a page as text, following redirects.
    ///
    /// Never fails outright: failures come back as `ok == false` with an
    /// `[ERROR]: ...` body and the typed reason in `error`.
    async fn fetch_page(&self, url: &str) -> PageResponse;

    /// Open a body for streaming. Non-2xx statuses are errors.
    async fn open_stream(&self, url: &str) -> Result<Box<dyn BodyStream>, FetchError>;
}

/// reqwest-backed fetcher with a connect/read timeout pair.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, FetchError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Create a client from runtime settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Self::new(
            settings.connect_timeout(),
            settings.read_timeout(),
            settings.user_agent.as_deref(),
        )
    }
}

/// Map a reqwest error onto the fetch failure kinds.
fn classify(err: &reqwest::Error, url: &str) -> FetchError {
    if let Some(status) = err.status() {
        FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        }
    } else if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        FetchError::Connection(err.to_string())
    } else {
        FetchError::Other(err.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch_page(&self, url: &str) -> PageResponse {
        debug!("GET {}", url);
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                let error = classify(&e, url);
                warn!("Request to {} failed: {}", url, error);
                return PageResponse::failure(url, error);
            }
        };

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            let error = FetchError::Http {
                status: status.as_u16(),
                url: final_url.clone(),
            };
            warn!("{}", error);
            return PageResponse::failure(final_url, error);
        }

        // Pages are always decoded as UTF-8 regardless of the declared charset.
        match response.bytes().await {
            Ok(body) => PageResponse::success(String::from_utf8_lossy(&body), final_url),
            Err(e) => {
                let error = classify(&e, &final_url);
                warn!("Reading {} failed: {}", final_url, error);
                PageResponse::failure(final_url, error)
            }
        }
    }

    async fn open_stream(&self, url: &str) -> Result<Box<dyn BodyStream>, FetchError> {
        debug!("GET (stream) {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(&e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(Box::new(ReqwestStream {
            url: url.to_string(),
            response,
        }))
    }
}

struct ReqwestStream {
    url: String,
    response: reqwest::Response,
}

#[async_trait]
impl BodyStream for ReqwestStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError> {
        match self.response.chunk().await {
            Ok(chunk) => Ok(chunk.map(|bytes| bytes.to_vec())),
            Err(e) => Err(classify(&e, &self.url)),
        }
    }
}
