//! In-memory fetcher for offline replays and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{BodyStream, FetchError, Fetcher, PageResponse};

const MAX_REDIRECTS: usize = 10;
const CHUNK_SIZE: usize = 16 * 1024;

/// Bytes served for a URL plus an error raised once they are exhausted.
type Served = (Vec<u8>, Option<FetchError>);

#[derive(Debug, Clone)]
enum Route {
    Body(Vec<u8>),
    Redirect(String),
    Fail(FetchError),
    /// Serves `head`, then fails with `error` mid-stream.
    Broken { head: Vec<u8>, error: FetchError },
}

/// Fetcher serving a fixed URL table.
///
/// Unknown URLs answer 404. Every request is recorded so tests can assert
/// what was (or was not) fetched.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, url: &str) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
    }

    /// Serve `body` as a page at `url`.
    pub fn add_page(&self, url: &str, body: &str) -> &Self {
        self.routes()
            .insert(url.to_string(), Route::Body(body.as_bytes().to_vec()));
        self
    }

    /// Serve raw bytes at `url`.
    pub fn add_binary(&self, url: &str, bytes: &[u8]) -> &Self {
        self.routes().insert(url.to_string(), Route::Body(bytes.to_vec()));
        self
    }

    /// Redirect `from` to `to`.
    pub fn add_redirect(&self, from: &str, to: &str) -> &Self {
        self.routes()
            .insert(from.to_string(), Route::Redirect(to.to_string()));
        self
    }

    /// Fail every request to `url` with `error`.
    pub fn add_failure(&self, url: &str, error: FetchError) -> &Self {
        self.routes().insert(url.to_string(), Route::Fail(error));
        self
    }

    /// Serve `head` and then break the connection.
    pub fn add_broken_stream(&self, url: &str, head: &[u8], error: FetchError) -> &Self {
        self.routes().insert(
            url.to_string(),
            Route::Broken {
                head: head.to_vec(),
                error,
            },
        );
        self
    }

    /// All requested URLs in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// How many times `url` was requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| u.as_str() == url).count()
    }

    /// Follow redirects. Yields the final URL and either the served bytes
    /// (with an optional mid-stream error) or the request failure.
    fn resolve(&self, url: &str) -> (String, Result<Served, FetchError>) {
        let routes = self.routes();
        let mut current = url.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let served = match routes.get(&current) {
                Some(Route::Redirect(to)) => {
                    current = to.clone();
                    continue;
                }
                Some(Route::Body(bytes)) => Ok((bytes.clone(), None)),
                Some(Route::Broken { head, error }) => Ok((head.clone(), Some(error.clone()))),
                Some(Route::Fail(error)) => Err(error.clone()),
                None => Err(FetchError::Http {
                    status: 404,
                    url: current.clone(),
                }),
            };
            return (current, served);
        }
        let error = FetchError::Other(format!("too many redirects starting at {url}"));
        (current, Err(error))
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_page(&self, url: &str) -> PageResponse {
        self.record(url);
        let (final_url, served) = self.resolve(url);
        match served {
            Ok((bytes, None)) => PageResponse::success(String::from_utf8_lossy(&bytes), final_url),
            Ok((_, Some(error))) | Err(error) => PageResponse::failure(final_url, error),
        }
    }

    async fn open_stream(&self, url: &str) -> Result<Box<dyn BodyStream>, FetchError> {
        self.record(url);
        let (_, served) = self.resolve(url);
        let (bytes, trailing_error) = served?;
        Ok(Box::new(MemoryStream::new(bytes, trailing_error)))
    }
}

struct MemoryStream {
    chunks: std::vec::IntoIter<Vec<u8>>,
    trailing_error: Option<FetchError>,
}

impl MemoryStream {
    fn new(bytes: Vec<u8>, trailing_error: Option<FetchError>) -> Self {
        let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        Self {
            chunks: chunks.into_iter(),
            trailing_error,
        }
    }
}

#[async_trait]
impl BodyStream for MemoryStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, FetchError> {
        if let Some(chunk) = self.chunks.next() {
            return Ok(Some(chunk));
        }
        match self.trailing_error.take() {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }
}
