//! Sequential crawl over archive links.
//!
//! A crawl goes `fetch archive -> extract links -> parse each episode`. The
//! first two steps fail the whole run; per-episode problems never do. Each
//! episode step returns an [`EpisodeOutcome`] that the loop matches on.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::episode_page::{parse_episode_page, unparsed_page_date};
use super::identity::{episode_number, IndexRegistry};
use super::links::{ArchiveLinks, LinkExtractor};
use super::ArchiveError;
use crate::config::ADMIN_NOTE_SNIPPET_LEN;
use crate::models::{Episode, PostType};
use crate::scrapers::http_client::{FetchError, Fetcher};
use crate::utils::{canonical_url, sanitize_filename, truncate_chars, url_key};

/// Result of one episode step.
#[derive(Debug, Clone)]
pub enum EpisodeOutcome {
    /// Page fetched and parsed.
    Parsed(Episode),
    /// Final URL carries no date; not an episode, left out of the collection.
    Skipped { url: String, reason: String },
    /// Page could not be fetched or has no article. Recorded as a placeholder.
    Stub { episode: Episode, error: ArchiveError },
}

/// Progress notifications emitted during a crawl.
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// Crawl started over `total` links.
    Started { total: usize },
    Parsed { title: String },
    Skipped { url: String, reason: String },
    Stub { url: String, error: String },
}

/// Everything a crawl produced, oldest first.
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Parsed episodes and stubs.
    pub episodes: Vec<Episode>,
    pub stubs: usize,
    /// `(url, reason)` of links left out of the collection.
    pub skipped: Vec<(String, String)>,
}

/// Fetch the archive page and extract its episode links.
pub async fn fetch_archive_links(
    fetcher: &dyn Fetcher,
    archive_url: &str,
    extractor: &LinkExtractor,
) -> Result<ArchiveLinks, ArchiveError> {
    info!("Fetching archive page {}", archive_url);
    let page = fetcher.fetch_page(archive_url).await;
    if !page.ok {
        let error = page
            .error
            .unwrap_or_else(|| FetchError::Other(page.body.clone()));
        return Err(ArchiveError::Fetch(error));
    }
    extractor.extract(&page.body, &page.final_url)
}

/// State of one crawl run: the fetcher, the index registry and output options.
pub struct CrawlSession<'a> {
    fetcher: &'a dyn Fetcher,
    registry: IndexRegistry,
    /// Normalized URLs of episodes already stored or parsed in this run.
    known: HashSet<String>,
    html_dir: Option<PathBuf>,
    events: Option<mpsc::Sender<CrawlEvent>>,
}

impl<'a> CrawlSession<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            registry: IndexRegistry::new(),
            known: HashSet::new(),
            html_dir: None,
            events: None,
        }
    }

    /// Use a pre-seeded registry, e.g. holding indices already stored.
    pub fn with_registry(mut self, registry: IndexRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Treat `urls` as already stored: pages redirecting to one of them are skipped.
    pub fn with_known<'u>(mut self, urls: impl IntoIterator<Item = &'u str>) -> Self {
        self.known.extend(urls.into_iter().map(url_key));
        self
    }

    /// Also save every parsed page into `dir`.
    pub fn with_html_dir(mut self, dir: PathBuf) -> Self {
        self.html_dir = Some(dir);
        self
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<CrawlEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    async fn emit(&self, event: CrawlEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Parse every link, oldest first.
    pub async fn crawl(&mut self, links: &ArchiveLinks) -> CrawlReport {
        self.emit(CrawlEvent::Started { total: links.len() }).await;

        let mut report = CrawlReport::default();
        for (url, title) in links.pairs().rev() {
            match self.parse_episode(url, title).await {
                EpisodeOutcome::Parsed(episode) => {
                    self.emit(CrawlEvent::Parsed {
                        title: episode.post_title.clone(),
                    })
                    .await;
                    report.episodes.push(episode);
                }
                EpisodeOutcome::Stub { episode, error } => {
                    warn!("Recorded stub for {}: {}", episode.url, error);
                    self.emit(CrawlEvent::Stub {
                        url: episode.url.clone(),
                        error: error.to_string(),
                    })
                    .await;
                    report.stubs += 1;
                    report.episodes.push(episode);
                }
                EpisodeOutcome::Skipped { url, reason } => {
                    warn!("Skipped {}: {}", url, reason);
                    self.emit(CrawlEvent::Skipped {
                        url: url.clone(),
                        reason: reason.clone(),
                    })
                    .await;
                    report.skipped.push((url, reason));
                }
            }
        }

        info!(
            "Crawled {} links: {} episodes ({} stubs), {} skipped",
            links.len(),
            report.episodes.len(),
            report.stubs,
            report.skipped.len()
        );
        report
    }

    /// Fetch and parse one episode page.
    pub async fn parse_episode(&mut self, url: &str, title: &str) -> EpisodeOutcome {
        let page = self.fetcher.fetch_page(url).await;

        let key = url_key(&page.final_url);
        if self.known.contains(&key) {
            return EpisodeOutcome::Skipped {
                url: page.final_url,
                reason: "episode is already stored".to_string(),
            };
        }

        let Some(index) = self.registry.assign(&page.final_url) else {
            return EpisodeOutcome::Skipped {
                url: page.final_url,
                reason: "final URL has no post date".to_string(),
            };
        };

        let mut episode = Episode::new(
            episode_number(title),
            canonical_url(&page.final_url),
            sanitize_filename(title),
            index,
        );
        self.known.insert(key);
        episode.parsed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        if !page.ok {
            episode.post_type = PostType::Unknown;
            episode.admin_note = truncate_chars(&page.body, ADMIN_NOTE_SNIPPET_LEN);
            let error = page
                .error
                .unwrap_or_else(|| FetchError::Other(page.body.clone()));
            return EpisodeOutcome::Stub {
                episode,
                error: ArchiveError::Fetch(error),
            };
        }

        match parse_episode_page(&page.body, &page.final_url) {
            Ok(parsed) => {
                episode.date = parsed.date;
                episode.post_type = parsed.post_type;
                episode.files.audios = parsed.audios;
                debug!(
                    "Parsed {} [{}] with {} audio part(s)",
                    episode.url,
                    episode.post_type.as_str(),
                    episode.files.audios.len()
                );
                self.save_html(&episode, &page.body).await;
                EpisodeOutcome::Parsed(episode)
            }
            Err(error) => {
                episode.date = unparsed_page_date();
                episode.post_type = PostType::Text;
                episode.admin_note = truncate_chars(&page.body, ADMIN_NOTE_SNIPPET_LEN);
                EpisodeOutcome::Stub { episode, error }
            }
        }
    }

    async fn save_html(&self, episode: &Episode, body: &str) {
        let Some(dir) = &self.html_dir else {
            return;
        };
        let name = sanitize_filename(&format!(
            "[{}] # {}.html",
            episode.short_date(),
            episode.post_title
        ));
        let path = dir.join(name);
        if let Err(e) = tokio::fs::write(&path, body).await {
            warn!("Cannot save page {}: {}", path.display(), e);
        }
    }
}
