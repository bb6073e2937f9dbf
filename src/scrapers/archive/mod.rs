//! Archive crawling: link extraction, episode identity and page parsing.

mod crawler;
mod episode_page;
mod identity;
mod links;

pub use crawler::{fetch_archive_links, CrawlEvent, CrawlReport, CrawlSession, EpisodeOutcome};
pub use episode_page::{parse_episode_page, unparsed_page_date, EpisodePage};
pub use identity::{episode_number, url_date, IndexRegistry};
pub use links::{ArchiveLinks, LinkExtractor};

use super::http_client::FetchError;

/// Structural problems with archive or episode pages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    #[error("no <article> on {url}, it is not an episode archive page")]
    NotAnEpisodeArchivePage { url: String },

    #[error("no episode links found on {url}")]
    NoEpisodeLinks { url: String },

    #[error("no <article> on episode page {url}")]
    MissingArticle { url: String },

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}
