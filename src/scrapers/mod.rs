//! Network-facing side of lep-downloader: HTTP transport and archive crawling.

pub mod archive;
pub mod http_client;

pub use archive::{
    fetch_archive_links, ArchiveError, ArchiveLinks, CrawlEvent, CrawlReport, CrawlSession,
    EpisodeOutcome, IndexRegistry, LinkExtractor,
};
pub use http_client::{BodyStream, FetchError, Fetcher, HttpClient, MemoryFetcher, PageResponse};
