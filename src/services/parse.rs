//! The `parse` pipeline: crawl the archive, merge, persist.
//!
//! Nothing is written unless the whole pass succeeds and produced at least
//! one new episode.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::info;

use super::merge::{DatabaseMerger, Delta, MergeError, MergeMode};
use crate::models::Episode;
use crate::repository::{load_episodes, save_episodes, DbError, DbSource};
use crate::scrapers::{
    fetch_archive_links, ArchiveError, CrawlEvent, CrawlSession, Fetcher, IndexRegistry,
    LinkExtractor,
};

/// Inputs of one `parse` run.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub mode: MergeMode,
    pub archive_url: String,
    /// Stored collection to merge into. Ignored in raw mode.
    pub db_source: DbSource,
    /// File the merged collection is written to.
    pub output: PathBuf,
    /// Save fetched episode pages here when set.
    pub html_dir: Option<PathBuf>,
}

/// What a `parse` run did.
#[derive(Debug)]
pub enum ParseReport {
    /// Nothing new on the archive; nothing written.
    UpToDate,
    /// The merged collection was written to `path`.
    Written {
        path: PathBuf,
        added: Vec<Episode>,
        stubs: usize,
        skipped: Vec<(String, String)>,
        total: usize,
    },
}

/// Conditions that end a `parse` run without writing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Run the whole pipeline.
pub async fn run_parse(
    fetcher: &dyn Fetcher,
    options: &ParseOptions,
    events: Option<mpsc::Sender<CrawlEvent>>,
) -> Result<ParseReport, ParseError> {
    let links = fetch_archive_links(fetcher, &options.archive_url, &LinkExtractor::new()).await?;
    info!("Archive lists {} episode links", links.len());

    let prior = match options.mode {
        MergeMode::Raw => Vec::new(),
        _ => load_episodes(fetcher, &options.db_source).await?,
    };

    let merger = DatabaseMerger::new(options.mode);
    let delta = match merger.delta(&prior, &links)? {
        Delta::UpToDate => {
            info!("There are no new episodes");
            return Ok(ParseReport::UpToDate);
        }
        Delta::New(delta) => delta,
    };
    info!("{} link(s) to parse", delta.len());

    let registry = IndexRegistry::with_used(prior.iter().map(|ep| ep.index));
    let mut session = CrawlSession::new(fetcher)
        .with_registry(registry)
        .with_known(prior.iter().map(|ep| ep.url.as_str()));
    if let Some(dir) = &options.html_dir {
        session = session.with_html_dir(dir.clone());
    }
    if let Some(tx) = events {
        session = session.with_events(tx);
    }
    let report = session.crawl(&delta).await;

    if report.episodes.is_empty() {
        info!("No episodes came out of {} new link(s)", delta.len());
        return Ok(ParseReport::UpToDate);
    }

    let added = report.episodes.clone();
    let all = merger.merge(report.episodes, prior);
    save_episodes(&options.output, &all).await?;

    Ok(ParseReport::Written {
        path: options.output.clone(),
        added,
        stubs: report.stubs,
        skipped: report.skipped,
        total: all.len(),
    })
}
