//! Reconciling a stored episode collection with the live archive.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::models::{sort_newest_first, Episode};
use crate::scrapers::archive::url_date;
use crate::scrapers::ArchiveLinks;
use crate::utils::url_key;

/// Which archive links get parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MergeMode {
    /// Every archive link; the stored collection is ignored.
    Raw,
    /// Links dated after the newest stored episode and not yet known.
    #[default]
    Fetch,
    /// Every link not yet known, wherever it sits in history.
    Pull,
}

/// Links that still need parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    UpToDate,
    New(ArchiveLinks),
}

/// Stored data that cannot be reconciled with the archive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("database contains more episodes ({stored}) than current archive ({live})")]
    ArchiveShrank { stored: usize, live: usize },
}

/// Decides what to parse and combines the result with what was stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseMerger {
    mode: MergeMode,
}

impl DatabaseMerger {
    pub fn new(mode: MergeMode) -> Self {
        Self { mode }
    }

    /// Compute the links to parse.
    ///
    /// Links are compared by normalized URL, never by title.
    pub fn delta(&self, prior: &[Episode], live: &ArchiveLinks) -> Result<Delta, MergeError> {
        if self.mode != MergeMode::Raw && prior.len() > live.len() {
            warn!(
                "Database contains more episodes ({}) than current archive ({})",
                prior.len(),
                live.len()
            );
            return Err(MergeError::ArchiveShrank {
                stored: prior.len(),
                live: live.len(),
            });
        }

        let known: HashSet<String> = prior.iter().map(Episode::url_key).collect();
        let new = match self.mode {
            MergeMode::Raw => live.clone(),
            MergeMode::Pull => live.retain(|url, _| !known.contains(&url_key(url))),
            MergeMode::Fetch => {
                let Some(newest) = prior.first() else {
                    return Ok(Self::wrap(live.clone()));
                };
                let reference = url_date(&newest.url).unwrap_or_else(|| newest.publish_day());
                info!("Newest stored episode: {} ({})", newest.url, reference);
                live.retain(|url, _| {
                    url_date(url).is_some_and(|date| date > reference)
                        && !known.contains(&url_key(url))
                })
            }
        };
        Ok(Self::wrap(new))
    }

    fn wrap(links: ArchiveLinks) -> Delta {
        if links.is_empty() {
            Delta::UpToDate
        } else {
            Delta::New(links)
        }
    }

    /// `new ++ prior`, sorted newest first. Raw mode drops `prior`.
    pub fn merge(&self, new: Vec<Episode>, prior: Vec<Episode>) -> Vec<Episode> {
        let mut all = new;
        if self.mode != MergeMode::Raw {
            all.extend(prior);
        }
        sort_newest_first(&mut all);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn stored(url: &str, date: &str, index: u64) -> Episode {
        let mut ep = Episode::new(0, url, "t", index);
        ep.date = DateTime::parse_from_rfc3339(date).unwrap();
        ep
    }

    fn links(urls: &[&str]) -> ArchiveLinks {
        ArchiveLinks {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            texts: urls.iter().map(|u| format!("title of {u}")).collect(),
        }
    }

    fn prior() -> Vec<Episode> {
        vec![
            stored("https://teacherluke.co.uk/2021/08/01/b/", "2021-08-01T10:00:00+01:00", 2021080101),
            stored("https://teacherluke.co.uk/2021/07/01/a/", "2021-07-01T10:00:00+01:00", 2021070101),
        ]
    }

    #[test]
    fn test_fetch_delta_is_newer_than_reference() {
        let live = links(&[
            "https://teacherluke.co.uk/2021/08/03/d/",
            "https://teacherluke.co.uk/2021/08/02/c/",
            "https://teacherluke.co.uk/2021/08/01/b/",
            "https://teacherluke.co.uk/2021/07/15/gap/",
            "https://teacherluke.co.uk/2021/07/01/a/",
        ]);
        let Delta::New(delta) = DatabaseMerger::new(MergeMode::Fetch).delta(&prior(), &live).unwrap() else {
            panic!("expected new links");
        };
        assert_eq!(
            delta.urls,
            vec![
                "https://teacherluke.co.uk/2021/08/03/d/",
                "https://teacherluke.co.uk/2021/08/02/c/",
            ]
        );
        assert_eq!(delta.texts[0], "title of https://teacherluke.co.uk/2021/08/03/d/");
    }

    #[test]
    fn test_pull_delta_fills_gaps() {
        let live = links(&[
            "https://teacherluke.co.uk/2021/08/01/B/",
            "https://teacherluke.co.uk/2021/07/15/gap/",
            "https://teacherluke.co.uk/2021/07/01/a/",
        ]);
        let Delta::New(delta) = DatabaseMerger::new(MergeMode::Pull).delta(&prior(), &live).unwrap() else {
            panic!("expected new links");
        };
        assert_eq!(delta.urls, vec!["https://teacherluke.co.uk/2021/07/15/gap/"]);
    }

    #[test]
    fn test_unchanged_archive_is_up_to_date() {
        let live = links(&[
            "https://teacherluke.co.uk/2021/08/01/b/",
            "https://teacherluke.co.uk/2021/07/01/a/",
            "https://wp.me/p4IuUx-undated",
        ]);
        assert_eq!(
            DatabaseMerger::new(MergeMode::Fetch).delta(&prior(), &live).unwrap(),
            Delta::UpToDate
        );
        // The undated short link is still unknown, so pull picks it up.
        let Delta::New(pulled) = DatabaseMerger::new(MergeMode::Pull).delta(&prior(), &live).unwrap() else {
            panic!("expected the undated link");
        };
        assert_eq!(pulled.urls, vec!["https://wp.me/p4IuUx-undated"]);
    }

    #[test]
    fn test_archive_shrank_is_reported_with_counts() {
        let prior: Vec<Episode> = (0..800)
            .map(|i| stored(&format!("https://teacherluke.co.uk/2020/01/01/{i}/"), "2020-01-01T00:00:00+00:00", i))
            .collect();
        let urls: Vec<String> = (0..786)
            .map(|i| format!("https://teacherluke.co.uk/2020/01/01/{i}/"))
            .collect();
        let live = ArchiveLinks {
            texts: urls.clone(),
            urls,
        };
        assert_eq!(
            DatabaseMerger::new(MergeMode::Fetch).delta(&prior, &live),
            Err(MergeError::ArchiveShrank { stored: 800, live: 786 })
        );
        assert!(DatabaseMerger::new(MergeMode::Raw).delta(&prior, &live).is_ok());
    }

    #[test]
    fn test_merge_sorts_by_date_then_index() {
        let new = vec![
            stored("https://teacherluke.co.uk/2021/08/01/c/", "2021-08-01T10:00:00+01:00", 2021080102),
            stored("https://teacherluke.co.uk/2021/09/01/d/", "2021-09-01T10:00:00+01:00", 2021090101),
        ];
        let merged = DatabaseMerger::new(MergeMode::Fetch).merge(new, prior());
        let order: Vec<u64> = merged.iter().map(|e| e.index).collect();
        assert_eq!(order, vec![2021090101, 2021080102, 2021080101, 2021070101]);
    }

    #[test]
    fn test_raw_merge_ignores_prior() {
        let new = vec![stored("https://teacherluke.co.uk/2021/09/01/d/", "2021-09-01T10:00:00+01:00", 2021090101)];
        assert_eq!(DatabaseMerger::new(MergeMode::Raw).merge(new, prior()).len(), 1);
    }
}
