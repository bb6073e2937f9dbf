//! Episode identity: index, number and URL date.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::links::EPISODE_LINK;

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,5}").expect("leading digits pattern should compile"));

/// The `YYYY/MM/DD` part of a post URL. The link must start the string.
fn dated_path(url: &str) -> Option<&str> {
    let caps = EPISODE_LINK.captures(url)?;
    if caps.get(0)?.start() != 0 {
        return None;
    }
    Some(caps.name("date")?.as_str())
}

/// Publish date embedded in a post URL (`.../YYYY/MM/DD/...`).
pub fn url_date(url: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(dated_path(url)?, "%Y/%m/%d").ok()
}

/// Episode number from the leading digits of a title, 0 when absent.
pub fn episode_number(title: &str) -> u32 {
    LEADING_DIGITS
        .find(title)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Indices handed out during one crawl.
///
/// An index is the URL date as `YYYYMMDD` followed by a two digit counter
/// starting at `01`; same-day posts get the next free value in the order
/// they are seen.
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    used: HashSet<u64>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that will never hand out any of `indices`.
    pub fn with_used(indices: impl IntoIterator<Item = u64>) -> Self {
        Self {
            used: indices.into_iter().collect(),
        }
    }

    /// Assign the next free index for `url`.
    ///
    /// Returns `None` when the URL carries no date, meaning it is not an
    /// episode post.
    pub fn assign(&mut self, url: &str) -> Option<u64> {
        let digits = dated_path(url)?.replace('/', "");
        let mut index: u64 = format!("{digits}01").parse().ok()?;
        while !self.used.insert(index) {
            index += 1;
        }
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
