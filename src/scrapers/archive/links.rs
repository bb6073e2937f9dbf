//! Episode link extraction from the archive page.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::{debug, info};

use super::ArchiveError;
use crate::config::{
    CORRECT_LTD, DUPLICATED_LINK_TEXT_RE, EPISODE_LINK_RE, IRRELEVANT_LINKS, LINK_TEXTS_MAPPING,
    MISSPELLED_LTD, SHORT_LINKS_MAPPING,
};
use crate::utils::html::{attr_matches, element_text, find_all_in, has_tag};

pub(crate) static EPISODE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EPISODE_LINK_RE).expect("episode link pattern should compile"));

static DUPLICATED_LINK_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DUPLICATED_LINK_TEXT_RE).expect("duplicate link text pattern should compile")
});

/// Episode links in archive order, as two parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveLinks {
    pub urls: Vec<String>,
    pub texts: Vec<String>,
}

impl ArchiveLinks {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    fn push(&mut self, url: String, text: String) {
        self.urls.push(url);
        self.texts.push(text);
    }

    /// `(url, text)` pairs in archive order.
    pub fn pairs(&self) -> impl DoubleEndedIterator<Item = (&str, &str)> {
        self.urls
            .iter()
            .map(String::as_str)
            .zip(self.texts.iter().map(String::as_str))
    }

    /// Keep only the pairs passing `keep`, preserving order.
    pub fn retain(&self, mut keep: impl FnMut(&str, &str) -> bool) -> Self {
        let mut out = Self::default();
        for (url, text) in self.pairs() {
            if keep(url, text) {
                out.push(url.to_string(), text.to_string());
            }
        }
        out
    }
}

/// Pulls episode links out of archive markup and applies the known corrections.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    irrelevant: HashSet<String>,
    short_links: HashMap<String, String>,
    text_fixes: HashMap<String, String>,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self {
            irrelevant: IRRELEVANT_LINKS.iter().map(|s| s.to_string()).collect(),
            short_links: SHORT_LINKS_MAPPING
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text_fixes: LINK_TEXTS_MAPPING
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract `(url, text)` pairs from archive markup, in document order.
    ///
    /// `source_url` is only used for error context.
    pub fn extract(&self, html: &str, source_url: &str) -> Result<ArchiveLinks, ArchiveError> {
        let markup = html.replace(MISSPELLED_LTD, CORRECT_LTD);
        let doc = Html::parse_document(&markup);

        if !has_tag(&doc, "article") {
            return Err(ArchiveError::NotAnEpisodeArchivePage {
                url: source_url.to_string(),
            });
        }

        let is_episode_link = attr_matches("href", |href| EPISODE_LINK.is_match(href));
        let anchors = find_all_in(&doc, "article", "a", |tag| {
            is_episode_link(tag) && !DUPLICATED_LINK_TEXT.is_match(tag.raw_text().trim())
        });

        let mut links = ArchiveLinks::default();
        for anchor in anchors {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let mut url = href.trim().to_string();
            if self.irrelevant.contains(&url) {
                info!("Removed irrelevant link: {}", url);
                continue;
            }
            if let Some(full) = self.short_links.get(&url) {
                debug!("Short link {} -> {}", url, full);
                url = full.clone();
            }
            let text = match self.text_fixes.get(&url) {
                Some(fixed) => fixed.clone(),
                None => element_text(anchor),
            };
            links.push(url, text);
        }

        if links.is_empty() {
            return Err(ArchiveError::NoEpisodeLinks {
                url: source_url.to_string(),
            });
        }

        debug!("Extracted {} episode links from {}", links.len(), source_url);
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHIVE: &str = "https://teacherluke.co.uk/episodes-2/";

    fn wrap(body: &str) -> String {
        format!("<html><body><a href=\"https://teacherluke.co.uk/2009/04/12/outside/\">outside</a><article>{body}</article></body></html>")
    }

    #[test]
    fn test_extracts_links_in_document_order() {
        let html = wrap(
            r#"<p><a href="https://teacherluke.co.uk/2021/08/03/733-a-summer-ramble/">733. A Summer
                <b>Ramble</b></a></p>
               <a href="https://teacherluke.co.uk/about/">About</a>
               <a href=" https://teacherluke.wordpress.com/2009/04/12/1-introduction/ ">1. Introduction</a>"#,
        );
        let links = LinkExtractor::new().extract(&html, ARCHIVE).unwrap();
        assert_eq!(
            links.urls,
            vec![
                "https://teacherluke.co.uk/2021/08/03/733-a-summer-ramble/",
                "https://teacherluke.wordpress.com/2009/04/12/1-introduction/",
            ]
        );
        assert_eq!(links.texts, vec!["733. A Summer Ramble", "1. Introduction"]);
    }

    #[test]
    fn test_anchors_without_href_are_ignored() {
        let html = wrap(
            r#"<a name="teacherluke.co.uk/2021/08/03/733-a-summer-ramble/">733. A Summer Ramble</a>
               <a href="https://teacherluke.co.uk/2021/07/29/732-walking-talking/">732. Walking</a>"#,
        );
        let links = LinkExtractor::new().extract(&html, ARCHIVE).unwrap();
        assert_eq!(links.urls, vec!["https://teacherluke.co.uk/2021/07/29/732-walking-talking/"]);
    }

    #[test]
    fn test_only_duplicate_markers_yields_no_links() {
        let html = wrap(
            r#"<a href="https://teacherluke.co.uk/2016/03/20/blab-video/">[VIDEO]</a>
               <a href="https://teacherluke.co.uk/2018/04/18/522-summer-school/">Episode 522</a>
               <a href="https://teacherluke.co.uk/2017/08/14/criminal-past/"> [Website content] </a>"#,
        );
        assert!(matches!(
            LinkExtractor::new().extract(&html, ARCHIVE),
            Err(ArchiveError::NoEpisodeLinks { .. })
        ));
    }

    #[test]
    fn test_missing_article_is_distinct_error() {
        let html = r#"<html><body><a href="https://teacherluke.co.uk/2021/08/03/a/">A</a></body></html>"#;
        assert!(matches!(
            LinkExtractor::new().extract(html, ARCHIVE),
            Err(ArchiveError::NotAnEpisodeArchivePage { .. })
        ));
    }

    #[test]
    fn test_misspelled_domain_is_fixed_before_matching() {
        let html = wrap(
            r#"<a href="https://teacherluke.co.ukm/2012/08/06/london-olympics-2012/">London Olympics 2012</a>"#,
        );
        let links = LinkExtractor::new().extract(&html, ARCHIVE).unwrap();
        assert_eq!(
            links.urls,
            vec!["https://teacherluke.co.uk/2012/08/06/london-olympics-2012/"]
        );
    }

    #[test]
    fn test_irrelevant_removed_and_short_links_substituted() {
        let html = wrap(
            r#"<a href="https://wp.me/P4IuUx-82H">Not an episode</a>
               <a href="http://wp.me/p4IuUx-7C4">443. The Trip to Japan (Part 2)</a>
               <a href="https://wp.me/p4IuUx-zzz">Unmapped short link</a>"#,
        );
        let links = LinkExtractor::new().extract(&html, ARCHIVE).unwrap();
        assert_eq!(
            links.urls,
            vec![
                "https://teacherluke.co.uk/2017/04/21/443-the-trip-to-japan-part-2/",
                "https://wp.me/p4IuUx-zzz",
            ]
        );
    }

    #[test]
    fn test_link_text_corrections_applied() {
        let html = wrap(
            r#"<a href="https://teacherluke.co.uk/2018/04/18/522-learning-english-at-summer-school-in-the-uk-a-rambling-chat-with-raphael-miller/">522. Learning English</a>"#,
        );
        let links = LinkExtractor::new().extract(&html, ARCHIVE).unwrap();
        assert_eq!(
            links.texts,
            vec!["522. Learning English at Summer School in the UK (A Rambling Chat with Raphael Miller)"]
        );
    }

    #[test]
    fn test_retain_keeps_pairs_aligned() {
        let links = ArchiveLinks {
            urls: vec!["a".into(), "b".into(), "c".into()],
            texts: vec!["A".into(), "B".into(), "C".into()],
        };
        let kept = links.retain(|url, _| url != "b");
        assert_eq!(kept.urls, vec!["a", "c"]);
        assert_eq!(kept.texts, vec!["A", "C"]);
    }
}
