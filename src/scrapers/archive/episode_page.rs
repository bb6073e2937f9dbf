//! Parsing of a single episode page.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use scraper::Html;
use tracing::debug;

use super::ArchiveError;
use crate::config::{AUDIO_LINK_TEXT_RE, BAD_AUDIO_ASSET_IDS, UNPARSED_PAGE_DATE};
use crate::models::PostType;
use crate::utils::html::{find_all_in, find_first_in, has_tag, Tag};

static AUDIO_LINK_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(AUDIO_LINK_TEXT_RE).expect("audio link pattern should compile"));

/// What an episode page says about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodePage {
    pub date: DateTime<FixedOffset>,
    /// One single-URL part per qualifying audio link, in page order.
    pub audios: Vec<Vec<String>>,
    pub post_type: PostType,
}

/// Date for pages whose publish time cannot be read.
pub fn unparsed_page_date() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(UNPARSED_PAGE_DATE).unwrap_or_default()
}

/// Parse an episode page.
///
/// Fails only when the page has no `<article>`; a missing publish time falls
/// back to [`unparsed_page_date`].
pub fn parse_episode_page(html: &str, url: &str) -> Result<EpisodePage, ArchiveError> {
    let doc = Html::parse_document(html);
    if !has_tag(&doc, "article") {
        return Err(ArchiveError::MissingArticle {
            url: url.to_string(),
        });
    }

    let date = publish_date(&doc).unwrap_or_else(|| {
        debug!("No publish time on {}", url);
        unparsed_page_date()
    });

    let audios: Vec<Vec<String>> = find_all_in(&doc, "article", "a", is_audio_link)
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .map(|href| vec![href.to_string()])
        .collect();

    let post_type = if audios.is_empty() {
        PostType::Text
    } else {
        PostType::Audio
    };

    Ok(EpisodePage {
        date,
        audios,
        post_type,
    })
}

fn publish_date(doc: &Html) -> Option<DateTime<FixedOffset>> {
    let time = find_first_in(doc, "article", "time", |t| {
        t.has_class("entry-date") && t.attr("datetime").is_some()
    })?;
    let value = time.value().attr("datetime")?;
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

/// Audio file target that is not site noise.
fn is_audio_href(href: &str) -> bool {
    let href = href.to_lowercase();
    href.ends_with(".mp3")
        && !href.contains("uploads")
        && !BAD_AUDIO_ASSET_IDS.iter().any(|id| href.contains(id))
}

/// Anchor to an episode audio with "download"-style wording.
fn is_audio_link(tag: &Tag<'_>) -> bool {
    if !tag.attr("href").is_some_and(is_audio_href) {
        return false;
    }
    let text = tag.raw_text();
    !text.contains("http") && AUDIO_LINK_TEXT.is_match(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://teacherluke.co.uk/2021/08/03/733-a-summer-ramble/";

    #[test]
    fn test_audio_page() {
        let html = r#"<html><body><article>
            <time class="entry-date published" datetime="2021-08-03T15:57:11+01:00">3 August</time>
            <p><a href="https://audioboom.com/posts/7898765-733.mp3">DOWNLOAD EPISODE</a></p>
            <p><a href="https://audioboom.com/posts/other.mp3">https://audioboom.com/posts/other.mp3 click here</a></p>
            <p><a href="https://teacherluke.co.uk/wp-content/uploads/jingle.mp3">Download jingle</a></p>
            <p><a href="https://audioboom.com/boos/2794795-broken.mp3">Download</a></p>
            <p><a href="https://example.com/notes.pdf">Download notes</a></p>
        </article></body></html>"#;
        let page = parse_episode_page(html, URL).unwrap();
        assert_eq!(page.post_type, PostType::Audio);
        assert_eq!(
            page.audios,
            vec![vec!["https://audioboom.com/posts/7898765-733.mp3".to_string()]]
        );
        assert_eq!(page.date.to_rfc3339(), "2021-08-03T15:57:11+01:00");
    }

    #[test]
    fn test_multi_part_audio_in_page_order() {
        let html = r#"<article>
            <a href="https://cdn.example/part1.MP3">Click here to download part 1</a>
            <a href="https://cdn.example/part2.mp3">Audio part 2</a>
        </article>"#;
        let page = parse_episode_page(html, URL).unwrap();
        assert_eq!(page.audios.len(), 2);
        assert_eq!(page.audios[1], vec!["https://cdn.example/part2.mp3".to_string()]);
    }

    #[test]
    fn test_text_page_without_time_uses_sentinel() {
        let html = "<article><p>Just words</p></article>";
        let page = parse_episode_page(html, URL).unwrap();
        assert_eq!(page.post_type, PostType::Text);
        assert!(page.audios.is_empty());
        assert_eq!(page.date, unparsed_page_date());
    }

    #[test]
    fn test_missing_article_is_error() {
        assert!(matches!(
            parse_episode_page("<html><body><p>Members only</p></body></html>", URL),
            Err(ArchiveError::MissingArticle { .. })
        ));
    }
}
