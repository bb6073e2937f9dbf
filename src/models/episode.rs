//! Episode record as stored in the JSON database.

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::UNKNOWN_DATE;
use crate::utils::url_key;

/// Kind of post published on the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostType {
    #[serde(rename = "AUDIO")]
    Audio,
    #[default]
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "VIDEO")]
    Video,
    /// Stub marker for pages that could not be fetched.
    #[serde(rename = "", other)]
    Unknown,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "AUDIO",
            Self::Text => "TEXT",
            Self::Video => "VIDEO",
            Self::Unknown => "",
        }
    }
}

/// URLs of every downloadable file of an episode.
///
/// `audios` and `atrack` hold one inner list per part; each inner list is the
/// ordered fallback chain for that part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeFiles {
    #[serde(default, deserialize_with = "nested_urls")]
    pub audios: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "nested_urls")]
    pub atrack: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "flat_urls")]
    pub page_pdf: Vec<String>,
}

/// One podcast post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Number from the leading digits of the title, 0 for non-numbered posts.
    pub episode: u32,
    #[serde(
        default = "unknown_date",
        serialize_with = "serialize_date",
        deserialize_with = "deserialize_date"
    )]
    pub date: DateTime<FixedOffset>,
    /// Final URL after redirects.
    pub url: String,
    /// Title from the archive link, safe for use in file names.
    pub post_title: String,
    #[serde(default, deserialize_with = "post_type_or_stub")]
    pub post_type: PostType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: EpisodeFiles,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parsed_at: String,
    /// `YYYYMMDD` of the post date followed by a same-day counter.
    pub index: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin_note: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

impl Episode {
    /// New episode with defaults for everything except identity.
    pub fn new(episode: u32, url: impl Into<String>, post_title: impl Into<String>, index: u64) -> Self {
        Self {
            episode,
            date: unknown_date(),
            url: url.into(),
            post_title: post_title.into(),
            post_type: PostType::Text,
            files: EpisodeFiles::default(),
            parsed_at: String::new(),
            index,
            admin_note: String::new(),
            updated_at: String::new(),
        }
    }

    /// `YYYY-MM-DD` in the post's own timezone.
    pub fn short_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn publish_day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// Normalized URL used to decide whether an archive link is already known.
    pub fn url_key(&self) -> String {
        url_key(&self.url)
    }

    pub fn is_stub(&self) -> bool {
        self.post_type == PostType::Unknown
    }
}

/// Sort newest first; same-moment posts are ordered by descending index.
pub fn sort_newest_first(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.index.cmp(&a.index)));
}

/// Selection of stored episodes for downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeFilter {
    /// Only the first episode in stored order (the most recent one).
    Last,
    /// Episode numbers within an inclusive range.
    Numbers { start: u32, end: u32 },
    /// Publish days within an inclusive range; open ends are unbounded.
    Dates {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl Default for EpisodeFilter {
    fn default() -> Self {
        Self::Numbers { start: 0, end: 9999 }
    }
}

impl EpisodeFilter {
    /// Apply the filter, keeping stored order.
    pub fn apply(&self, episodes: &[Episode]) -> Vec<Episode> {
        match self {
            Self::Last => episodes.iter().take(1).cloned().collect(),
            Self::Numbers { start, end } => {
                let (lo, hi) = if start <= end { (*start, *end) } else { (*end, *start) };
                episodes
                    .iter()
                    .filter(|ep| (lo..=hi).contains(&ep.episode))
                    .cloned()
                    .collect()
            }
            Self::Dates { start, end } => {
                let lo = start.unwrap_or(NaiveDate::MIN);
                let hi = end.unwrap_or(NaiveDate::MAX);
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                episodes
                    .iter()
                    .filter(|ep| (lo..=hi).contains(&ep.publish_day()))
                    .cloned()
                    .collect()
            }
        }
    }
}

pub(crate) fn unknown_date() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(UNKNOWN_DATE).unwrap_or_default()
}

fn serialize_date<S: Serializer>(date: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

fn deserialize_date<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<FixedOffset>, D::Error> {
    match Option::<String>::deserialize(d)? {
        None => Ok(unknown_date()),
        Some(text) => DateTime::parse_from_rfc3339(text.trim()).map_err(serde::de::Error::custom),
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn post_type_or_stub<'de, D: Deserializer<'de>>(d: D) -> Result<PostType, D::Error> {
    Ok(Option::<PostType>::deserialize(d)?.unwrap_or(PostType::Unknown))
}

/// A stored part is either a bare URL or a list of fallback URLs.
#[derive(Deserialize)]
#[serde(untagged)]
enum UrlGroup {
    One(String),
    Many(Vec<String>),
}

impl UrlGroup {
    fn into_urls(self) -> Vec<String> {
        match self {
            Self::One(url) => vec![url],
            Self::Many(urls) => urls,
        }
    }
}

fn nested_urls<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<String>>, D::Error> {
    let groups: Option<Vec<Option<UrlGroup>>> = Option::deserialize(d)?;
    Ok(groups
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(UrlGroup::into_urls)
        .filter(|urls| !urls.is_empty())
        .collect())
}

fn flat_urls<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let groups: Option<Vec<Option<UrlGroup>>> = Option::deserialize(d)?;
    Ok(groups
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .flat_map(UrlGroup::into_urls)
        .collect())
}
