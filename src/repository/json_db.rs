//! Flat JSON file holding the episode collection.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::Episode;
use crate::scrapers::Fetcher;

/// Where a stored episode collection comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbSource {
    Remote(Url),
    Local(PathBuf),
}

impl DbSource {
    /// `http(s)://` URLs are remote, anything else is a local path.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(location)),
        }
    }
}

impl fmt::Display for DbSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Errors loading or saving the episode database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("JSON database is not available at {location}: {reason}")]
    Unavailable { location: String, reason: String },

    #[error("data at {location} is not a valid JSON document: {detail}")]
    InvalidJson { location: String, detail: String },

    #[error("JSON file {location} has no valid episode objects")]
    NoValidEpisodes { location: String },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize episodes: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Decode a stored collection, dropping records that do not fit the episode shape.
///
/// Fails when the text is not JSON, is not an array, or yields no valid record.
pub fn decode_episodes(text: &str, location: &str) -> Result<Vec<Episode>, DbError> {
    let value: Value = serde_json::from_str(text).map_err(|e| DbError::InvalidJson {
        location: location.to_string(),
        detail: e.to_string(),
    })?;

    let Value::Array(items) = value else {
        return Err(DbError::NoValidEpisodes {
            location: location.to_string(),
        });
    };

    let total = items.len();
    let episodes: Vec<Episode> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<Episode>(item) {
            Ok(ep) => Some(ep),
            Err(e) => {
                warn!("Dropped invalid record #{} in {}: {}", i, location, e);
                None
            }
        })
        .collect();

    if episodes.is_empty() {
        return Err(DbError::NoValidEpisodes {
            location: location.to_string(),
        });
    }
    if episodes.len() < total {
        warn!(
            "{} of {} records in {} were invalid",
            total - episodes.len(),
            total,
            location
        );
    }
    debug!("Decoded {} episodes from {}", episodes.len(), location);
    Ok(episodes)
}

/// Load the stored collection from a URL or a local file.
pub async fn load_episodes(fetcher: &dyn Fetcher, source: &DbSource) -> Result<Vec<Episode>, DbError> {
    let location = source.to_string();
    let text = match source {
        DbSource::Remote(url) => {
            let page = fetcher.fetch_page(url.as_str()).await;
            if !page.ok {
                return Err(DbError::Unavailable {
                    location,
                    reason: page.body,
                });
            }
            page.body
        }
        DbSource::Local(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DbError::Unavailable {
                    location: location.clone(),
                    reason: e.to_string(),
                })?
        }
    };
    info!("Loaded JSON database from {}", location);
    decode_episodes(&text, &location)
}

/// Serialize with 4-space indentation, keys in declaration order, UTF-8 as is.
pub fn encode_episodes(episodes: &[Episode]) -> Result<String, DbError> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    episodes.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Overwrite `path` with the whole collection.
///
/// Writes a sibling temp file first and renames it over the target.
pub async fn save_episodes(path: &Path, episodes: &[Episode]) -> Result<(), DbError> {
    let json = encode_episodes(episodes)?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| DbError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, json.as_bytes()).await.map_err(io_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(e));
    }
    info!("Saved {} episodes to {}", episodes.len(), path.display());
    Ok(())
}
