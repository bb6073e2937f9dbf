//! Configuration for lep-downloader.
//!
//! Two layers live here: compile-time knowledge about the podcast site
//! (URLs, link corrections, patterns) and runtime [`Settings`] loaded from an
//! optional TOML file and overridden by environment and CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Archive page listing every episode.
pub const ARCHIVE_URL: &str = "https://teacherluke.co.uk/episodes-2/";

/// Published JSON database of already parsed episodes.
pub const JSON_DB_URL: &str = "https://hotenov.com/d/lep/v3-lep-db.min.json";

/// Storage used as the secondary source for every downloadable file.
pub const DOWNLOADS_BASE_URL: &str = "https://hotenov.com/d/lep/";

/// File name of the database written by `parse`.
pub const DEFAULT_JSON_NAME: &str = "lep-db.min.json";

/// Log file written into the destination directory in debug mode.
pub const DEBUG_FILENAME: &str = "_lep_debug_.log";

/// Default directory for saved episode pages.
pub const PATH_TO_HTML_FILES: &str = "data_dump";

/// Config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "lepdl.toml";

/// Connect timeout for every request, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;

/// Read timeout for every request, in seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 33;

/// Matches episode links: the link shortener or a dated post path.
/// The `date` group captures `YYYY/MM/DD`.
pub const EPISODE_LINK_RE: &str = r"(?i)https?://((?P<short>wp\.me/p4IuUx-[\w-]+)|(teacherluke\.(co\.uk|wordpress\.com)/(?P<date>\d{4}/\d{2}/\d{2})/))";

/// Link texts marking a second link to content already linked nearby.
pub const DUPLICATED_LINK_TEXT_RE: &str = r"(?i)^\[(website\scontent|video)\]$|episode\s522$";

/// Visible text of an anchor that points to an episode audio file.
pub const AUDIO_LINK_TEXT_RE: &str = r"(?i)download\b|audio\s|click\s";

/// Misspelled top-level domain occurring in the archive markup.
pub const MISSPELLED_LTD: &str = ".co.ukm";

/// Correct replacement for [`MISSPELLED_LTD`].
pub const CORRECT_LTD: &str = ".co.uk";

/// Audio hosting asset IDs that are known to be broken.
pub const BAD_AUDIO_ASSET_IDS: &[&str] = &["boos/2794795", "boos/3727124"];

/// Links on the archive page that do not lead to an episode.
pub const IRRELEVANT_LINKS: &[&str] = &["https://wp.me/P4IuUx-82H"];

/// Short links on the archive page and the posts they resolve to.
pub const SHORT_LINKS_MAPPING: &[(&str, &str)] = &[
    (
        "http://wp.me/p4IuUx-7PL",
        "https://teacherluke.co.uk/2017/06/20/460-catching-up-with-amber-paul-6-feat-sarah-donnelly/",
    ),
    (
        "http://wp.me/p4IuUx-7C6",
        "https://teacherluke.co.uk/2017/04/25/444-the-rick-thompson-report-snap-general-election-2017/",
    ),
    (
        "http://wp.me/p4IuUx-7C4",
        "https://teacherluke.co.uk/2017/04/21/443-the-trip-to-japan-part-2/",
    ),
    (
        "http://wp.me/p4IuUx-7BQ",
        "https://teacherluke.co.uk/2017/04/21/442-the-trip-to-japan-part-1/",
    ),
    (
        "http://wp.me/p4IuUx-7BO",
        "https://teacherluke.co.uk/2017/04/18/441-andy-johnson-at-the-iatefl-conference/",
    ),
    (
        "http://wp.me/p4IuUx-7Av",
        "https://teacherluke.co.uk/2017/03/28/436-the-return-of-the-lying-game-with-amber-paul-video/",
    ),
    (
        "http://wp.me/p4IuUx-7zK",
        "https://teacherluke.co.uk/2017/03/26/i-was-interviewed-on-my-fluent-podcast-with-daniel-goodson/",
    ),
    (
        "http://wp.me/p4IuUx-7sg",
        "https://teacherluke.co.uk/2017/01/10/415-with-the-family-part-3-more-encounters-with-famous-people/",
    ),
    (
        "https://wp.me/p4IuUx-29",
        "https://teacherluke.co.uk/2011/10/11/notting-hill-carnival-video-frustration-out-takes/",
    ),
];

/// Link texts that are wrong (or duplicate markers) on the archive page,
/// keyed by the post URL they belong to.
pub const LINK_TEXTS_MAPPING: &[(&str, &str)] = &[
    (
        "https://teacherluke.co.uk/2018/04/18/522-learning-english-at-summer-school-in-the-uk-a-rambling-chat-with-raphael-miller/",
        "522. Learning English at Summer School in the UK (A Rambling Chat with Raphael Miller)",
    ),
    (
        "https://teacherluke.co.uk/2017/08/14/website-content-lukes-criminal-past-zep-episode-185/",
        "[Website content] Luke’s Criminal Past (ZEP Episode 185)",
    ),
    (
        "https://teacherluke.co.uk/2017/05/26/i-was-invited-onto-the-english-across-the-pond-podcast/",
        "[Website content] I was invited onto the “English Across The Pond” Podcast",
    ),
    (
        "https://teacherluke.co.uk/2016/03/20/i-was-invited-onto-craig-wealands-weekly-blab-and-we-talked-about-comedy-video/",
        "[VIDEO] I was invited onto Craig Wealand’s weekly Blab, and we talked about comedy",
    ),
];

/// Extensions recognized when scanning a destination directory.
pub const KNOWN_FILE_EXTENSIONS: &[&str] = &[".mp3", ".pdf", ".mp4"];

/// Date used when an episode has not been parsed at all.
pub const UNKNOWN_DATE: &str = "2000-01-01T00:00:00+00:00";

/// Date used when an episode page exists but its publish time is missing.
pub const UNPARSED_PAGE_DATE: &str = "1999-01-01T01:01:01+02:00";

/// Length of the response snippet kept in `admin_note` for failed pages.
pub const ADMIN_NOTE_SNIPPET_LEN: usize = 50;

/// Runtime settings.
///
/// Every field has a default, so a partial (or absent) `lepdl.toml` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Archive page to crawl.
    pub archive_url: String,
    /// JSON database URL or local path.
    pub db_url: String,
    /// Base URL for the fallback download source.
    pub downloads_base_url: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Custom User-Agent header.
    pub user_agent: Option<String>,
    /// Name of the database file written by `parse`.
    pub db_filename: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            archive_url: ARCHIVE_URL.to_string(),
            db_url: JSON_DB_URL.to_string(),
            downloads_base_url: DOWNLOADS_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            user_agent: None,
            db_filename: DEFAULT_JSON_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `lepdl.toml` in the working
    /// directory is used when present; otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = PathBuf::from(CONFIG_FILENAME);
                if !candidate.is_file() {
                    debug!("No {} found, using default settings", CONFIG_FILENAME);
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded settings from {}", path.display());
        Self::from_toml(&text)
    }
}

/// Errors while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
