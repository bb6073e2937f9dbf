//! Downloadable files derived from episodes.

use crate::utils::sanitize_filename;

/// Category of a downloadable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Episode audio.
    Audio,
    /// Audio track variant of an episode.
    ATrack,
    /// PDF print of the episode page.
    PagePdf,
}

impl FileKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio | Self::ATrack => ".mp3",
            Self::PagePdf => ".pdf",
        }
    }

    /// Infix placed right before the extension.
    fn infix(&self) -> &'static str {
        match self {
            Self::ATrack => " _aTrack_",
            _ => "",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::ATrack => write!(f, "atrack"),
            Self::PagePdf => write!(f, "pdf"),
        }
    }
}

/// One file to be saved on disk, with up to three candidate sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LepFile {
    pub kind: FileKind,
    pub episode_index: u64,
    /// Episode title without extension.
    pub name: String,
    pub extension: &'static str,
    pub short_date: String,
    /// 0 for single-part files, otherwise 1-based.
    pub part_number: u32,
    pub filename: String,
    pub primary_url: String,
    pub secondary_url: String,
    pub tertiary_url: String,
}

impl LepFile {
    /// Build a file, filling the URL chain positionally from `urls`.
    ///
    /// Only the first three URLs are used.
    pub fn new(
        kind: FileKind,
        episode_index: u64,
        name: &str,
        short_date: &str,
        part_number: u32,
        urls: &[String],
    ) -> Self {
        let url_at = |i: usize| urls.get(i).map(|u| u.trim().to_string()).unwrap_or_default();
        Self {
            kind,
            episode_index,
            name: name.to_string(),
            extension: kind.extension(),
            short_date: short_date.to_string(),
            part_number,
            filename: compose_filename(kind, name, short_date, part_number),
            primary_url: url_at(0),
            secondary_url: url_at(1),
            tertiary_url: url_at(2),
        }
    }

    /// Non-empty candidate URLs in priority order.
    pub fn candidate_urls(&self) -> impl Iterator<Item = &str> {
        [&self.primary_url, &self.secondary_url, &self.tertiary_url]
            .into_iter()
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }
}

/// `[YYYY-MM-DD] # Name [Part NN] _aTrack_.ext`, with unsafe path characters replaced.
pub fn compose_filename(kind: FileKind, name: &str, short_date: &str, part_number: u32) -> String {
    let mut stem = format!("[{short_date}] # {name}");
    if part_number > 0 {
        stem.push_str(&format!(" [Part {part_number:02}]"));
    }
    stem.push_str(kind.infix());
    format!("{}{}", sanitize_filename(&stem), kind.extension())
}
