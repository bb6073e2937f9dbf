//! Turning episodes into the flat list of files to fetch.

use tracing::warn;

use crate::models::{Episode, FileKind, LepFile};

/// Most URLs a single file can carry.
const MAX_CANDIDATES: usize = 3;

/// Ordered list of downloadable files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCatalog {
    files: Vec<LepFile>,
}

impl FileCatalog {
    /// Build the catalog for `episodes`, oldest episode first.
    ///
    /// Episodes are expected newest first, the way they are stored.
    pub fn gather(episodes: &[Episode]) -> Self {
        let mut files = Vec::new();
        for ep in episodes.iter().rev() {
            let short_date = ep.short_date();
            push_parts(&mut files, ep, FileKind::Audio, &ep.files.audios, &short_date);
            push_parts(&mut files, ep, FileKind::ATrack, &ep.files.atrack, &short_date);
            let urls = capped(ep, FileKind::PagePdf, &ep.files.page_pdf);
            files.push(LepFile::new(
                FileKind::PagePdf,
                ep.index,
                &ep.post_title,
                &short_date,
                0,
                urls,
            ));
        }
        Self { files }
    }

    /// Fill every empty secondary URL with `base` + percent-encoded filename.
    pub fn populate_default_url(&mut self, base: &str) {
        for file in &mut self.files {
            if file.secondary_url.is_empty() {
                file.secondary_url = format!("{}{}", base, urlencoding::encode(&file.filename));
            }
        }
    }

    /// Keep only files of the given kinds, preserving order.
    pub fn filter_by_kind(&self, kinds: &[FileKind]) -> Self {
        let files = self
            .files
            .iter()
            .filter(|f| kinds.contains(&f.kind))
            .cloned()
            .collect();
        Self { files }
    }

    pub fn files(&self) -> &[LepFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<LepFile> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn push_parts(
    files: &mut Vec<LepFile>,
    ep: &Episode,
    kind: FileKind,
    parts: &[Vec<String>],
    short_date: &str,
) {
    let multi_part = parts.len() > 1;
    for (i, urls) in parts.iter().enumerate() {
        let part_number = if multi_part { i as u32 + 1 } else { 0 };
        files.push(LepFile::new(
            kind,
            ep.index,
            &ep.post_title,
            short_date,
            part_number,
            capped(ep, kind, urls),
        ));
    }
}

fn capped<'a>(ep: &Episode, kind: FileKind, urls: &'a [String]) -> &'a [String] {
    if urls.len() > MAX_CANDIDATES {
        warn!(
            "Episode {} lists {} {} URLs; only the first {} are used",
            ep.index,
            urls.len(),
            kind,
            MAX_CANDIDATES
        );
        &urls[..MAX_CANDIDATES]
    } else {
        urls
    }
}
