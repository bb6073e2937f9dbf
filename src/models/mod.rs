//! Data models for lep-downloader.

mod episode;
mod file;

pub use episode::{sort_newest_first, Episode, EpisodeFiles, EpisodeFilter, PostType};
pub use file::{compose_filename, FileKind, LepFile};
