//! Download engine types and events.

use std::path::PathBuf;

use crate::models::LepFile;
use crate::scrapers::FetchError;

/// Events emitted while files are fetched.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// A missing file is about to be fetched.
    Started {
        filename: String,
        position: usize,
        total: usize,
    },
    /// Trying one candidate URL.
    Attempt { filename: String, url: String },
    /// File saved from `url`.
    Completed {
        filename: String,
        url: String,
        bytes: u64,
    },
    /// File already present in the destination.
    Existing { filename: String },
    /// Every candidate URL failed remotely.
    NotFound { filename: String },
    /// A candidate could not be written locally.
    Unsaved { filename: String, error: String },
}

/// How one file ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Downloaded,
    Existing,
    NotFound,
    Unsaved,
}

/// Files split by presence in the destination directory.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub existing: Vec<LepFile>,
    pub missing: Vec<LepFile>,
}

/// Result of a download run.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub existing: usize,
    pub not_found: Vec<LepFile>,
    pub unsaved: Vec<LepFile>,
}

impl DownloadReport {
    pub fn record(&mut self, file: &LepFile, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Downloaded => self.downloaded += 1,
            FileOutcome::Existing => self.existing += 1,
            FileOutcome::NotFound => self.not_found.push(file.clone()),
            FileOutcome::Unsaved => self.unsaved.push(file.clone()),
        }
    }
}

/// Conditions that stop a download run before any file is fetched.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("no files to download")]
    NothingToDo,

    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a single attempt failed.
#[derive(Debug)]
pub(super) enum AttemptError {
    Remote(FetchError),
    Local(std::io::Error),
}
