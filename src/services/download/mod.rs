//! File download engine.
//!
//! Runs sequentially: one file, one URL, one request at a time. Emits events
//! for progress tracking and leaves printing to the caller.

mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::KNOWN_FILE_EXTENSIONS;
use crate::models::LepFile;
use crate::scrapers::Fetcher;

pub use types::{DownloadError, DownloadEvent, DownloadReport, FileOutcome, Partition};
use types::AttemptError;

/// Write buffer size for streamed files.
const CHUNK_SIZE: usize = 64 * 1024;

/// Suffix of files still being written.
const PART_SUFFIX: &str = ".part";

/// Fetches catalog files into one destination directory.
pub struct DownloadEngine<'a> {
    fetcher: &'a dyn Fetcher,
    dest: PathBuf,
    events: Option<mpsc::Sender<DownloadEvent>>,
}

impl<'a> DownloadEngine<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, dest: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dest: dest.into(),
            events: None,
        }
    }

    pub fn with_events(mut self, tx: mpsc::Sender<DownloadEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Split `files` into those already saved and those to fetch.
    ///
    /// A file exists iff its exact filename is in the destination. An empty
    /// `files` list is [`DownloadError::NothingToDo`].
    pub async fn partition(&self, files: Vec<LepFile>) -> Result<Partition, DownloadError> {
        if files.is_empty() {
            return Err(DownloadError::NothingToDo);
        }
        let present = existing_names(&self.dest).await?;
        let (existing, missing): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| present.contains(&f.filename));
        debug!(
            "{} existing, {} missing file(s) in {}",
            existing.len(),
            missing.len(),
            self.dest.display()
        );
        Ok(Partition { existing, missing })
    }

    /// Fetch every missing file of `partition`, in order.
    pub async fn download(&self, partition: &Partition) -> DownloadReport {
        let mut report = DownloadReport::default();
        for file in &partition.existing {
            self.emit(DownloadEvent::Existing {
                filename: file.filename.clone(),
            })
            .await;
            report.record(file, FileOutcome::Existing);
        }

        let total = partition.missing.len();
        for (i, file) in partition.missing.iter().enumerate() {
            self.emit(DownloadEvent::Started {
                filename: file.filename.clone(),
                position: i + 1,
                total,
            })
            .await;
            let outcome = self.fetch_file(file).await;
            report.record(file, outcome);
        }
        info!(
            "Downloaded {}, existing {}, not found {}, unsaved {}",
            report.downloaded,
            report.existing,
            report.not_found.len(),
            report.unsaved.len()
        );
        report
    }

    /// Partition, then download.
    pub async fn run(&self, files: Vec<LepFile>) -> Result<DownloadReport, DownloadError> {
        let partition = self.partition(files).await?;
        Ok(self.download(&partition).await)
    }

    /// Walk the URL chain until one candidate is saved.
    async fn fetch_file(&self, file: &LepFile) -> FileOutcome {
        let target = self.dest.join(&file.filename);
        let mut local_error: Option<String> = None;

        for url in file.candidate_urls() {
            self.emit(DownloadEvent::Attempt {
                filename: file.filename.clone(),
                url: url.to_string(),
            })
            .await;
            match self.save_from(url, &target).await {
                Ok(bytes) => {
                    info!("Saved {} ({} bytes) from {}", file.filename, bytes, url);
                    self.emit(DownloadEvent::Completed {
                        filename: file.filename.clone(),
                        url: url.to_string(),
                        bytes,
                    })
                    .await;
                    return FileOutcome::Downloaded;
                }
                Err(AttemptError::Remote(e)) if e.is_not_found() => {
                    debug!("{} missing at {}", file.filename, url);
                }
                Err(AttemptError::Remote(e)) => {
                    warn!("{} not available at {}: {}", file.filename, url, e);
                }
                Err(AttemptError::Local(e)) => {
                    warn!("Cannot save {} from {}: {}", file.filename, url, e);
                    local_error = Some(e.to_string());
                }
            }
        }

        match local_error {
            Some(error) => {
                self.emit(DownloadEvent::Unsaved {
                    filename: file.filename.clone(),
                    error,
                })
                .await;
                FileOutcome::Unsaved
            }
            None => {
                self.emit(DownloadEvent::NotFound {
                    filename: file.filename.clone(),
                })
                .await;
                FileOutcome::NotFound
            }
        }
    }

    /// Stream `url` into a part file next to `target`, then rename it.
    ///
    /// The part file is removed on any failure.
    async fn save_from(&self, url: &str, target: &Path) -> Result<u64, AttemptError> {
        let mut part_name = target.as_os_str().to_owned();
        part_name.push(PART_SUFFIX);
        let part = PathBuf::from(part_name);

        let result = match self.stream_to(url, &part).await {
            Ok(bytes) => tokio::fs::rename(&part, target)
                .await
                .map(|_| bytes)
                .map_err(AttemptError::Local),
            Err(e) => Err(e),
        };
        if result.is_err() {
            let _ = tokio::fs::remove_file(&part).await;
        }
        result
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64, AttemptError> {
        let mut stream = self
            .fetcher
            .open_stream(url)
            .await
            .map_err(AttemptError::Remote)?;

        let file = tokio::fs::File::create(part)
            .await
            .map_err(AttemptError::Local)?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut written: u64 = 0;

        while let Some(chunk) = stream
            .next_chunk()
            .await
            .map_err(AttemptError::Remote)?
        {
            writer
                .write_all(&chunk)
                .await
                .map_err(AttemptError::Local)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(AttemptError::Local)?;
        Ok(written)
    }

    async fn emit(&self, event: DownloadEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

/// Names of files in `dir` with a known media extension.
async fn existing_names(dir: &Path) -> Result<HashSet<String>, DownloadError> {
    let read_err = |source| DownloadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_err)?;
    let mut names = HashSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let lower = name.to_lowercase();
        if KNOWN_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            names.insert(name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileKind;
    use crate::scrapers::{FetchError, MemoryFetcher};

    fn audio(urls: &[&str]) -> LepFile {
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        LepFile::new(FileKind::Audio, 2021080301, "733. A Summer Ramble", "2021-08-03", 0, &urls)
    }

    #[tokio::test]
    async fn test_empty_file_list_is_nothing_to_do() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemoryFetcher::new();
        let engine = DownloadEngine::new(&fetcher, dir.path());
        assert!(matches!(engine.run(Vec::new()).await, Err(DownloadError::NothingToDo)));
    }

    #[tokio::test]
    async fn test_partition_matches_exact_filename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("[2021-08-03] # 733. A Summer Ramble.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("[2021-08-03] # 733. A Summer Ramble.txt"), b"x").unwrap();
        let fetcher = MemoryFetcher::new();
        let engine = DownloadEngine::new(&fetcher, dir.path());

        let pdf = LepFile::new(FileKind::PagePdf, 2021080301, "733. A Summer Ramble", "2021-08-03", 0, &[]);
        let partition = engine.partition(vec![audio(&["https://a/733.mp3"]), pdf]).await.unwrap();
        assert_eq!(partition.existing.len(), 1);
        assert_eq!(partition.missing.len(), 1);
        assert_eq!(partition.missing[0].kind, FileKind::PagePdf);
    }

    #[tokio::test]
    async fn test_falls_back_and_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemoryFetcher::new();
        fetcher
            .add_broken_stream("https://a/733.mp3", b"garbage", FetchError::Timeout("read".into()))
            .add_binary("https://c/733.mp3", b"ID3 audio");
        let (tx, mut rx) = mpsc::channel(32);
        let engine = DownloadEngine::new(&fetcher, dir.path()).with_events(tx);

        let file = audio(&["https://a/733.mp3", "https://b/733.mp3", "https://c/733.mp3"]);
        let report = engine.run(vec![file.clone()]).await.unwrap();
        drop(engine);

        assert_eq!(report.downloaded, 1);
        let saved = std::fs::read(dir.path().join(&file.filename)).unwrap();
        assert_eq!(saved, b"ID3 audio");
        assert!(!dir.path().join(format!("{}.part", file.filename)).exists());

        let mut attempts = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, DownloadEvent::Attempt { .. }) {
                attempts += 1;
            }
        }
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_all_remote_failures_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemoryFetcher::new();
        let engine = DownloadEngine::new(&fetcher, dir.path());
        let report = engine.run(vec![audio(&["https://a/1.mp3", "https://b/1.mp3"])]).await.unwrap();
        assert_eq!(report.not_found.len(), 1);
        assert!(report.unsaved.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_and_failing_hosts_both_count_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MemoryFetcher::new();
        fetcher.add_failure(
            "https://b/1.mp3",
            FetchError::Http { status: 503, url: "https://b/1.mp3".into() },
        );
        let engine = DownloadEngine::new(&fetcher, dir.path());
        let report = engine.run(vec![audio(&["https://a/1.mp3", "https://b/1.mp3"])]).await.unwrap();
        assert_eq!(report.not_found.len(), 1);
        assert!(report.unsaved.is_empty());
        assert_eq!(fetcher.request_count("https://a/1.mp3"), 1);
        assert_eq!(fetcher.request_count("https://b/1.mp3"), 1);
    }

    #[tokio::test]
    async fn test_local_write_failure_is_unsaved() {
        let dir = tempfile::tempdir().unwrap();
        let missing_dir = dir.path().join("gone");
        let fetcher = MemoryFetcher::new();
        fetcher.add_binary("https://a/1.mp3", b"audio");
        let engine = DownloadEngine::new(&fetcher, &missing_dir);
        let partition = Partition {
            existing: Vec::new(),
            missing: vec![audio(&["https://a/1.mp3"])],
        };
        let report = engine.download(&partition).await;
        assert_eq!(report.unsaved.len(), 1);
        assert_eq!(report.downloaded, 0);
    }
}
