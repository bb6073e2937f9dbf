//! End-to-end runs of the `parse` pipeline over an in-memory site.

use std::path::Path;

use lep_downloader::models::PostType;
use lep_downloader::repository::{save_episodes, DbSource};
use lep_downloader::scrapers::{ArchiveError, MemoryFetcher};
use lep_downloader::services::{run_parse, MergeError, MergeMode, ParseError, ParseOptions, ParseReport};

const ARCHIVE_URL: &str = "https://teacherluke.co.uk/episodes-2/";
const EP_732: &str = "https://teacherluke.co.uk/2021/07/29/732-walking-talking/";
const EP_733: &str = "https://teacherluke.co.uk/2021/08/03/733-a-summer-ramble/";

fn archive(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(url, text)| format!("<p><a href=\"{url}\">{text}</a></p>"))
        .collect();
    format!("<html><body><article>{anchors}</article></body></html>")
}

fn audio_page(date: &str, mp3: &str) -> String {
    format!(
        "<html><body><article><time class=\"entry-date\" datetime=\"{date}\">x</time>\
         <p><a href=\"{mp3}\">Download episode</a></p></article></body></html>"
    )
}

fn site() -> MemoryFetcher {
    let fetcher = MemoryFetcher::new();
    fetcher
        .add_page(
            ARCHIVE_URL,
            &archive(&[(EP_733, "733. A Summer Ramble"), (EP_732, "732. Walking & Talking")]),
        )
        .add_page(EP_733, &audio_page("2021-08-03T18:00:00+01:00", "https://cdn.example/733.mp3"))
        .add_page(EP_732, &audio_page("2021-07-29T18:00:00+01:00", "https://cdn.example/732.mp3"));
    fetcher
}

fn options(mode: MergeMode, db: &Path, output: &Path) -> ParseOptions {
    ParseOptions {
        mode,
        archive_url: ARCHIVE_URL.to_string(),
        db_source: DbSource::Local(db.to_path_buf()),
        output: output.to_path_buf(),
        html_dir: None,
    }
}

#[tokio::test]
async fn test_raw_parse_writes_sorted_database() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("lep-db.min.json");
    let fetcher = site();

    let report = run_parse(&fetcher, &options(MergeMode::Raw, &output, &output), None)
        .await
        .unwrap();
    let ParseReport::Written { added, total, .. } = report else {
        panic!("expected a write");
    };
    assert_eq!(added.len(), 2);
    assert_eq!(total, 2);

    let text = std::fs::read_to_string(&output).unwrap();
    let stored = lep_downloader::repository::decode_episodes(&text, "test").unwrap();
    assert_eq!(stored[0].url, EP_733);
    assert_eq!(stored[0].post_type, PostType::Audio);
    assert_eq!(stored[1].index, 2021072901);
}

#[tokio::test]
async fn test_second_fetch_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("lep-db.min.json");
    let fetcher = site();

    run_parse(&fetcher, &options(MergeMode::Raw, &output, &output), None)
        .await
        .unwrap();
    let before = std::fs::metadata(&output).unwrap().modified().unwrap();
    let pages_fetched = fetcher.request_count(EP_733);

    let report = run_parse(&fetcher, &options(MergeMode::Fetch, &output, &output), None)
        .await
        .unwrap();
    assert!(matches!(report, ParseReport::UpToDate));
    assert_eq!(std::fs::metadata(&output).unwrap().modified().unwrap(), before);
    assert_eq!(fetcher.request_count(EP_733), pages_fetched);
}

#[tokio::test]
async fn test_fetch_adds_only_newer_episodes() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    let output = dir.path().join("lep-db.min.json");
    let fetcher = site();

    // Seed the prior database with 732 only.
    let single = MemoryFetcher::new();
    single
        .add_page(ARCHIVE_URL, &archive(&[(EP_732, "732. Walking & Talking")]))
        .add_page(EP_732, &audio_page("2021-07-29T18:00:00+01:00", "https://cdn.example/732.mp3"));
    run_parse(&single, &options(MergeMode::Raw, &prior, &prior), None)
        .await
        .unwrap();

    let report = run_parse(&fetcher, &options(MergeMode::Fetch, &prior, &output), None)
        .await
        .unwrap();
    let ParseReport::Written { added, total, .. } = report else {
        panic!("expected a write");
    };
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].url, EP_733);
    assert_eq!(total, 2);
    assert_eq!(fetcher.request_count(EP_732), 0);
}

#[tokio::test]
async fn test_archive_shrank_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    let output = dir.path().join("lep-db.min.json");

    let fetcher = site();
    run_parse(&fetcher, &options(MergeMode::Raw, &prior, &prior), None)
        .await
        .unwrap();

    fetcher.add_page(ARCHIVE_URL, &archive(&[(EP_733, "733. A Summer Ramble")]));
    let result = run_parse(&fetcher, &options(MergeMode::Fetch, &prior, &output), None).await;
    assert!(matches!(
        result,
        Err(ParseError::Merge(MergeError::ArchiveShrank { stored: 2, live: 1 }))
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_only_duplicate_links_is_structural_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("lep-db.min.json");
    let fetcher = MemoryFetcher::new();
    fetcher.add_page(
        ARCHIVE_URL,
        &archive(&[
            (EP_733, "[VIDEO]"),
            ("https://teacherluke.co.uk/2018/06/07/522-learn-english/", "Episode 522"),
        ]),
    );

    let result = run_parse(&fetcher, &options(MergeMode::Raw, &output, &output), None).await;
    assert!(matches!(
        result,
        Err(ParseError::Archive(ArchiveError::NoEpisodeLinks { .. }))
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_unavailable_database_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("lep-db.min.json");
    let fetcher = site();
    let mut opts = options(MergeMode::Fetch, &output, &output);
    opts.db_source = DbSource::parse("https://hotenov.com/d/lep/missing.json");

    let result = run_parse(&fetcher, &opts, None).await;
    assert!(matches!(result, Err(ParseError::Db(_))));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_pull_keeps_stored_entries_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    let output = dir.path().join("lep-db.min.json");
    let fetcher = site();

    let mut stored = lep_downloader::models::Episode::new(733, EP_733, "733. A Summer Ramble", 2021080301);
    stored.date = chrono::DateTime::parse_from_rfc3339("2021-08-03T18:00:00+01:00").unwrap();
    stored.admin_note = "checked by hand".to_string();
    save_episodes(&prior, &[stored]).await.unwrap();

    let report = run_parse(&fetcher, &options(MergeMode::Pull, &prior, &output), None)
        .await
        .unwrap();
    let ParseReport::Written { added, .. } = report else {
        panic!("expected a write");
    };
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].url, EP_732);

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("checked by hand"));
}

#[tokio::test]
async fn test_pull_does_not_duplicate_redirected_episode() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    let output = dir.path().join("lep-db.min.json");
    let stored_url = "https://teacherluke.co.uk/2009/04/12/episode-1-introduction/";
    let archive_form = "https://teacherluke.wordpress.com/2009/04/12/episode-1-introduction/";

    let mut stored = lep_downloader::models::Episode::new(1, stored_url, "1. Introduction", 2009041201);
    stored.date = chrono::DateTime::parse_from_rfc3339("2009-04-12T15:23:33+02:00").unwrap();
    save_episodes(&prior, &[stored]).await.unwrap();

    let fetcher = MemoryFetcher::new();
    fetcher
        .add_page(ARCHIVE_URL, &archive(&[(archive_form, "1. Introduction")]))
        .add_redirect(archive_form, stored_url)
        .add_page(stored_url, &audio_page("2009-04-12T15:23:33+02:00", "https://cdn.example/1.mp3"));

    for _ in 0..2 {
        let report = run_parse(&fetcher, &options(MergeMode::Pull, &prior, &output), None)
            .await
            .unwrap();
        assert!(matches!(report, ParseReport::UpToDate));
    }
    assert!(!output.exists());
}
