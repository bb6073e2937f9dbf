//! `lepdl download`: fetch episode files listed in the JSON database.

use console::style;
use tokio::sync::mpsc;

use super::DownloadArgs;
use crate::cli::helpers::{confirm, pause_before_exit, progress_bar, validate_dir};
use crate::config::Settings;
use crate::models::{EpisodeFilter, FileKind};
use crate::repository::{load_episodes, DbError, DbSource};
use crate::scrapers::HttpClient;
use crate::services::{DownloadEngine, DownloadError, DownloadEvent, FileCatalog};

pub async fn cmd_download(
    settings: &Settings,
    args: DownloadArgs,
    quiet: bool,
) -> anyhow::Result<()> {
    if let Err(e) = validate_dir(&args.dest) {
        println!("{} {}", style("✗").red(), e);
        return Ok(());
    }

    let fetcher = HttpClient::from_settings(settings)?;
    let db_source = DbSource::parse(args.db_url.as_deref().unwrap_or(&settings.db_url));

    let episodes = match load_episodes(&fetcher, &db_source).await {
        Ok(episodes) => episodes,
        Err(e) => {
            match e {
                DbError::Unavailable { .. } => {
                    println!("{} JSON database is not available now.", style("✗").red());
                    println!("Try again later.");
                }
                DbError::NoValidEpisodes { .. } => {
                    println!(
                        "{} JSON is available, but there are NO episode in this file. Exit.",
                        style("!").yellow()
                    );
                }
                DbError::InvalidJson { location, .. } => {
                    println!(
                        "{} [ERROR]: Data is not a valid JSON document.\n\tURL: {}",
                        style("✗").red(),
                        location
                    );
                }
                other => println!("{} [ERROR]: {}", style("✗").red(), other),
            }
            finish(quiet);
            return Ok(());
        }
    };

    let filter = if args.last {
        EpisodeFilter::Last
    } else if args.start_date.is_some() || args.end_date.is_some() {
        EpisodeFilter::Dates {
            start: args.start_date,
            end: args.end_date,
        }
    } else {
        let (start, end) = args.episode;
        EpisodeFilter::Numbers { start, end }
    };
    let selected = filter.apply(&episodes);
    tracing::info!("{} of {} episodes selected", selected.len(), episodes.len());

    let mut catalog = FileCatalog::gather(&selected);
    catalog.populate_default_url(&settings.downloads_base_url);

    let mut kinds = vec![FileKind::Audio];
    if args.with_pdf {
        kinds.push(FileKind::PagePdf);
    }
    if args.with_atrack {
        kinds.push(FileKind::ATrack);
    }
    let files = catalog.filter_by_kind(&kinds).into_files();

    let engine = DownloadEngine::new(&fetcher, &args.dest);
    let partition = match engine.partition(files).await {
        Ok(partition) => partition,
        Err(DownloadError::NothingToDo) => {
            println!("{} Nothing to download for now.", style("!").yellow());
            finish(quiet);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let total = partition.missing.len();
    if total == 0 {
        println!("{} Nothing to download for now.", style("!").yellow());
        finish(quiet);
        return Ok(());
    }

    if !quiet {
        println!("{total} non-existing file(s) will be downloaded.");
        if !confirm("Do you want to continue?") {
            println!("Your answer is 'NO'. Exit.");
            finish(quiet);
            return Ok(());
        }
    }

    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);
    let engine = engine.with_events(event_tx);

    // Spawn event handler task (UI layer)
    let event_handler = tokio::spawn(async move {
        let pb = progress_bar(total as u64, quiet);
        while let Some(event) = event_rx.recv().await {
            match event {
                DownloadEvent::Started {
                    filename,
                    position,
                    total,
                } => {
                    pb.set_message(format!("({position}/{total}) {filename}"));
                }
                DownloadEvent::Attempt { url, .. } => {
                    tracing::debug!("Trying {}", url);
                }
                DownloadEvent::Completed { filename, .. } => {
                    pb.println(format!("{} {}", style("✓").green(), filename));
                    pb.inc(1);
                }
                DownloadEvent::Existing { .. } => {}
                DownloadEvent::NotFound { filename } => {
                    pb.println(format!("{} Not found: {}", style("✗").red(), filename));
                    pb.inc(1);
                }
                DownloadEvent::Unsaved { filename, error } => {
                    pb.println(format!(
                        "{} Cannot save {}: {}",
                        style("✗").red(),
                        filename,
                        error
                    ));
                    pb.inc(1);
                }
            }
        }
        pb.finish_and_clear();
    });

    let report = engine.download(&partition).await;
    drop(engine);

    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }

    println!(
        "{} Downloaded {} file(s)",
        style("✓").green(),
        report.downloaded
    );
    if report.existing > 0 {
        println!(
            "  {} {} already existed",
            style("→").dim(),
            report.existing
        );
    }
    if !report.not_found.is_empty() {
        println!(
            "  {} {} file(s) not found on any source:",
            style("!").yellow(),
            report.not_found.len()
        );
        for file in &report.not_found {
            println!("\t{}", file.filename);
        }
    }
    if !report.unsaved.is_empty() {
        println!(
            "  {} {} file(s) could not be saved:",
            style("!").yellow(),
            report.unsaved.len()
        );
        for file in &report.unsaved {
            println!("\t{}", file.filename);
        }
    }

    finish(quiet);
    Ok(())
}

fn finish(quiet: bool) {
    if !quiet {
        pause_before_exit();
    }
}
