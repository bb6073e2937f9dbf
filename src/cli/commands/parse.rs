//! `lepdl parse`: crawl the archive into the JSON database.

use console::style;
use tokio::sync::mpsc;

use super::ParseArgs;
use crate::cli::helpers::{progress_bar, validate_dir};
use crate::config::Settings;
use crate::repository::{DbError, DbSource};
use crate::scrapers::{ArchiveError, CrawlEvent, HttpClient};
use crate::services::{run_parse, MergeError, ParseError, ParseOptions, ParseReport};

pub async fn cmd_parse(settings: &Settings, args: ParseArgs, quiet: bool) -> anyhow::Result<()> {
    if let Err(e) = validate_dir(&args.dest) {
        println!("{} {}", style("✗").red(), e);
        return Ok(());
    }
    let html_dir = if args.with_html {
        if let Err(e) = validate_dir(&args.html_dir) {
            println!("{} {}", style("✗").red(), e);
            return Ok(());
        }
        Some(args.html_dir.clone())
    } else {
        None
    };

    let fetcher = HttpClient::from_settings(settings)?;
    let db_location = args.db_url.as_deref().unwrap_or(&settings.db_url);
    let options = ParseOptions {
        mode: args.mode,
        archive_url: args.archive_url.clone().unwrap_or_else(|| settings.archive_url.clone()),
        db_source: DbSource::parse(db_location),
        output: args.dest.join(&settings.db_filename),
        html_dir,
    };

    if !quiet {
        println!("{} Running script...", style("→").cyan());
    }

    let (event_tx, mut event_rx) = mpsc::channel::<CrawlEvent>(100);

    // Spawn event handler task (UI layer)
    let event_handler = tokio::spawn(async move {
        let mut pb = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                CrawlEvent::Started { total } => {
                    pb = Some(progress_bar(total as u64, quiet));
                }
                CrawlEvent::Parsed { title } => {
                    if let Some(pb) = &pb {
                        pb.set_message(title);
                        pb.inc(1);
                    }
                }
                CrawlEvent::Skipped { url, reason } => {
                    if let Some(pb) = &pb {
                        pb.println(format!("  {} {} ({})", style("→").dim(), url, reason));
                        pb.inc(1);
                    }
                }
                CrawlEvent::Stub { url, error } => {
                    if let Some(pb) = &pb {
                        pb.println(format!("{} {}\n\t{}", style("!").yellow(), error, url));
                        pb.inc(1);
                    }
                }
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
    });

    let result = run_parse(&fetcher, &options, Some(event_tx)).await;

    if let Err(e) = event_handler.await {
        tracing::warn!("Event handler task failed: {}", e);
    }

    match result {
        Ok(ParseReport::UpToDate) => {
            println!("{} There are no new episodes. Exit.", style("!").yellow());
        }
        Ok(ParseReport::Written {
            path,
            added,
            stubs,
            skipped,
            total,
        }) => {
            println!(
                "{} Added {} new episode(s), {} in total",
                style("✓").green(),
                added.len(),
                total
            );
            println!("  {} Saved to {}", style("→").dim(), path.display());
            if stubs > 0 {
                println!(
                    "  {} {} episode page(s) could not be fetched and were stored as stubs",
                    style("!").yellow(),
                    stubs
                );
            }
            if !skipped.is_empty() {
                println!(
                    "  {} {} link(s) were not episodes",
                    style("→").dim(),
                    skipped.len()
                );
            }
        }
        Err(e) => report_failure(&e, &options.db_source),
    }

    Ok(())
}

/// Operator message for each condition that stopped the run.
fn report_failure(error: &ParseError, db_source: &DbSource) {
    match error {
        ParseError::Archive(ArchiveError::NotAnEpisodeArchivePage { url }) => {
            println!("{} {}:\n\t{}", style("✗").red(), error, url);
            println!("Archive page has invalid HTML content. Exit.");
        }
        ParseError::Archive(ArchiveError::NoEpisodeLinks { url }) => {
            println!("{} {}:\n\t{}", style("✗").red(), error, url);
            println!("Can't parse any episodes. Exit.");
        }
        ParseError::Archive(e) => {
            println!("{} [ERROR]: {}", style("✗").red(), e);
            println!("Archive page is not available. Exit.");
        }
        ParseError::Db(DbError::Unavailable { reason, .. }) => {
            tracing::warn!("JSON database {} is unavailable: {}", db_source, reason);
            println!("{} JSON database is not available. Exit.", style("✗").red());
        }
        ParseError::Db(DbError::NoValidEpisodes { location }) => {
            println!(
                "{} [WARNING]: JSON file ({}) has no valid episode objects.",
                style("!").yellow(),
                location
            );
        }
        ParseError::Db(DbError::InvalidJson { location, detail }) => {
            println!(
                "{} [ERROR]: Data is not a valid JSON document.\n\tURL: {}\n\t{}",
                style("✗").red(),
                location,
                detail
            );
        }
        ParseError::Db(e) => {
            println!("{} [ERROR]: {}", style("✗").red(), e);
        }
        ParseError::Merge(MergeError::ArchiveShrank { stored, live }) => {
            println!(
                "{} Database contains more episodes than current archive!",
                style("!").yellow()
            );
            println!(
                "  {} {} stored vs {} on the archive page. Nothing was written.",
                style("→").dim(),
                stored,
                live
            );
        }
    }
}
