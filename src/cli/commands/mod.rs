//! CLI parser and dispatch to command-specific modules.

mod download;
mod parse;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use super::helpers::{parse_date, parse_episode_range};
use crate::config::{Settings, DEBUG_FILENAME, PATH_TO_HTML_FILES};
use crate::logging::LogOptions;
use crate::services::MergeMode;

#[derive(Parser)]
#[command(name = "lepdl")]
#[command(about = "Luke's English Podcast archive parser and downloader")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery of lepdl.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write a detailed log file into the destination folder
    #[arg(long, global = true)]
    pub debug: bool,

    /// No confirmation prompts and no progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the archive page and write the JSON database
    Parse(ParseArgs),

    /// Download episode files listed in the JSON database
    Download(DownloadArgs),
}

#[derive(Args)]
struct ParseArgs {
    /// Which archive links to parse
    #[arg(short, long, value_enum, default_value_t = MergeMode::Fetch)]
    mode: MergeMode,

    /// Prior JSON database (URL or local file)
    #[arg(long, env = "LEPDL_DB_URL")]
    db_url: Option<String>,

    /// Archive page URL
    #[arg(long, env = "LEPDL_ARCHIVE_URL")]
    archive_url: Option<String>,

    /// Folder for the resulting JSON file
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// Also save every fetched episode page as HTML
    #[arg(long)]
    with_html: bool,

    /// Folder for saved HTML pages (used with --with-html)
    #[arg(long, default_value = PATH_TO_HTML_FILES)]
    html_dir: PathBuf,
}

#[derive(Args)]
struct DownloadArgs {
    /// Episode number or range: N, N-M, N- or -M
    #[arg(
        short,
        long,
        value_name = "RANGE",
        value_parser = parse_episode_range,
        default_value = "0-9999"
    )]
    episode: (u32, u32),

    /// Start of date range, YYYY-MM-DD (overrides --episode)
    #[arg(short = 'S', value_name = "START_DATE", value_parser = parse_date)]
    start_date: Option<NaiveDate>,

    /// End of date range, YYYY-MM-DD (overrides --episode)
    #[arg(short = 'E', value_name = "END_DATE", value_parser = parse_date)]
    end_date: Option<NaiveDate>,

    /// Only the most recent episode; other filters are ignored
    #[arg(long)]
    last: bool,

    /// Also download page PDFs
    #[arg(long)]
    with_pdf: bool,

    /// Also download audio tracks
    #[arg(long)]
    with_atrack: bool,

    /// Folder for downloaded files
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// JSON database (URL or local file)
    #[arg(long, env = "LEPDL_DB_URL")]
    db_url: Option<String>,
}

impl Cli {
    /// Logging setup derived from the global flags.
    pub fn log_options(&self) -> LogOptions {
        let dest = match &self.command {
            Commands::Parse(args) => &args.dest,
            Commands::Download(args) => &args.dest,
        };
        LogOptions {
            verbose: self.verbose,
            debug_file: self.debug.then(|| dest.join(DEBUG_FILENAME)),
        }
    }
}

/// Run the parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse(args) => parse::cmd_parse(&settings, args, cli.quiet).await,
        Commands::Download(args) => download::cmd_download(&settings, args, cli.quiet).await,
    }
}
