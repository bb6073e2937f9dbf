//! lepdl - Luke's English Podcast archive parser and downloader.

use clap::Parser;

use lep_downloader::cli::{self, Cli};
use lep_downloader::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(&cli.log_options())?;

    cli::run(cli).await
}
