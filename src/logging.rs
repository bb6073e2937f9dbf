//! Tracing subscriber setup.
//!
//! Console output goes to stderr and stays at `warn` unless `--verbose` or
//! `RUST_LOG` says otherwise. `--debug` adds an append-only log file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// How logging should be set up for this run.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    /// Debug log file, when requested.
    pub debug_file: Option<PathBuf>,
}

/// Default console directive.
pub fn console_directive(verbose: bool) -> &'static str {
    if verbose {
        "lep_downloader=info"
    } else {
        "lep_downloader=warn"
    }
}

/// Install the global subscriber.
pub fn init(options: &LogOptions) -> anyhow::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| console_directive(options.verbose).into());
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = match &options.debug_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new("lep_downloader=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()?;
    Ok(())
}
