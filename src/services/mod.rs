//! Service layer for lep-downloader business logic.
//!
//! Domain logic separated from UI concerns; the CLI drives these and renders
//! their events.

pub mod catalog;
pub mod download;
pub mod merge;
pub mod parse;

pub use catalog::FileCatalog;
pub use download::{
    DownloadEngine, DownloadError, DownloadEvent, DownloadReport, FileOutcome, Partition,
};
pub use merge::{DatabaseMerger, Delta, MergeError, MergeMode};
pub use parse::{run_parse, ParseError, ParseOptions, ParseReport};
