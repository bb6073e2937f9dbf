//! lep-downloader: crawl the Luke's English Podcast archive into a JSON
//! database and download episode files from it.
//!
//! The `parse` side lives in [`scrapers`] and [`services::parse`]; the
//! `download` side in [`services::catalog`] and [`services::download`].

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;
pub mod utils;
