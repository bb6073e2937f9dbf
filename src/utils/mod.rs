//! Shared utility functions.
//!
//! This module contains reusable utilities used across the codebase:
//! - `html`: declarative element queries over parsed HTML
//! - `filename`: path-safe names and URL normalization

mod filename;
pub mod html;

pub use filename::{canonical_url, sanitize_filename, truncate_chars, url_key};
