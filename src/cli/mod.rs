//! Command-line interface.

mod commands;
pub mod helpers;

pub use commands::{run, Cli};
