//! Repository layer for the persisted episode collection.
//!
//! The store is a single JSON array; see [`json_db`].

pub mod json_db;

pub use json_db::{decode_episodes, encode_episodes, load_episodes, save_episodes, DbError, DbSource};
