//! Read-only access to a pipeline's on-disk checkpoint artifacts.
//!
//! Provides the [`CheckpointBackend`] trait with a JSON-file and a
//! `SQLite` implementation, the per-poll backend selection in
//! [`reader::read_checkpoint`], and total loaders for the remaining
//! artifacts. Nothing in this crate writes to pipeline state.

#![warn(clippy::pedantic)]

pub mod artifacts;
pub mod backend;
pub mod error;
pub mod json;
pub mod logs;
pub mod outputs;
pub mod reader;
pub mod scan;
pub mod sqlite;

pub use backend::CheckpointBackend;
pub use error::ReadError;
pub use json::JsonCheckpointBackend;
pub use reader::{read_checkpoint, CheckpointRead, ReaderOptions};
pub use scan::ScanLimits;
pub use sqlite::SqliteCheckpointBackend;
