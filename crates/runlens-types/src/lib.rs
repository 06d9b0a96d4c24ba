//! Shared progress model for the runlens monitor.
//!
//! Pure data types describing what a checkpointing extraction pipeline
//! leaves on disk ([`run::RunIdentity`], [`task::TaskRecord`],
//! [`secondary::SecondaryPhaseState`]) and the published
//! [`snapshot::StatusSnapshot`]. Kept free of I/O so the state and engine
//! crates can share them.

#![warn(clippy::pedantic)]

pub mod lenient;
pub mod location;
pub mod metrics;
pub mod run;
pub mod secondary;
pub mod snapshot;
pub mod task;
pub mod time;
