//! Progress engine for an externally running extraction pipeline.
//!
//! [`Monitor`] drives one poll: [`resolve::PathResolver`] finds the
//! active run, `runlens-state` reads it, [`metrics::MetricsEngine`] and
//! [`eta`] derive rates and estimates, and [`snapshot::assemble`]
//! produces the published document.

#![warn(clippy::pedantic)]

pub mod config;
pub mod eta;
pub mod metrics;
pub mod monitor;
pub mod resolve;
pub mod snapshot;

pub use config::parser::{parse_config, parse_config_str};
pub use config::types::MonitorConfig;
pub use config::validator::validate_config;
pub use metrics::MetricsEngine;
pub use monitor::Monitor;
pub use resolve::{PathResolver, ResolutionSource, ResolverSettings};
