//! RADIUS accounting load generator.
//!
//! Simulates a population of network endpoints, each running one session
//! that reports Start, a number of Interim-Updates and Stop, and pushes the
//! resulting accounting events through a fixed pool of concurrent senders.
//!
//! # Modules
//!
//! - [`config`]: Run configuration (defaults, TOML, validation)
//! - [`endpoints`]: Deterministic endpoint derivation
//! - [`timeline`]: Round-by-round event generation
//! - [`dispatch`]: Lane routing and the worker pool
//! - [`latency`]: Send latency histogram
//! - [`runner`]: Run coordinator and summary

pub mod config;
pub mod dispatch;
pub mod endpoints;
pub mod latency;
pub mod runner;
pub mod timeline;

pub use config::{ConfigError, RunConfig};
pub use dispatch::{route, DispatchError, DispatchReport, PoolConfig, WorkerPool};
pub use endpoints::derive_endpoints;
pub use latency::{LatencyReport, LatencyTracker};
pub use runner::{run, RunSummary, Spammer, SpammerError};
pub use timeline::{generate, Timeline};
