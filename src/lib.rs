//! Group Latency Harness
//!
//! A load-generation and reconciliation harness: a client dispatches a group
//! of sequence-numbered runs against a recording server through a fixed worker
//! pool, the server records every run (optionally calling an upstream target),
//! and the client then pairs both sides by sequence number to derive per-run
//! correctness and latency.

pub mod app;
pub mod cli;
pub mod config;
pub mod client;
pub mod error;
pub mod logging;
pub mod executor;
pub mod output;
pub mod models;
pub mod reconcile;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{GroupSpec, ReconciliationReport, ResultIssue, Run, RunError, RunGroup, RunResult};
pub use reconcile::{reconcile, ReconciliationEngine};
pub use executor::{ExecutionSummary, GroupExecutor};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent by the client and by the server's upstream calls
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_BIND: &str = "0.0.0.0";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;
    pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
