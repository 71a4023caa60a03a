//! Data models shared by the client and the server

pub mod config;
pub mod group;
pub mod report;
pub mod run;

// Re-export main model types
pub use config::{ClientConfig, LogSettings, ServerConfig};
pub use group::{GroupSpec, RunGroup};
pub use report::{ReconciliationReport, ReportSummary, ResultIssue, RunResult};
pub use run::{Run, RunError};
