//! Report persistence and console output
//!
//! Reports are written as pretty JSON for machines and summarized in color
//! for the operator.

mod summary;
mod writer;

pub use summary::{format_duration_ns, LatencyLevel, SummaryFormatter};
pub use writer::ReportWriter;
