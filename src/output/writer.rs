//! Persisting reconciliation reports

use crate::{
    error::{ErrorContext, Result},
    models::ReconciliationReport,
};
use std::fs;
use std::path::Path;

/// Writes reports as pretty-printed JSON
pub struct ReportWriter;

impl ReportWriter {
    /// Serialize `report` to `path`, creating parent directories as needed
    pub fn write(report: &ReconciliationReport, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))
    }

    /// Load a report written by [`ReportWriter::write`]
    pub fn read(path: &Path) -> Result<ReconciliationReport> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read report {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }
}
