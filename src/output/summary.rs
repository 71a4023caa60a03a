//! Console summary of a reconciliation report

use crate::models::{ReconciliationReport, RunGroup};
use colored::*;
use std::fmt::Write as _;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyLevel {
    Excellent, // < 50ms
    Good,      // 50-100ms
    Fair,      // 100-300ms
    Poor,      // 300-1000ms
    VeryPoor,  // > 1000ms
}

impl LatencyLevel {
    pub fn from_ns(ns: u64) -> Self {
        let ms = ns as f64 / 1_000_000.0;
        if ms < 50.0 {
            Self::Excellent
        } else if ms < 100.0 {
            Self::Good
        } else if ms < 300.0 {
            Self::Fair
        } else if ms < 1000.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }
}

/// Human-readable duration from nanoseconds
pub fn format_duration_ns(ns: u64) -> String {
    let ms = ns as f64 / 1_000_000.0;
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.1}ms", ms)
    } else if ms < 60_000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        let minutes = (ms / 60_000.0) as u64;
        let seconds = (ms % 60_000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

/// Renders reports and groups for the terminal
pub struct SummaryFormatter {
    enable_color: bool,
}

impl SummaryFormatter {
    pub fn new(enable_color: bool) -> Self {
        Self { enable_color }
    }

    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn latency(&self, ns: u64) -> ColoredString {
        self.colorize(&format_duration_ns(ns), LatencyLevel::from_ns(ns).color())
    }

    /// Counts, latency bounds and every failing sequence number
    pub fn format_report(&self, report: &ReconciliationReport) -> String {
        let summary = &report.summary;
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "{}", self.bold(&format!("Run group {}", report.client_run_group.id())));
        let _ = writeln!(out, "{}", "─".repeat(60));
        let _ = writeln!(
            out,
            "Results:   {} total, {} matched, {} unmatched",
            summary.total, summary.matched, summary.unmatched
        );

        let clean_color = if summary.with_issues == 0 {
            Color::Green
        } else if summary.clean_rate() >= 0.8 {
            Color::Yellow
        } else {
            Color::Red
        };
        let _ = writeln!(
            out,
            "Clean:     {} ({:.1}%), {} with issues",
            self.colorize(&summary.clean.to_string(), clean_color),
            summary.clean_rate() * 100.0,
            summary.with_issues
        );
        let _ = writeln!(out, "Average:   {}", self.latency(report.average_response_time_ns));
        if summary.matched > 0 {
            let _ = writeln!(
                out,
                "Min/Max:   {} / {}",
                self.latency(summary.min_client_duration_ns),
                self.latency(summary.max_client_duration_ns)
            );
        }

        let failing: Vec<_> = report.failing_results().collect();
        if !failing.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", self.colorize("Issues:", Color::Red));
            for result in failing {
                let _ = writeln!(out, "  #{:<6} {}", result.sequence, result.issue_summary());
            }
        }

        out
    }

    /// One line per group: id, size, recorded runs
    pub fn format_groups(&self, groups: &[RunGroup]) -> String {
        if groups.is_empty() {
            return self.colorize("No run groups.", Color::BrightBlack).to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.bold(&format!("{:<38} {:>6} {:>6} {:>9}  {}", "ID", "N", "C", "RECORDED", "DESCRIPTION")));
        for group in groups {
            let _ = writeln!(
                out,
                "{:<38} {:>6} {:>6} {:>9}  {}",
                group.id(),
                group.run_count(),
                group.effective_concurrency(),
                group.runs().len(),
                group.description
            );
        }
        out
    }
}
