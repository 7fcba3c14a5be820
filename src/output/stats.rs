//! Run statistics for the end-of-run summary
//!
//! This module turns a [`MirrorReport`] or [`DownloadReport`] into the
//! counts and text printed when a run finishes.

use crate::crawler::{DownloadReport, MirrorReport};
use crate::output::progress::content_size;
use crate::state::PageState;
use std::collections::HashMap;
use std::fmt::Write;

/// Mirror statistics summary
#[derive(Debug, Clone)]
pub struct MirrorStatistics {
    /// URLs taken off the frontier
    pub total_pages: u64,

    /// Count of pages by terminal state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Distinct URLs ever scheduled
    pub visited: u64,

    /// Total size of saved files
    pub bytes_written: u64,

    /// Saved HTML pages whose links were rewritten
    pub rewritten_pages: u64,

    /// Failed URLs with their reason
    pub failures: Vec<(String, String)>,

    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
}

impl MirrorStatistics {
    /// Count for one state, zero if absent
    pub fn count(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Collects statistics from a finished mirror run
pub fn load_statistics(report: &MirrorReport) -> MirrorStatistics {
    let mut pages_by_state = HashMap::new();
    for page in &report.pages {
        *pages_by_state.entry(page.outcome.state()).or_insert(0) += 1;
    }

    let rewritten_pages = report
        .persisted()
        .filter(|page| {
            matches!(
                page.outcome,
                crate::crawler::PageOutcome::Persisted {
                    rewritten: true,
                    ..
                }
            )
        })
        .count() as u64;

    MirrorStatistics {
        total_pages: report.pages.len() as u64,
        pages_by_state,
        visited: report.visited as u64,
        bytes_written: report.bytes_written(),
        rewritten_pages,
        failures: report
            .failed()
            .into_iter()
            .map(|(url, reason)| (url.to_string(), reason.to_string()))
            .collect(),
        elapsed_secs: report.elapsed.as_secs_f64(),
    }
}

/// Renders statistics as the end-of-run summary text
pub fn format_statistics(stats: &MirrorStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Mirror Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  URLs processed: {}", stats.total_pages);
    let _ = writeln!(out, "  URLs scheduled: {}", stats.visited);
    let _ = writeln!(
        out,
        "  Bytes written: {} [~{}]",
        stats.bytes_written,
        content_size(stats.bytes_written)
    );
    if stats.rewritten_pages > 0 {
        let _ = writeln!(out, "  Pages with converted links: {}", stats.rewritten_pages);
    }
    let _ = writeln!(out, "  Elapsed: {:.2}s", stats.elapsed_secs);
    let _ = writeln!(out);

    let _ = writeln!(out, "Pages by State:");
    for state in [PageState::Persisted, PageState::Filtered, PageState::Failed] {
        let count = stats.count(state);
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", state, count, percentage);
    }

    if !stats.failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Failed URLs ({}):", stats.failures.len());
        for (url, reason) in &stats.failures {
            let _ = writeln!(out, "  - {}: {}", url, reason);
        }
    }

    out
}

/// Prints mirror statistics to stdout
pub fn print_statistics(stats: &MirrorStatistics) {
    print!("{}", format_statistics(stats));
}

/// Renders the summary of a URL-list download
pub fn format_download_summary(report: &DownloadReport) -> String {
    let mut out = String::new();

    let sizes: Vec<u64> = report.completed.iter().map(|record| record.bytes).collect();
    let _ = writeln!(out, "content size: {:?}", sizes);
    for record in &report.completed {
        let name = record
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "finished {}", name);
    }

    let urls: Vec<&str> = report.completed.iter().map(|r| r.url.as_str()).collect();
    let _ = writeln!(out, "Download finished: {:?}", urls);

    if !report.failed.is_empty() {
        let _ = writeln!(out, "Failed ({}):", report.failed.len());
        for (url, reason) in &report.failed {
            let _ = writeln!(out, "  - {}: {}", url, reason);
        }
    }

    out
}
