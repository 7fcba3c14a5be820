//! Transfer reporting
//!
//! The [`TransferLog`] trait is the logging collaborator handed to the
//! fetcher and the mirror coordinator. [`TracingLog`] renders each event as
//! a `tracing` record in the familiar wget layout.

use chrono::{DateTime, Local};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Timestamp layout used for start and finish lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Width of the progress bar in columns
pub const BAR_WIDTH: usize = 30;

/// Snapshot of one transfer in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// Bytes received so far
    pub written: u64,

    /// Expected size, if the server announced one
    pub total: Option<u64>,

    /// Average speed since the transfer started, in bytes per second
    pub speed: f64,

    /// Estimated time left; None when the total is unknown
    pub eta: Option<Duration>,
}

impl TransferProgress {
    /// Computes speed and ETA from the bytes received over `elapsed`
    pub fn measure(written: u64, total: Option<u64>, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 { written as f64 / secs } else { 0.0 };
        // None when the estimate does not fit a Duration
        let eta = total.and_then(|total| {
            if speed <= 0.0 {
                return None;
            }
            let remaining = total.saturating_sub(written) as f64;
            Duration::try_from_secs_f64(remaining / speed).ok()
        });

        Self {
            written,
            total,
            speed,
            eta,
        }
    }

    /// Fraction complete in `0.0..=1.0`, if the total is known and non-zero
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.written as f64 / total as f64).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

/// Receives the life cycle of every transfer
///
/// Every call carries the URL it concerns, so events from concurrent
/// workers can be told apart even when they interleave.
pub trait TransferLog: Send + Sync {
    /// A request for `url` is about to be sent
    fn start(&self, url: &Url, time: DateTime<Local>);

    /// The response status line arrived
    fn status(&self, url: &Url, code: u16);

    /// The announced body size (None when the server sent no length)
    fn content_info(&self, url: &Url, size: Option<u64>);

    /// The body of `url` will be stored at `path`
    fn saving_to(&self, url: &Url, path: &Path);

    /// Periodic progress while the body streams in
    fn progress(&self, url: &Url, progress: &TransferProgress);

    /// The transfer of `url` finished successfully
    fn done(&self, url: &Url, time: DateTime<Local>);

    /// The transfer of `url` failed or was abandoned
    fn error(&self, url: &Url, error: &dyn Display);
}

/// Renders transfer events through `tracing`
///
/// Milestones are logged at `info`, progress lines at `debug` and failures
/// at `warn`, so the default filter shows one compact block per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl TracingLog {
    pub fn new() -> Self {
        Self
    }
}

impl TransferLog for TracingLog {
    fn start(&self, url: &Url, time: DateTime<Local>) {
        tracing::info!("start at {} {}", time.format(TIMESTAMP_FORMAT), url);
    }

    fn status(&self, url: &Url, code: u16) {
        tracing::info!(
            "sending request, awaiting response... status {} {} ({})",
            code,
            status_text(code),
            url
        );
    }

    fn content_info(&self, url: &Url, size: Option<u64>) {
        match size {
            Some(size) => {
                tracing::info!("content size: {} [~{}] ({})", size, content_size(size), url)
            }
            None => tracing::info!("content size: unspecified ({})", url),
        }
    }

    fn saving_to(&self, _url: &Url, path: &Path) {
        tracing::info!("saving file to: {}", path.display());
    }

    fn progress(&self, url: &Url, progress: &TransferProgress) {
        tracing::debug!("{} {}", progress_line(progress), url);
    }

    fn done(&self, url: &Url, time: DateTime<Local>) {
        tracing::info!(
            "Downloaded [{}] finished at {}",
            url,
            time.format(TIMESTAMP_FORMAT)
        );
    }

    fn error(&self, url: &Url, error: &dyn Display) {
        tracing::warn!("error: {} ({})", error, url);
    }
}

/// Reason phrase for a status code
fn status_text(code: u16) -> &'static str {
    reqwest::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown Status")
}

/// Human-readable size: `512.00B`, `1.50KiB`, `3.00MiB`, `1.00GiB`
pub fn content_size(size: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * KIB;
    const GIB: f64 = 1024.0 * MIB;

    let size = size as f64;
    if size >= GIB {
        format!("{:.2}GiB", size / GIB)
    } else if size >= MIB {
        format!("{:.2}MiB", size / MIB)
    } else if size >= KIB {
        format!("{:.2}KiB", size / KIB)
    } else {
        format!("{:.2}B", size)
    }
}

/// Human-readable speed: `B/s`, `KiB/s` or `MiB/s`
pub fn format_speed(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * KIB;

    if bytes_per_sec >= MIB {
        format!("{:.2} MiB/s", bytes_per_sec / MIB)
    } else if bytes_per_sec >= KIB {
        format!("{:.2} KiB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.2} B/s", bytes_per_sec)
    }
}

/// Remaining time as `Ns` below a minute, `NmNs` above
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m{}s", secs / 60, secs % 60)
    }
}

/// Renders the bar for a progress snapshot
///
/// With a known total the bar fills with `=`; otherwise a single `>` marker
/// moves one column per 10 KiB received.
pub fn progress_bar(progress: &TransferProgress) -> String {
    match progress.fraction() {
        Some(fraction) => {
            let done = ((fraction * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
            format!("{}{}", "=".repeat(done), " ".repeat(BAR_WIDTH - done))
        }
        None => {
            let marker = (progress.written / 10_240) as usize % BAR_WIDTH;
            (0..BAR_WIDTH)
                .map(|i| if i == marker { '>' } else { ' ' })
                .collect()
        }
    }
}

/// Full progress line: sizes in KiB, bar, percentage, speed and ETA
pub fn progress_line(progress: &TransferProgress) -> String {
    let written_kib = progress.written as f64 / 1024.0;
    let speed = format_speed(progress.speed);
    let bar = progress_bar(progress);

    match (progress.total, progress.fraction()) {
        (Some(total), Some(fraction)) => format!(
            "{:.2} KiB / {:.2} KiB [{}] {:6.2}% {} {}",
            written_kib,
            total as f64 / 1024.0,
            bar,
            fraction * 100.0,
            speed,
            progress.eta.map(format_eta).unwrap_or_else(|| "??s".to_string())
        ),
        _ => format!(
            "{:.2} KiB / ??.?? KiB [{}]   ??% {} ETA: ?",
            written_kib, bar, speed
        ),
    }
}
