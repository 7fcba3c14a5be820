//! Output module: everything that ends up on disk or on the terminal
//!
//! This module handles:
//! - Mapping URLs to files under the mirror root and writing them
//! - Rewriting saved HTML so the copy is browsable offline
//! - Transfer progress reporting
//! - End-of-run statistics

mod layout;
mod progress;
mod rewrite;
pub mod stats;

pub use layout::{
    ensure_dir, filename_from_url, local_path, map_url, write_file, LocalPath, INDEX_FILE,
};
pub use progress::{
    content_size, format_eta, format_speed, progress_line, TracingLog, TransferLog,
    TransferProgress, TIMESTAMP_FORMAT,
};
pub use rewrite::rewrite_links;
pub use stats::{format_statistics, load_statistics, print_statistics, MirrorStatistics};
