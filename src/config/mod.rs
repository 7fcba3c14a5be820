//! Configuration module for Sumi-Mirror
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, plus the small parsers shared with the command line
//! (rate limits, comma lists, output directories, URL lists).
//!
//! # Example
//!
//! ```no_run
//! use sumi_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring into: {}", config.mirror.output_dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{HttpOptions, MirrorConfig, MirrorOptions};

// Re-export parser functions
pub use parser::{load_config, parse_rate_limit, read_urls, resolve_output_dir, split_and_trim};
pub use validation::{validate, MAX_WORKERS};
