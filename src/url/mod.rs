//! URL handling module for Sumi-Mirror
//!
//! This module provides target parsing, visited-set normalization and the
//! same-host policy used by the extractor, the rewriter and the frontier.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{host_key, same_host};
pub use normalize::{parse_target, visited_key};
