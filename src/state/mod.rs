//! State module for tracking mirror progress
//!
//! `PageState` follows each URL from discovery in the frontier through
//! fetching, link extraction and rewriting to a terminal outcome.

mod page_state;

pub use page_state::PageState;
