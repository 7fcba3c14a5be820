/// Page state definitions for tracking mirror progress
///
/// This module defines every state a URL can be in while it moves through
/// the orchestrator.
use std::fmt;

/// Represents the current state of a URL in the mirror process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// URL has been accepted into the frontier
    Discovered,

    /// Request is in flight
    Fetching,

    /// A 2xx response body has been received and saved
    Fetched,

    /// HTML body is being scanned for references
    Extracting,

    /// Newly found references are being offered to the frontier
    Enqueuing,

    /// Saved HTML is being rewritten to local relative paths
    Rewriting,

    // ===== Terminal States =====
    /// Final bytes are on disk
    Persisted,

    /// Rejected by the suffix/prefix filter; never fetched
    Filtered,

    /// Transport error, non-2xx status or I/O error
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Filtered | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// ```text
    /// Discovered -> Filtered
    /// Discovered -> Fetching -> Fetched -> Extracting -> Enqueuing -> Rewriting -> Persisted
    ///                        \-> Failed    (Extracting, Enqueuing, Rewriting are optional)
    /// ```
    ///
    /// Once the body is on disk a later I/O failure still ends in `Failed`.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        match (self, next) {
            (Discovered, Filtered) | (Discovered, Fetching) => true,
            (Fetching, Fetched) | (Fetching, Failed) => true,
            (Fetched, Extracting) | (Fetched, Rewriting) | (Fetched, Persisted) => true,
            (Extracting, Enqueuing) | (Extracting, Rewriting) | (Extracting, Persisted) => true,
            (Enqueuing, Rewriting) | (Enqueuing, Persisted) => true,
            (Rewriting, Persisted) => true,
            (Fetched | Extracting | Enqueuing | Rewriting, Failed) => true,
            _ => false,
        }
    }

    /// Short lowercase name used in log fields and the run report
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Extracting => "extracting",
            Self::Enqueuing => "enqueuing",
            Self::Rewriting => "rewriting",
            Self::Persisted => "persisted",
            Self::Filtered => "filtered",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
