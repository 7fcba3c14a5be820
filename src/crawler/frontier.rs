//! Crawl frontier: FIFO queue plus visited set
//!
//! This module handles:
//! - Breadth-first ordering of URLs waiting to be fetched
//! - The at-most-once guarantee (visited check at enqueue time)
//! - Telling idle workers when the crawl has drained

use crate::url::visited_key;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use url::Url;

/// A URL scheduled for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// The URL to fetch
    pub url: Url,

    /// Distance in links from the start URL
    pub depth: u32,
}

impl CrawlTarget {
    pub fn new(url: Url, depth: u32) -> Self {
        Self { url, depth }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CrawlTarget>,
    visited: HashSet<String>,
    in_flight: usize,
}

/// Shared frontier for one mirror run
///
/// All mutations (push, pop, visited check-and-insert, in-flight
/// bookkeeping) happen under one mutex, so two workers can never schedule
/// the same URL or lose a queued entry. The lock is never held across an
/// `.await`.
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding only the seed URL at depth 0
    pub fn with_seed(seed: Url) -> Self {
        let frontier = Self::new();
        frontier.enqueue(seed, 0);
        frontier
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // A worker that panicked mid-update cannot leave the queue or set in
        // a torn state, so the data is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds `url` unless an equivalent URL was ever enqueued before
    ///
    /// Returns true if the URL was newly scheduled.
    pub fn enqueue(&self, url: Url, depth: u32) -> bool {
        let key = visited_key(&url);
        let added = {
            let mut state = self.lock();
            if state.visited.insert(key) {
                state.queue.push_back(CrawlTarget::new(url, depth));
                true
            } else {
                false
            }
        };

        if added {
            self.changed.notify_waiters();
        }
        added
    }

    /// Enqueues every URL, returning how many were new
    pub fn enqueue_all(&self, urls: impl IntoIterator<Item = Url>, depth: u32) -> usize {
        urls.into_iter()
            .filter(|url| {
                let added = self.enqueue(url.clone(), depth);
                if !added {
                    tracing::trace!("Already scheduled: {}", url);
                }
                added
            })
            .count()
    }

    /// Pops the oldest target without waiting
    ///
    /// A popped target counts as in flight until [`Frontier::complete`] is
    /// called for it.
    pub fn try_next(&self) -> Option<CrawlTarget> {
        let mut state = self.lock();
        let target = state.queue.pop_front()?;
        state.in_flight += 1;
        Some(target)
    }

    /// Waits for the next target
    ///
    /// Returns None once the queue is empty and no target is in flight, that
    /// is, when no worker can add anything new.
    pub async fn next(&self) -> Option<CrawlTarget> {
        loop {
            // Registered before inspecting the state so no wake-up is missed
            let changed = self.changed.notified();
            {
                let mut state = self.lock();
                if let Some(target) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(target);
                }
                if state.in_flight == 0 {
                    drop(state);
                    self.changed.notify_waiters();
                    return None;
                }
            }
            changed.await;
        }
    }

    /// Marks one previously popped target as finished
    pub fn complete(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Returns true if the URL (or an equivalent spelling) was ever enqueued
    pub fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(&visited_key(url))
    }

    /// Number of targets waiting to be fetched
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if no target is waiting
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of distinct URLs ever enqueued
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of targets popped but not yet completed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}
