//! Mirror coordinator - main orchestration logic
//!
//! This module contains the loop that drives one mirror run:
//! - Seeding the frontier with the start URL
//! - Running the workers that drain the frontier
//! - Filtering, fetching, persisting, extracting and rewriting each page
//! - Collecting the final report

use crate::config::{resolve_output_dir, MirrorOptions, MAX_WORKERS};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::filter::should_skip;
use crate::crawler::frontier::{CrawlTarget, Frontier};
use crate::crawler::parser::extract_links;
use crate::output::{local_path, rewrite_links, write_file, LocalPath, TransferLog};
use crate::state::PageState;
use crate::url::{parse_target, same_host};
use crate::MirrorError;
use chrono::Local;
use futures::future::join_all;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

/// Settings for one mirror run
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    /// Root directory; each site gets a `<host>/` subtree beneath it
    pub output_root: PathBuf,

    /// File suffixes to skip
    pub reject: Vec<String>,

    /// Path prefixes to skip
    pub exclude: Vec<String>,

    /// Rewrite saved HTML to point at the local copies
    pub convert_links: bool,

    /// Number of concurrent workers
    pub workers: usize,
}

impl MirrorSettings {
    /// Sequential mirror into `output_root` with no filters
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            reject: Vec::new(),
            exclude: Vec::new(),
            convert_links: false,
            workers: 1,
        }
    }

    /// Builds settings from the `[mirror]` config section
    pub fn from_options(options: &MirrorOptions) -> Self {
        Self {
            output_root: resolve_output_dir(&options.output_dir),
            reject: options.reject.clone(),
            exclude: options.exclude.clone(),
            convert_links: options.convert_links,
            workers: options.workers,
        }
    }
}

/// How one URL ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The resource is on disk
    Persisted {
        /// Location of the saved file
        path: PathBuf,
        /// Size of the final file
        bytes: u64,
        /// Whether the body was parsed as HTML
        html: bool,
        /// Number of new URLs this page added to the frontier
        links_added: usize,
        /// Whether the saved file holds rewritten links
        rewritten: bool,
    },

    /// Skipped by the reject/exclude rules without a request
    Filtered,

    /// Gave up on the URL
    Failed {
        /// State the page was in when it failed
        stage: PageState,
        /// Human-readable cause
        reason: String,
    },
}

impl PageOutcome {
    /// Terminal state matching this outcome
    pub fn state(&self) -> PageState {
        match self {
            PageOutcome::Persisted { .. } => PageState::Persisted,
            PageOutcome::Filtered => PageState::Filtered,
            PageOutcome::Failed { .. } => PageState::Failed,
        }
    }
}

/// Outcome for one URL taken off the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: Url,
    pub depth: u32,
    pub outcome: PageOutcome,
}

/// Summary of a finished mirror run
#[derive(Debug, Clone)]
pub struct MirrorReport {
    /// The URL the run started from
    pub start_url: Url,

    /// One record per URL taken off the frontier
    pub pages: Vec<PageRecord>,

    /// Distinct URLs ever scheduled
    pub visited: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl MirrorReport {
    /// Pages whose bytes are on disk
    pub fn persisted(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages
            .iter()
            .filter(|page| matches!(page.outcome, PageOutcome::Persisted { .. }))
    }

    /// Saved file paths, in processing order
    pub fn saved_paths(&self) -> Vec<&PathBuf> {
        self.pages
            .iter()
            .filter_map(|page| match &page.outcome {
                PageOutcome::Persisted { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Failed URLs with the reason they failed
    pub fn failed(&self) -> Vec<(&Url, &str)> {
        self.pages
            .iter()
            .filter_map(|page| match &page.outcome {
                PageOutcome::Failed { reason, .. } => Some((&page.url, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// URLs skipped by the filter
    pub fn filtered(&self) -> Vec<&Url> {
        self.pages
            .iter()
            .filter(|page| page.outcome == PageOutcome::Filtered)
            .map(|page| &page.url)
            .collect()
    }

    /// Total size of all saved files
    pub fn bytes_written(&self) -> u64 {
        self.pages
            .iter()
            .map(|page| match page.outcome {
                PageOutcome::Persisted { bytes, .. } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// Number of pages that ended in `state`
    pub fn count(&self, state: PageState) -> usize {
        self.pages
            .iter()
            .filter(|page| page.outcome.state() == state)
            .count()
    }

    /// Outcome for a URL, matched by its exact string form
    pub fn outcome_for(&self, url: &str) -> Option<&PageOutcome> {
        self.pages
            .iter()
            .find(|page| page.url.as_str() == url)
            .map(|page| &page.outcome)
    }
}

/// Tracks the state of one URL and rejects illegal jumps
struct PageLifecycle<'a> {
    url: &'a Url,
    state: PageState,
}

impl<'a> PageLifecycle<'a> {
    fn new(url: &'a Url) -> Self {
        Self {
            url,
            state: PageState::Discovered,
        }
    }

    fn advance(&mut self, next: PageState) -> Result<(), MirrorError> {
        if !self.state.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Drives one mirror run
pub struct Coordinator<'a> {
    start_url: Url,
    settings: MirrorSettings,
    frontier: Frontier,
    fetcher: &'a dyn Fetcher,
    log: &'a dyn TransferLog,
}

impl<'a> Coordinator<'a> {
    /// Creates a coordinator whose frontier holds only `start_url`
    pub fn new(
        start_url: Url,
        settings: MirrorSettings,
        fetcher: &'a dyn Fetcher,
        log: &'a dyn TransferLog,
    ) -> Self {
        let frontier = Frontier::with_seed(start_url.clone());
        Self {
            start_url,
            settings,
            frontier,
            fetcher,
            log,
        }
    }

    /// The shared frontier
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Runs workers until the frontier drains and returns the report
    ///
    /// Per-page failures are recorded in the report, never returned.
    pub async fn run(&self) -> MirrorReport {
        let started = Instant::now();
        let workers = self.settings.workers.clamp(1, MAX_WORKERS);
        tracing::info!(
            "Mirroring {} into {} with {} worker(s)",
            self.start_url,
            self.settings.output_root.display(),
            workers
        );

        let results = join_all((0..workers).map(|id| self.worker(id))).await;
        let pages: Vec<PageRecord> = results.into_iter().flatten().collect();

        let report = MirrorReport {
            start_url: self.start_url.clone(),
            pages,
            visited: self.frontier.visited_count(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Mirror complete: {} saved, {} failed, {} filtered in {:.2}s",
            report.count(PageState::Persisted),
            report.count(PageState::Failed),
            report.count(PageState::Filtered),
            report.elapsed.as_secs_f64()
        );

        report
    }

    async fn worker(&self, id: usize) -> Vec<PageRecord> {
        let mut records = Vec::new();

        while let Some(target) = self.frontier.next().await {
            tracing::debug!("Worker {} processing {}", id, target.url);
            let record = self.process(&target).await;
            self.frontier.complete();
            records.push(record);
        }

        tracing::debug!("Worker {} idle, frontier drained", id);
        records
    }

    async fn process(&self, target: &CrawlTarget) -> PageRecord {
        let mut page = PageLifecycle::new(&target.url);

        let outcome = match self.mirror_page(target, &mut page).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.log.error(&target.url, &error);
                let stage = page.state;
                if let Err(e) = page.advance(PageState::Failed) {
                    tracing::error!("{}", e);
                }
                PageOutcome::Failed {
                    stage,
                    reason: error.to_string(),
                }
            }
        };

        debug_assert!(page.state.is_terminal(), "{} left in {}", target.url, page.state);

        PageRecord {
            url: target.url.clone(),
            depth: target.depth,
            outcome,
        }
    }

    async fn mirror_page(
        &self,
        target: &CrawlTarget,
        page: &mut PageLifecycle<'_>,
    ) -> Result<PageOutcome, MirrorError> {
        let url = &target.url;

        if should_skip(url.path(), &self.settings.reject, &self.settings.exclude) {
            page.advance(PageState::Filtered)?;
            tracing::debug!("Filtered {}", url);
            return Ok(PageOutcome::Filtered);
        }

        page.advance(PageState::Fetching)?;
        self.log.start(url, Local::now());
        let response = self.fetcher.fetch(url, self.log).await?;
        if !response.is_success() {
            return Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }
        // Relative references on a redirected page resolve against where it ended up
        let base = &response.final_url;
        if !same_host(base, url) {
            return Err(MirrorError::OffHostRedirect {
                url: url.to_string(),
                target: base.to_string(),
            });
        }
        page.advance(PageState::Fetched)?;

        let local = local_path(url, &self.settings.output_root)?;
        let file_path = local.file_path();
        self.log.saving_to(url, &file_path);
        write_file(&file_path, &response.body)?;

        let html = response.is_html();
        let mut bytes = response.body.len() as u64;
        let mut links_added = 0;
        let mut rewritten = false;

        if html {
            page.advance(PageState::Extracting)?;
            let links = extract_links(base, &response.body);
            let found = links.len();

            page.advance(PageState::Enqueuing)?;
            links_added = self.frontier.enqueue_all(links, target.depth + 1);
            tracing::debug!(
                "{}: {} same-host links, {} new",
                url,
                found,
                links_added
            );

            if self.settings.convert_links {
                page.advance(PageState::Rewriting)?;
                match self.rewrite(base, &local, &response.body) {
                    Ok(size) => {
                        bytes = size;
                        rewritten = true;
                    }
                    Err(e) => {
                        tracing::warn!("Keeping original links in {}: {}", file_path.display(), e)
                    }
                }
            }
        }

        page.advance(PageState::Persisted)?;
        self.log.done(url, Local::now());

        Ok(PageOutcome::Persisted {
            path: file_path,
            bytes,
            html,
            links_added,
            rewritten,
        })
    }

    /// Rewrites the saved page in place, returning the new size
    fn rewrite(&self, base: &Url, local: &LocalPath, body: &[u8]) -> Result<u64, MirrorError> {
        let converted = rewrite_links(body, base, &self.settings.output_root, &local.directory)?;
        write_file(&local.file_path(), &converted)?;
        Ok(converted.len() as u64)
    }
}

/// Mirrors the site at `start_url`
///
/// A malformed start URL is the only fatal error and is reported before
/// any request is made. Everything else ends up in the report; a run with
/// zero saved pages is still `Ok`.
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::config::HttpOptions;
/// use sumi_mirror::crawler::{run_mirror, HttpFetcher, MirrorSettings};
/// use sumi_mirror::output::TracingLog;
///
/// # async fn example() -> sumi_mirror::Result<()> {
/// let fetcher = HttpFetcher::new(&HttpOptions::default())?;
/// let settings = MirrorSettings::new("mirror");
/// let report = run_mirror("http://example.com/", &settings, &fetcher, &TracingLog).await?;
/// println!("saved {} files", report.saved_paths().len());
/// # Ok(())
/// # }
/// ```
pub async fn run_mirror(
    start_url: &str,
    settings: &MirrorSettings,
    fetcher: &dyn Fetcher,
    log: &dyn TransferLog,
) -> Result<MirrorReport, MirrorError> {
    let start = parse_target(start_url).map_err(|e| MirrorError::InvalidStartUrl {
        url: start_url.to_string(),
        message: e.to_string(),
    })?;

    let coordinator = Coordinator::new(start, settings.clone(), fetcher, log);
    Ok(coordinator.run().await)
}
