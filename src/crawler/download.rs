//! Plain downloads: one URL, or every URL listed in a file

use crate::crawler::fetcher::Fetcher;
use crate::output::{ensure_dir, filename_from_url, write_file, TransferLog};
use crate::url::parse_target;
use crate::MirrorError;
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use url::Url;

/// Concurrent transfers used for URL lists when none is configured
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;

/// A file saved by a plain download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub url: Url,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of downloading a URL list
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Successful downloads, in completion order
    pub completed: Vec<DownloadRecord>,

    /// URLs that could not be downloaded, with the reason
    pub failed: Vec<(String, String)>,
}

impl DownloadReport {
    /// Total bytes saved
    pub fn bytes_written(&self) -> u64 {
        self.completed.iter().map(|record| record.bytes).sum()
    }
}

/// Downloads one URL into `output_dir`
///
/// The file is named `output_name` when given, otherwise after the last
/// path segment of the URL (`index.html` for directory-like URLs). Errors
/// are reported to `log` and returned.
pub async fn download_file(
    url: &str,
    output_dir: &Path,
    output_name: Option<&str>,
    fetcher: &dyn Fetcher,
    log: &dyn TransferLog,
) -> Result<DownloadRecord, MirrorError> {
    let url = parse_target(url)?;

    let result = fetch_to_disk(&url, output_dir, output_name, fetcher, log).await;
    if let Err(e) = &result {
        log.error(&url, e);
    }
    result
}

async fn fetch_to_disk(
    url: &Url,
    output_dir: &Path,
    output_name: Option<&str>,
    fetcher: &dyn Fetcher,
    log: &dyn TransferLog,
) -> Result<DownloadRecord, MirrorError> {
    log.start(url, Local::now());
    let response = fetcher.fetch(url, log).await?;
    if !response.is_success() {
        return Err(MirrorError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let filename = match output_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => filename_from_url(url),
    };

    ensure_dir(output_dir)?;
    let path = output_dir.join(filename);
    log.saving_to(url, &path);
    write_file(&path, &response.body)?;
    log.done(url, Local::now());

    Ok(DownloadRecord {
        url: url.clone(),
        path,
        bytes: response.body.len() as u64,
    })
}

/// Downloads every URL in `urls` into `output_dir`
///
/// Up to `concurrency` transfers run at once. A failure never stops the
/// other downloads.
pub async fn download_input(
    urls: &[String],
    output_dir: &Path,
    concurrency: usize,
    fetcher: &dyn Fetcher,
    log: &dyn TransferLog,
) -> DownloadReport {
    let results: Vec<(String, Result<DownloadRecord, MirrorError>)> = stream::iter(urls)
        .map(|url| async move {
            let result = download_file(url, output_dir, None, fetcher, log).await;
            (url.clone(), result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = DownloadReport::default();
    for (url, result) in results {
        match result {
            Ok(record) => report.completed.push(record),
            Err(e) => {
                tracing::warn!("Error downloading {}: {}", url, e);
                report.failed.push((url, e.to_string()));
            }
        }
    }

    tracing::info!(
        "Download finished: {} completed, {} failed, {} bytes",
        report.completed.len(),
        report.failed.len(),
        report.bytes_written()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::HttpFetcher;
    use crate::config::HttpOptions;
    use crate::output::TracingLog;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/report.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&HttpOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_download_uses_last_segment() {
        let server = server().await;
        let temp = TempDir::new().unwrap();
        let url = format!("{}/files/report.pdf", server.uri());

        let record = download_file(&url, temp.path(), None, &fetcher(), &TracingLog)
            .await
            .unwrap();

        assert_eq!(record.path, temp.path().join("report.pdf"));
        assert_eq!(record.bytes, 4);
        assert_eq!(std::fs::read(&record.path).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_download_with_output_name_and_new_directory() {
        let server = server().await;
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested/dir");

        let record = download_file(&server.uri(), &out, Some("home.html"), &fetcher(), &TracingLog)
            .await
            .unwrap();

        assert_eq!(record.path, out.join("home.html"));
        assert!(record.path.is_file());
    }

    #[tokio::test]
    async fn test_download_root_defaults_to_index() {
        let server = server().await;
        let temp = TempDir::new().unwrap();

        let record = download_file(&server.uri(), temp.path(), None, &fetcher(), &TracingLog)
            .await
            .unwrap();
        assert_eq!(record.path, temp.path().join("index.html"));
    }

    #[tokio::test]
    async fn test_download_bad_status() {
        let server = server().await;
        let temp = TempDir::new().unwrap();
        let url = format!("{}/missing.txt", server.uri());

        let result = download_file(&url, temp.path(), None, &fetcher(), &TracingLog).await;
        assert!(matches!(
            result,
            Err(MirrorError::HttpStatus { status: 404, .. })
        ));
        assert!(!temp.path().join("missing.txt").exists());
    }

    #[tokio::test]
    async fn test_download_invalid_url() {
        let temp = TempDir::new().unwrap();
        let result = download_file("::nope::", temp.path(), None, &fetcher(), &TracingLog).await;
        assert!(matches!(result, Err(MirrorError::UrlError(_))));
    }

    #[tokio::test]
    async fn test_download_input_continues_past_failures() {
        let server = server().await;
        let temp = TempDir::new().unwrap();
        let urls = vec![
            format!("{}/files/report.pdf", server.uri()),
            format!("{}/missing.txt", server.uri()),
            "not a url".to_string(),
            server.uri(),
        ];

        let report = download_input(&urls, temp.path(), 3, &fetcher(), &TracingLog).await;

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.bytes_written(), 4 + "<html></html>".len() as u64);
        assert!(temp.path().join("report.pdf").is_file());
        assert!(temp.path().join("index.html").is_file());

        assert!(report.failed.iter().any(|(url, _)| url == "not a url"));
    }
}
