//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, persist, extract and rewrite cycle end-to-end.

use std::path::PathBuf;
use sumi_mirror::config::{load_config, HttpOptions};
use sumi_mirror::crawler::{run_mirror, HttpFetcher, MirrorSettings, PageOutcome};
use sumi_mirror::output::TracingLog;
use sumi_mirror::state::PageState;
use sumi_mirror::url::host_key;
use sumi_mirror::MirrorError;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

/// Mounts a page that must be requested exactly once
async fn mount_once(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// Directory the mirror uses for this server (`127.0.0.1:<port>`)
fn site_dir(root: &TempDir, server: &MockServer) -> PathBuf {
    let url = Url::parse(&server.uri()).expect("Failed to parse server URL");
    root.path()
        .join(host_key(&url).expect("Failed to extract host"))
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&HttpOptions::default()).expect("Failed to build fetcher")
}

#[tokio::test]
async fn test_mirror_stays_on_start_host() {
    let site = MockServer::start().await;
    let other = MockServer::start().await;

    // Any request to the other host fails verification on drop
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&other)
        .await;

    mount_once(
        &site,
        "/",
        html(format!(
            r#"<html><body>
                <a href="/about.html">About</a>
                <img src="/logo.png">
                <a href="{}/x">Elsewhere</a>
            </body></html>"#,
            other.uri()
        )),
    )
    .await;
    mount_once(&site, "/about.html", html(r#"<a href="/">Home</a>"#)).await;
    mount_once(
        &site,
        "/logo.png",
        ResponseTemplate::new(200).set_body_raw(b"\x89PNG".to_vec(), "image/png"),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let start = format!("{}/", site.uri());
    let report = run_mirror(&start, &MirrorSettings::new(temp.path()), &fetcher(), &TracingLog)
        .await
        .expect("mirror run failed");

    let dir = site_dir(&temp, &site);
    assert!(dir.join("index.html").is_file());
    assert!(dir.join("about.html").is_file());
    assert_eq!(std::fs::read(dir.join("logo.png")).unwrap(), b"\x89PNG");

    assert_eq!(report.count(PageState::Persisted), 3);
    assert!(report.failed().is_empty());
    assert_eq!(report.visited, 3);

    // Only the one site directory exists under the root
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_convert_links_produces_browsable_copy() {
    let site = MockServer::start().await;

    mount_once(
        &site,
        "/",
        html(
            r#"<html><head>
                <link rel="stylesheet" href="/css/site.css">
                <style>.hero { background: url('/img/hero.jpg') }</style>
            </head><body>
                <a href="/blog/">Blog</a>
                <a href="/blog/first.html#comments">First post</a>
            </body></html>"#,
        ),
    )
    .await;
    mount_once(
        &site,
        "/blog/",
        html(r#"<a href="first.html">First</a><a href="../">Home</a>"#),
    )
    .await;
    mount_once(
        &site,
        "/blog/first.html",
        html(r#"<p style="background: url(/img/hero.jpg)">hi</p><a href="/">Home</a>"#),
    )
    .await;
    mount_once(
        &site,
        "/css/site.css",
        ResponseTemplate::new(200).set_body_raw("body { color: red }", "text/css"),
    )
    .await;
    mount_once(
        &site,
        "/img/hero.jpg",
        ResponseTemplate::new(200).set_body_raw(b"JPEG".to_vec(), "image/jpeg"),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let mut settings = MirrorSettings::new(temp.path());
    settings.convert_links = true;

    let report = run_mirror(&site.uri(), &settings, &fetcher(), &TracingLog)
        .await
        .expect("mirror run failed");
    assert_eq!(report.count(PageState::Persisted), 5);

    let dir = site_dir(&temp, &site);
    let index = std::fs::read_to_string(dir.join("index.html")).unwrap();
    assert!(index.contains(r#"href="css/site.css""#));
    assert!(index.contains("url('img/hero.jpg')"));
    assert!(index.contains(r#"href="blog/index.html""#));
    assert!(index.contains(r#"href="blog/first.html#comments""#));

    let blog = std::fs::read_to_string(dir.join("blog/index.html")).unwrap();
    assert!(blog.contains(r#"href="first.html""#));
    assert!(blog.contains(r#"href="../index.html""#));

    let first = std::fs::read_to_string(dir.join("blog/first.html")).unwrap();
    assert!(first.contains("url(../img/hero.jpg)"));
    assert!(first.contains(r#"href="../index.html""#));

    // Non-HTML assets are stored byte for byte
    assert_eq!(
        std::fs::read_to_string(dir.join("css/site.css")).unwrap(),
        "body { color: red }"
    );
}

#[tokio::test]
async fn test_broken_links_do_not_stop_the_run() {
    let site = MockServer::start().await;

    mount_once(
        &site,
        "/",
        html(r#"<a href="/gone.html">gone</a><a href="/error.html">error</a><a href="/ok.html">ok</a>"#),
    )
    .await;
    mount_once(&site, "/gone.html", ResponseTemplate::new(404)).await;
    mount_once(&site, "/error.html", ResponseTemplate::new(500)).await;
    mount_once(&site, "/ok.html", html("fine")).await;

    let temp = TempDir::new().unwrap();
    let report = run_mirror(&site.uri(), &MirrorSettings::new(temp.path()), &fetcher(), &TracingLog)
        .await
        .expect("mirror run failed");

    assert_eq!(report.count(PageState::Persisted), 2);
    assert_eq!(report.count(PageState::Failed), 2);

    let dir = site_dir(&temp, &site);
    assert!(dir.join("ok.html").is_file());
    assert!(!dir.join("gone.html").exists());
    assert!(!dir.join("error.html").exists());
}

#[tokio::test]
async fn test_malformed_start_url_sends_no_request() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("never"))
        .expect(0)
        .mount(&site)
        .await;

    let temp = TempDir::new().unwrap();
    let result = run_mirror(
        "not a url \t",
        &MirrorSettings::new(temp.path()),
        &fetcher(),
        &TracingLog,
    )
    .await;

    match result {
        Err(MirrorError::InvalidStartUrl { url, .. }) => assert_eq!(url, "not a url \t"),
        other => panic!("expected InvalidStartUrl, got {:?}", other.map(|r| r.pages.len())),
    }
}

#[tokio::test]
async fn test_filters_from_config_file() {
    let site = MockServer::start().await;
    mount_once(
        &site,
        "/",
        html(r#"<img src="/pics/a.GIF"><a href="/private/x.html">x</a><a href="/public.html">p</a>"#),
    )
    .await;
    mount_once(&site, "/public.html", html("public")).await;
    Mock::given(method("GET"))
        .and(path("/pics/a.GIF"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/x.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;

    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let config_path = temp.path().join("mirror.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[mirror]
output-dir = "{}"
reject = ["gif"]
exclude = ["/private"]
workers = 2
"#,
            out.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).expect("config should load");
    let settings = MirrorSettings::from_options(&config.mirror);
    let fetcher = HttpFetcher::new(&config.http).unwrap();

    let report = run_mirror(&site.uri(), &settings, &fetcher, &TracingLog)
        .await
        .expect("mirror run failed");

    assert_eq!(report.count(PageState::Persisted), 2);
    assert_eq!(report.filtered().len(), 2);
    assert!(out.is_dir());
}

#[tokio::test]
async fn test_concurrent_workers_fetch_each_page_once() {
    let site = MockServer::start().await;

    let index: String = (0..30)
        .map(|i| format!(r#"<a href="/p{}.html">{}</a>"#, i, i))
        .collect();
    mount_once(&site, "/", html(index)).await;

    for i in 0..30 {
        let body = format!(
            r#"<a href="/">home</a><a href="/p{}.html">next</a><a href="p{}.html#again">self</a>"#,
            (i + 1) % 30,
            i
        );
        mount_once(&site, &format!("/p{}.html", i), html(body)).await;
    }

    let temp = TempDir::new().unwrap();
    let mut settings = MirrorSettings::new(temp.path());
    settings.workers = 8;

    let report = run_mirror(&site.uri(), &settings, &fetcher(), &TracingLog)
        .await
        .expect("mirror run failed");

    assert_eq!(report.count(PageState::Persisted), 31);
    assert_eq!(report.pages.len(), 31);
    assert!(report
        .pages
        .iter()
        .all(|page| matches!(page.outcome, PageOutcome::Persisted { html: true, .. })));

    let dir = site_dir(&temp, &site);
    for i in 0..30 {
        assert!(dir.join(format!("p{}.html", i)).is_file());
    }
}

#[tokio::test]
async fn test_redirect_to_other_host_is_not_followed() {
    let site = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("OTHER HOST BODY"))
        .expect(0)
        .mount(&other)
        .await;

    mount_once(&site, "/", html(r#"<a href="/out.html">out</a>"#)).await;
    mount_once(
        &site,
        "/out.html",
        ResponseTemplate::new(302)
            .insert_header("Location", format!("{}/secret.html", other.uri()).as_str()),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let report = run_mirror(&site.uri(), &MirrorSettings::new(temp.path()), &fetcher(), &TracingLog)
        .await
        .expect("mirror run failed");

    assert_eq!(report.count(PageState::Persisted), 1);
    assert_eq!(report.count(PageState::Failed), 1);

    let dir = site_dir(&temp, &site);
    assert!(!dir.join("out.html").exists());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_links_on_redirected_page_resolve_against_final_url() {
    let site = MockServer::start().await;

    mount_once(
        &site,
        "/docs",
        ResponseTemplate::new(301).insert_header("Location", format!("{}/docs/", site.uri()).as_str()),
    )
    .await;
    mount_once(&site, "/docs/", html(r#"<a href="guide.html">Guide</a>"#)).await;
    mount_once(&site, "/docs/guide.html", html("<p>guide</p>")).await;

    let temp = TempDir::new().unwrap();
    let mut settings = MirrorSettings::new(temp.path());
    settings.convert_links = true;

    let start = format!("{}/docs", site.uri());
    let report = run_mirror(&start, &settings, &fetcher(), &TracingLog)
        .await
        .expect("mirror run failed");

    assert_eq!(report.count(PageState::Persisted), 2);
    assert!(report.failed().is_empty());

    let dir = site_dir(&temp, &site);
    assert!(dir.join("docs/guide.html").is_file());
    let index = std::fs::read_to_string(dir.join("docs/index.html")).unwrap();
    assert!(index.contains(r#"href="guide.html""#), "{}", index);
}
