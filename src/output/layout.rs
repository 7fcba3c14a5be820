//! Mapping remote URLs to files under the mirror root
//!
//! Layout rules:
//! - every site lives in `<root>/<host[:port]>/`
//! - a final path segment containing `.` is a file name; anything else is a
//!   directory whose document is saved as `index.html`
//! - query strings and fragments do not affect the location
//! - path segments are percent-decoded, so `/my%20file.html` is saved as
//!   `my file.html`

use crate::url::host_key;
use crate::{MirrorError, UrlError};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::fs::DirBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// File name used for directory-like URLs
pub const INDEX_FILE: &str = "index.html";

/// Where a URL lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPath {
    /// Directory the file is written into
    pub directory: PathBuf,

    /// Bare file name inside `directory`
    pub filename: String,
}

impl LocalPath {
    /// Full path of the file
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Computes the on-disk location of `url` without touching the filesystem
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sumi_mirror::output::map_url;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/a/b/c.html").unwrap();
/// let local = map_url(&url, Path::new("root")).unwrap();
/// assert_eq!(local.directory, Path::new("root/example.com/a/b"));
/// assert_eq!(local.filename, "c.html");
///
/// let url = Url::parse("https://example.com/a/b/").unwrap();
/// let local = map_url(&url, Path::new("root")).unwrap();
/// assert_eq!(local.directory, Path::new("root/example.com/a/b"));
/// assert_eq!(local.filename, "index.html");
/// ```
pub fn map_url(url: &Url, output_root: &Path) -> Result<LocalPath, UrlError> {
    let host = host_key(url).ok_or(UrlError::MissingHost)?;

    let mut segments = Vec::new();
    for raw in url.path().split('/') {
        let segment = decode_segment(raw);
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        if has_separator(&segment) {
            return Err(UrlError::UnsafeSegment(segment.into_owned()));
        }
        segments.push(segment.into_owned());
    }

    let filename = match segments.last() {
        Some(last) if last.contains('.') && !url.path().ends_with('/') => {
            segments.pop().unwrap_or_default()
        }
        _ => INDEX_FILE.to_string(),
    };

    let mut directory = output_root.join(host);
    directory.extend(segments);

    Ok(LocalPath {
        directory,
        filename,
    })
}

/// Computes the on-disk location of `url` and creates its directory
///
/// Directory creation is idempotent: an existing directory is not an error.
/// New directories get mode `0755` on unix.
pub fn local_path(url: &Url, output_root: &Path) -> Result<LocalPath, MirrorError> {
    let local = map_url(url, output_root)?;
    ensure_dir(&local.directory)?;
    Ok(local)
}

/// Creates `dir` and all of its parents if they are missing
pub fn ensure_dir(dir: &Path) -> Result<(), MirrorError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder.create(dir).map_err(|source| MirrorError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes `bytes` to `path`, replacing any previous content
///
/// New files get mode `0644` on unix.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), MirrorError> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }

    let to_error = |source| MirrorError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = options.open(path).map_err(to_error)?;
    file.write_all(bytes).map_err(to_error)?;
    file.flush().map_err(to_error)
}

/// File name for a single download: the last path segment, or `index.html`
///
/// Unlike [`map_url`] no extension is required, so `/download/latest`
/// saves as `latest`.
///
/// The name is percent-decoded unless decoding would produce a path
/// separator, in which case the encoded form is kept.
pub fn filename_from_url(url: &Url) -> String {
    let Some(last) = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
    else {
        return INDEX_FILE.to_string();
    };

    let decoded = decode_segment(last);
    if decoded.is_empty() || has_separator(&decoded) {
        last.to_string()
    } else {
        decoded.into_owned()
    }
}

fn decode_segment(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

fn has_separator(segment: &str) -> bool {
    segment.contains(['/', '\\', '\0'])
}
