//! Suffix-reject and prefix-exclude rules applied before a URL is fetched

/// Decides whether a URL path should be skipped
///
/// * A path is **rejected** when its lowercase form ends with any entry of
///   `reject_suffixes`. Entries are trimmed, lower-cased and dotted, so
///   `jpg`, `.jpg` and ` JPG ` all mean `.jpg`.
/// * A path is **excluded** when the raw, case-sensitive path starts with any
///   trimmed entry of `exclude_prefixes`.
///
/// Blank entries and empty lists never match.
///
/// # Examples
///
/// ```
/// use sumi_mirror::crawler::should_skip;
///
/// assert!(should_skip("/img/pic.JPG", &["jpg".to_string()], &[]));
/// assert!(should_skip("/js/app.js", &[], &["/js".to_string()]));
/// assert!(!should_skip("/css/app.css", &[], &["/js".to_string()]));
/// ```
pub fn should_skip(path: &str, reject_suffixes: &[String], exclude_prefixes: &[String]) -> bool {
    should_reject(path, reject_suffixes) || should_exclude(path, exclude_prefixes)
}

fn should_reject(path: &str, reject_suffixes: &[String]) -> bool {
    if reject_suffixes.is_empty() {
        return false;
    }

    let lower_path = path.to_lowercase();
    reject_suffixes.iter().any(|suffix| {
        let suffix = suffix.trim().to_lowercase();
        if suffix.is_empty() {
            return false;
        }
        let dotted = if suffix.starts_with('.') {
            suffix
        } else {
            format!(".{}", suffix)
        };
        lower_path.ends_with(&dotted)
    })
}

fn should_exclude(path: &str, exclude_prefixes: &[String]) -> bool {
    exclude_prefixes.iter().any(|prefix| {
        let prefix = prefix.trim();
        !prefix.is_empty() && path.starts_with(prefix)
    })
}
