use crate::config::types::MirrorConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(MirrorConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_mirror::config::load_config;
///
/// let config = load_config(Path::new("mirror.toml")).unwrap();
/// println!("Workers: {}", config.mirror.workers);
/// ```
pub fn load_config(path: &Path) -> Result<MirrorConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: MirrorConfig = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Parses a byte-rate limit such as `200k`, `1.5M` or `2g`
///
/// Units are 1024-based and case-insensitive. A bare number is taken as
/// bytes per second. An empty string means "no limit".
///
/// # Examples
///
/// ```
/// use sumi_mirror::config::parse_rate_limit;
///
/// assert_eq!(parse_rate_limit("").unwrap(), None);
/// assert_eq!(parse_rate_limit("100k").unwrap(), Some(102_400));
/// assert_eq!(parse_rate_limit("512").unwrap(), Some(512));
/// ```
pub fn parse_rate_limit(rate: &str) -> Result<Option<u64>, ConfigError> {
    let rate = rate.trim();
    if rate.is_empty() {
        return Ok(None);
    }

    let (number, multiplier) = match rate.char_indices().last() {
        Some((idx, unit)) if unit.is_ascii_alphabetic() => {
            let multiplier = match unit.to_ascii_lowercase() {
                'k' => 1024.0,
                'm' => 1024.0 * 1024.0,
                'g' => 1024.0 * 1024.0 * 1024.0,
                _ => {
                    return Err(ConfigError::InvalidRateLimit(format!(
                        "unknown unit '{}' in '{}'",
                        unit, rate
                    )))
                }
            };
            (&rate[..idx], multiplier)
        }
        _ => (rate, 1.0),
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidRateLimit(format!("'{}': {}", rate, e)))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidRateLimit(format!(
            "'{}' must be a positive number",
            rate
        )));
    }

    Ok(Some((value * multiplier).round().max(1.0) as u64))
}

/// Splits `s` by `sep`, trimming each element and dropping blank ones
///
/// ```
/// use sumi_mirror::config::split_and_trim;
///
/// assert_eq!(split_and_trim(" jpg, ,gif ", ","), vec!["jpg", "gif"]);
/// ```
pub fn split_and_trim(s: &str, sep: &str) -> Vec<String> {
    s.split(sep)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves the output directory given on the command line or in config
///
/// Blank input means the current directory; a leading `~` or `~/` expands
/// to the user's home directory.
pub fn resolve_output_dir(dir: &str) -> PathBuf {
    let dir = dir.trim();
    if dir.is_empty() {
        return PathBuf::from(".");
    }

    match (dir, dirs::home_dir()) {
        ("~", Some(home)) => home,
        (d, Some(home)) if d.starts_with("~/") => home.join(&d[2..]),
        (d, _) => PathBuf::from(d),
    }
}

/// Reads one URL per line from `path`
///
/// Lines are trimmed and blank lines skipped. A file that yields no URLs is
/// an error.
pub fn read_urls(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::UrlList {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(ConfigError::UrlList {
            path: path.display().to_string(),
            message: "no URLs found".to_string(),
        });
    }

    Ok(urls)
}
