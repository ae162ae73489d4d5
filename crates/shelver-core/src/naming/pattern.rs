//! `{Token}` pattern resolution into a relative library path.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

use super::sanitize::{sanitize_component, truncate_bytes};
use super::variables::NamingVariables;

pub const DEFAULT_PATTERN: &str = "{Author}/{Series}/{Title}";

/// File name used for each file of a multi-file download when the pattern
/// carries no disc or chapter number.
pub const MULTI_FILE_NAME: &str = "{DiskNumber:00} - {ChapterNumber:00} - {Title}";

/// Stand-in for an empty variable until the cleanup passes have run.
const EMPTY: &str = "\u{1A}";

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)(?::([^}]+))?\}").expect("token regex"));
static EMPTY_IN_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[\{]\s*\x{1A}\s*[\)\]\}]").expect("bracket regex"));
static SEPARATOR_BEFORE_EMPTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-–—:_]\s*\x{1A}").expect("separator regex"));
static SEPARATOR_AFTER_EMPTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x{1A}\s*[-–—:_]\s*").expect("separator regex"));
static EMPTY_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/?\x{1A}/?").expect("segment regex"));
static REPEATED_SLASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\\/]{2,}").expect("slash regex"));
static REPEATED_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("space regex"));

/// `{N:00}` style zero padding; any other format leaves the value untouched.
fn format_value(value: &str, format: Option<&str>) -> String {
    match format {
        Some(fmt) if !fmt.is_empty() && fmt.chars().all(|c| c == '0') => {
            match value.trim().parse::<i64>() {
                Ok(n) => format!("{:0width$}", n, width = fmt.len()),
                Err(_) => value.to_string(),
            }
        }
        _ => value.to_string(),
    }
}

/// Substitute variables and return the cleaned, sanitized path segments.
///
/// Missing or empty variables drop out together with the brackets or
/// separator that surrounded them. Adjacent segments that are equal
/// (case-insensitive) are collapsed into one.
pub fn apply_pattern(pattern: &str, vars: &NamingVariables) -> Vec<String> {
    let pattern = effective(pattern);

    let substituted = TOKEN.replace_all(pattern, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => {
                let formatted = format_value(value, caps.get(2).map(|m| m.as_str()));
                formatted.replace(['/', '\\'], "_")
            }
            None => {
                tracing::debug!(variable = name, "naming variable empty or unknown");
                EMPTY.to_string()
            }
        }
    });

    let s = EMPTY_IN_BRACKETS.replace_all(&substituted, "");
    let s = SEPARATOR_BEFORE_EMPTY.replace_all(&s, "");
    let s = SEPARATOR_AFTER_EMPTY.replace_all(&s, "");
    let s = EMPTY_SEGMENT.replace_all(&s, "/");
    let s = s.replace(EMPTY, "");
    let s = REPEATED_SLASHES.replace_all(&s, "/");
    let s = REPEATED_SPACES.replace_all(&s, " ");

    let mut parts: Vec<String> = s
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(sanitize_component)
        .collect();
    parts.dedup_by(|next, prev| next.to_lowercase() == prev.to_lowercase());
    parts
}

fn effective(pattern: &str) -> &str {
    if pattern.trim().is_empty() {
        DEFAULT_PATTERN
    } else {
        pattern
    }
}

/// Pattern for the files of a multi-file download. Patterns without
/// `{DiskNumber}` or `{ChapterNumber}` keep their folders and get
/// `MULTI_FILE_NAME` as the file name, so chapters do not collapse into
/// `Title (N)` copies.
pub fn batch_pattern(pattern: &str) -> String {
    let pattern = effective(pattern);
    if pattern.contains("{DiskNumber") || pattern.contains("{ChapterNumber") {
        return pattern.to_string();
    }
    match pattern.rfind('/') {
        Some(i) => format!("{}/{MULTI_FILE_NAME}", &pattern[..i]),
        None => MULTI_FILE_NAME.to_string(),
    }
}

/// The file-name part of a pattern (everything after the last `/`), for
/// imports into an item folder that already exists.
pub fn file_name_pattern(pattern: &str) -> &str {
    let pattern = effective(pattern);
    match pattern.rfind('/') {
        Some(i) if i + 1 < pattern.len() => &pattern[i + 1..],
        _ => pattern,
    }
}

/// Resolve a pattern into a relative path using the platform separator.
pub fn resolve(pattern: &str, vars: &NamingVariables) -> PathBuf {
    let parts = apply_pattern(pattern, vars);
    if parts.is_empty() {
        return PathBuf::from("Unknown");
    }
    parts.iter().collect()
}

/// Resolve a pattern into a relative file path, appending `extension`
/// (without the dot) unless the last segment already ends with it.
pub fn resolve_file_name(pattern: &str, vars: &NamingVariables, extension: Option<&str>) -> PathBuf {
    let mut parts = apply_pattern(pattern, vars);
    if parts.is_empty() {
        parts.push("Unknown".to_string());
    }
    if let Some(ext) = extension.map(|e| e.trim_start_matches('.')).filter(|e| !e.is_empty()) {
        let suffix = format!(".{ext}");
        if let Some(last) = parts.last_mut() {
            if !last.to_lowercase().ends_with(&suffix.to_lowercase()) {
                let stem = truncate_bytes(last, 255usize.saturating_sub(suffix.len()));
                *last = format!("{stem}{suffix}");
            }
        }
    }
    parts.iter().collect()
}
