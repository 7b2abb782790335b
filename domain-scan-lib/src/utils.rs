//! Utility functions for suffix handling and list parsing.
//!
//! Helpers shared by the generator, the lookup client and the
//! configuration layer.

use crate::types::MAX_LOOKUP_TIMEOUT;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// One or more dot-separated labels, optional leading dot.
    static ref SUFFIX_RE: Regex =
        Regex::new(r"^\.?[a-z0-9-]+(\.[a-z0-9-]+)*$").expect("suffix regex is valid");
}

/// Normalize a user-supplied suffix to `.label` form.
///
/// Trims, lower-cases and adds a leading dot when missing. Returns `None`
/// for empty input.
///
/// ```
/// use domain_scan_lib::normalize_suffix;
///
/// assert_eq!(normalize_suffix(" COM "), Some(".com".to_string()));
/// assert_eq!(normalize_suffix(".net"), Some(".net".to_string()));
/// assert_eq!(normalize_suffix("   "), None);
/// ```
pub fn normalize_suffix(suffix: &str) -> Option<String> {
    let trimmed = suffix.trim().to_lowercase();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    if trimmed.starts_with('.') {
        Some(trimmed)
    } else {
        Some(format!(".{}", trimmed))
    }
}

/// Whether a suffix has a plausible shape (`com`, `.com`, `.co.uk`).
pub fn is_valid_suffix(suffix: &str) -> bool {
    SUFFIX_RE.is_match(&suffix.trim().to_lowercase())
}

/// Extract the lookup suffix of a domain: the text after the final dot.
///
/// A domain without any dot yields the whole string.
pub fn extract_suffix(domain: &str) -> &str {
    match domain.rfind('.') {
        Some(idx) => &domain[idx + 1..],
        None => domain,
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// Bare numbers are taken as seconds. Anything longer than an hour is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }?;

    (secs <= MAX_LOOKUP_TIMEOUT.as_secs()).then_some(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_suffix() {
        assert_eq!(normalize_suffix("com"), Some(".com".to_string()));
        assert_eq!(normalize_suffix(".COM"), Some(".com".to_string()));
        assert_eq!(normalize_suffix("  .org  "), Some(".org".to_string()));
        assert_eq!(normalize_suffix(""), None);
        assert_eq!(normalize_suffix("."), None);
    }

    #[test]
    fn test_is_valid_suffix() {
        assert!(is_valid_suffix("com"));
        assert!(is_valid_suffix(".com"));
        assert!(is_valid_suffix(".co.uk"));
        assert!(!is_valid_suffix(""));
        assert!(!is_valid_suffix(".co..uk"));
        assert!(!is_valid_suffix(".c m"));
    }

    #[test]
    fn test_extract_suffix() {
        assert_eq!(extract_suffix("example.com"), "com");
        assert_eq!(extract_suffix("test.co.uk"), "uk");
        assert_eq!(extract_suffix("localhost"), "localhost");
        assert_eq!(extract_suffix("trailing."), "");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("AABB, ABAB,,"), vec!["AABB", "ABAB"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30s"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_parse_timeout_string_bounds() {
        assert_eq!(parse_timeout_string("60m"), Some(3600));
        assert_eq!(parse_timeout_string("3600"), Some(3600));
        assert_eq!(parse_timeout_string("61m"), None);
        assert_eq!(parse_timeout_string("3601s"), None);
        assert_eq!(parse_timeout_string("10000000000000000000s"), None);
        assert_eq!(parse_timeout_string("400000000000000000m"), None);
    }
}
