//! Candidate domain generation engine.
//!
//! This module expands patterns into domain bodies and joins them with
//! suffixes to produce the candidate set for a scan.
//!
//! # Modes
//!
//! - `fixed`: every symbol is bound to an alphabet:
//!   `A` = lowercase letter (26), `B` = digit (10), `C` = letter or digit (36).
//!   `"AB"` yields `a0`, `a1`, … `z9` (260 bodies).
//! - `style`: letters `A`-`Z` (case-insensitive) are placeholders; each
//!   distinct letter is assigned one character of `[a-z0-9]` and repeated
//!   letters always receive the same character. `"AABB"` yields `36^2` bodies
//!   such as `xx77`.
//! - `literal`: the pattern itself, lower-cased.
//!
//! # Examples
//!
//! ```
//! use domain_scan_lib::generate::generate_candidates;
//!
//! let result = generate_candidates("fixed", &["BB".to_string()], &[".com".to_string()]);
//! assert_eq!(result.candidates.len(), 100);
//! assert_eq!(result.candidates[0], "00.com");
//! assert_eq!(result.candidates[99], "99.com");
//! ```

use crate::error::ScanError;
use crate::types::{GenerationMode, GenerationResult, MAX_CANDIDATES};
use crate::utils::normalize_suffix;
use std::collections::BTreeSet;
use tracing::{debug, warn};

const LOWERCASE: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z',
];

const DIGITS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

const ALPHANUMERIC: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Alphabet bound to a fixed-mode symbol.
fn symbol_alphabet(symbol: char) -> Option<&'static [char]> {
    match symbol {
        'A' => Some(LOWERCASE),
        'B' => Some(DIGITS),
        'C' => Some(ALPHANUMERIC),
        _ => None,
    }
}

/// Visit every combination of a mixed-radix counter, rightmost digit fastest.
///
/// Nothing is visited when any radix is zero or the radix list is empty.
fn odometer(radices: &[usize], mut visit: impl FnMut(&[usize])) {
    if radices.is_empty() || radices.contains(&0) {
        return;
    }

    let mut counters = vec![0usize; radices.len()];
    loop {
        visit(&counters);

        // Increment odometer (rightmost first)
        let mut i = counters.len();
        loop {
            if i == 0 {
                return;
            }
            i -= 1;
            counters[i] += 1;
            if counters[i] < radices[i] {
                break;
            }
            counters[i] = 0;
        }
    }
}

/// Pre-allocation size for an expansion, capped to keep huge patterns sane.
fn capacity_hint(radices: &[usize]) -> usize {
    radices
        .iter()
        .fold(1usize, |acc, &r| acc.saturating_mul(r))
        .min(1_000_000)
}

/// Parse a fixed-mode pattern into one alphabet per position.
fn parse_fixed_pattern(pattern: &str) -> Result<Vec<&'static [char]>, ScanError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(ScanError::invalid_pattern(pattern, "pattern cannot be empty"));
    }

    pattern
        .chars()
        .map(|symbol| {
            symbol_alphabet(symbol).ok_or_else(|| {
                ScanError::invalid_pattern(pattern, format!("unsupported symbol '{}'", symbol))
            })
        })
        .collect()
}

/// A style pattern: its normalized letters and the sorted distinct set.
struct StylePattern {
    letters: Vec<char>,
    distinct: Vec<char>,
}

fn parse_style_pattern(pattern: &str) -> Result<StylePattern, ScanError> {
    let normalized = pattern.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ScanError::invalid_pattern(pattern, "style cannot be empty"));
    }

    let mut distinct = BTreeSet::new();
    let mut letters = Vec::with_capacity(normalized.len());
    for ch in normalized.chars() {
        if !ch.is_ascii_uppercase() {
            return Err(ScanError::invalid_pattern(
                pattern,
                format!("invalid character '{}' in style", ch),
            ));
        }
        distinct.insert(ch);
        letters.push(ch);
    }

    Ok(StylePattern {
        letters,
        distinct: distinct.into_iter().collect(),
    })
}

/// Expand a fixed-mode pattern into every body of its cartesian product.
pub fn expand_fixed(pattern: &str) -> Result<Vec<String>, ScanError> {
    let alphabets = parse_fixed_pattern(pattern)?;
    let radices: Vec<usize> = alphabets.iter().map(|a| a.len()).collect();

    let mut bodies: Vec<String> = Vec::with_capacity(capacity_hint(&radices));
    odometer(&radices, |counters| {
        bodies.push(
            counters
                .iter()
                .enumerate()
                .map(|(i, &c)| alphabets[i][c])
                .collect(),
        );
    });

    Ok(bodies)
}

/// Expand a style pattern by searching every assignment of its distinct letters.
pub fn expand_style(pattern: &str) -> Result<Vec<String>, ScanError> {
    let style = parse_style_pattern(pattern)?;

    // Position -> index of that letter in the distinct list
    let slots: Vec<usize> = style
        .letters
        .iter()
        .map(|letter| {
            style
                .distinct
                .iter()
                .position(|d| d == letter)
                .unwrap_or_default()
        })
        .collect();

    let radices = vec![ALPHANUMERIC.len(); style.distinct.len()];
    let mut bodies: Vec<String> = Vec::with_capacity(capacity_hint(&radices));
    odometer(&radices, |assignment| {
        bodies.push(slots.iter().map(|&s| ALPHANUMERIC[assignment[s]]).collect());
    });

    Ok(bodies)
}

/// A literal pattern is a single lower-cased body.
pub fn expand_literal(pattern: &str) -> Result<Vec<String>, ScanError> {
    let body = pattern.trim().to_lowercase();
    if body.is_empty() {
        return Err(ScanError::invalid_pattern(pattern, "pattern cannot be empty"));
    }
    Ok(vec![body])
}

/// Expand one pattern under the given mode.
pub fn expand_pattern(mode: GenerationMode, pattern: &str) -> Result<Vec<String>, ScanError> {
    match mode {
        GenerationMode::Fixed => expand_fixed(pattern),
        GenerationMode::Style => expand_style(pattern),
        GenerationMode::Literal => expand_literal(pattern),
    }
}

/// Raw body count of a pattern, computed without expanding it.
///
/// Saturates at `usize::MAX` for very large patterns.
pub fn estimate_pattern_count(mode: GenerationMode, pattern: &str) -> Result<usize, ScanError> {
    match mode {
        GenerationMode::Fixed => Ok(parse_fixed_pattern(pattern)?
            .iter()
            .fold(1usize, |acc, alphabet| acc.saturating_mul(alphabet.len()))),
        GenerationMode::Style => {
            let style = parse_style_pattern(pattern)?;
            Ok((0..style.distinct.len())
                .fold(1usize, |acc, _| acc.saturating_mul(ALPHANUMERIC.len())))
        }
        GenerationMode::Literal => expand_literal(pattern).map(|_| 1),
    }
}

/// Run the full generation pipeline: patterns -> bodies -> candidates.
///
/// `mode` is the raw mode token. An unknown mode or a bad pattern is logged
/// and recorded in `errors`; it skips only that pattern. So is a pattern
/// that would push the run past [`MAX_CANDIDATES`], which is detected from
/// the estimate before anything is expanded. The returned candidates are
/// deduplicated and sorted lexicographically.
pub fn generate_candidates(mode: &str, patterns: &[String], suffixes: &[String]) -> GenerationResult {
    let mut result = GenerationResult::default();

    let suffixes: Vec<String> = suffixes.iter().filter_map(|s| normalize_suffix(s)).collect();
    if suffixes.is_empty() {
        warn!("no usable suffixes supplied, nothing to generate");
    }

    let parsed_mode = mode.parse::<GenerationMode>();

    let mut candidates = BTreeSet::new();
    for pattern in patterns {
        let mode_value = match &parsed_mode {
            Ok(mode_value) => *mode_value,
            Err(e) => {
                warn!(mode = %mode, pattern = %pattern, "unknown generation mode, skipping pattern");
                result.errors.push(e.clone());
                continue;
            }
        };

        let projected = match estimate_pattern_count(mode_value, pattern) {
            Ok(count) => count.saturating_mul(suffixes.len()),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "skipping pattern");
                result.errors.push(e);
                continue;
            }
        };
        if result.estimated_count.saturating_add(projected) > MAX_CANDIDATES {
            let e = ScanError::invalid_pattern(
                pattern.as_str(),
                format!(
                    "would generate {} candidates, the limit is {}",
                    projected, MAX_CANDIDATES
                ),
            );
            warn!(pattern = %pattern, error = %e, "skipping pattern");
            result.errors.push(e);
            continue;
        }

        let bodies = match expand_pattern(mode_value, pattern) {
            Ok(bodies) => bodies,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "skipping pattern");
                result.errors.push(e);
                continue;
            }
        };

        result.estimated_count = result
            .estimated_count
            .saturating_add(bodies.len().saturating_mul(suffixes.len()));
        debug!(pattern = %pattern, mode = %mode_value, bodies = bodies.len(), "expanded pattern");

        for body in &bodies {
            for suffix in &suffixes {
                candidates.insert(format!("{}{}", body, suffix).to_lowercase());
            }
        }
    }

    result.candidates = candidates.into_iter().collect();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ── Fixed mode ──────────────────────────────────────────────────

    #[test]
    fn test_fixed_letter_digit() {
        let bodies = expand_fixed("AB").unwrap();
        assert_eq!(bodies.len(), 260);
        assert_eq!(bodies[0], "a0");
        assert_eq!(bodies[259], "z9");
    }

    #[test]
    fn test_fixed_double_digit() {
        let bodies = expand_fixed("BB").unwrap();
        assert_eq!(bodies.len(), 100);
        assert!(bodies.contains(&"00".to_string()));
        assert!(bodies.contains(&"42".to_string()));
        assert!(bodies.contains(&"99".to_string()));
    }

    #[test]
    fn test_fixed_combined_alphabet() {
        let bodies = expand_fixed("C").unwrap();
        assert_eq!(bodies.len(), 36);
        assert!(bodies.contains(&"a".to_string()));
        assert!(bodies.contains(&"9".to_string()));
    }

    #[test]
    fn test_fixed_product_of_positions() {
        assert_eq!(expand_fixed("ABC").unwrap().len(), 26 * 10 * 36);
        assert_eq!(expand_fixed("AABB").unwrap().len(), 26 * 26 * 10 * 10);
    }

    #[test]
    fn test_fixed_unsupported_symbol() {
        let result = expand_fixed("AXB");
        if let Err(ScanError::InvalidPattern { reason, .. }) = result {
            assert!(reason.contains("'X'"));
        } else {
            panic!("Expected InvalidPattern error");
        }
    }

    #[test]
    fn test_fixed_symbols_are_uppercase_only() {
        assert!(expand_fixed("ab").is_err());
    }

    #[test]
    fn test_fixed_empty_pattern() {
        assert!(expand_fixed("").is_err());
        assert!(expand_fixed("   ").is_err());
    }

    // ── Style mode ──────────────────────────────────────────────────

    #[test]
    fn test_style_two_distinct_letters() {
        let bodies = expand_style("AABB").unwrap();
        assert_eq!(bodies.len(), 1296);
        for body in &bodies {
            let chars: Vec<char> = body.chars().collect();
            assert_eq!(chars[0], chars[1], "{}", body);
            assert_eq!(chars[2], chars[3], "{}", body);
        }
    }

    #[test]
    fn test_style_is_case_insensitive() {
        let upper = expand_style("ABA").unwrap();
        let lower = expand_style("aba").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.len(), 1296);
        assert!(upper.iter().all(|b| b.as_bytes()[0] == b.as_bytes()[2]));
    }

    #[test]
    fn test_style_single_letter_repeated() {
        let bodies = expand_style("XXX").unwrap();
        assert_eq!(bodies.len(), 36);
        assert!(bodies.contains(&"aaa".to_string()));
        assert!(bodies.contains(&"777".to_string()));
    }

    #[test]
    fn test_style_distinct_letters_may_coincide() {
        // Distinct letters are assigned independently, so "aa" is a valid AB result
        let bodies = expand_style("AB").unwrap();
        assert_eq!(bodies.len(), 1296);
        assert!(bodies.contains(&"aa".to_string()));
        assert!(bodies.contains(&"a9".to_string()));
    }

    #[test]
    fn test_style_invalid_character() {
        assert!(expand_style("AB1").is_err());
        assert!(expand_style("A-B").is_err());
    }

    #[test]
    fn test_style_empty() {
        assert!(expand_style("").is_err());
    }

    // ── Literal mode ────────────────────────────────────────────────

    #[test]
    fn test_literal_lowercases() {
        assert_eq!(expand_literal("MyBrand").unwrap(), vec!["mybrand".to_string()]);
    }

    #[test]
    fn test_literal_empty() {
        assert!(expand_literal("  ").is_err());
    }

    // ── Estimates ───────────────────────────────────────────────────

    #[test]
    fn test_estimates() {
        assert_eq!(estimate_pattern_count(GenerationMode::Fixed, "AB").unwrap(), 260);
        assert_eq!(estimate_pattern_count(GenerationMode::Style, "AABB").unwrap(), 1296);
        assert_eq!(estimate_pattern_count(GenerationMode::Literal, "hello").unwrap(), 1);
        assert!(estimate_pattern_count(GenerationMode::Fixed, "AZ").is_err());
    }

    #[test]
    fn test_estimate_saturates() {
        let huge = "C".repeat(64);
        assert_eq!(
            estimate_pattern_count(GenerationMode::Fixed, &huge).unwrap(),
            usize::MAX
        );
    }

    // ── Pipeline ────────────────────────────────────────────────────

    #[test]
    fn test_pipeline_sorted_and_suffixed() {
        let result = generate_candidates("fixed", &strings(&["BB"]), &strings(&[".com"]));
        assert_eq!(result.candidates.len(), 100);
        assert_eq!(result.candidates.first().unwrap(), "00.com");
        assert_eq!(result.candidates.last().unwrap(), "99.com");
        assert!(result.errors.is_empty());
        assert_eq!(result.estimated_count, 100);
    }

    #[test]
    fn test_pipeline_multiple_suffixes() {
        let result = generate_candidates(
            "fixed",
            &strings(&["B"]),
            &strings(&[".com", "net", ".ORG"]),
        );
        assert_eq!(result.candidates.len(), 30);
        assert!(result.candidates.contains(&"0.com".to_string()));
        assert!(result.candidates.contains(&"5.net".to_string()));
        assert!(result.candidates.contains(&"9.org".to_string()));
    }

    #[test]
    fn test_pipeline_deduplicates_across_patterns() {
        // "AB" and "CB" overlap on every letter+digit body
        let result = generate_candidates("fixed", &strings(&["AB", "CB"]), &strings(&[".com"]));
        assert_eq!(result.candidates.len(), 360);
        assert!(result.candidates.len() < result.estimated_count);
        assert_eq!(result.estimated_count, 260 + 360);
    }

    #[test]
    fn test_pipeline_deduplicates_repeated_suffix() {
        let result = generate_candidates("literal", &strings(&["Hello"]), &strings(&[".com", "COM"]));
        assert_eq!(result.candidates, vec!["hello.com".to_string()]);
    }

    #[test]
    fn test_pipeline_bad_pattern_does_not_abort_others() {
        let result = generate_candidates("fixed", &strings(&["AQ", "B"]), &strings(&[".io"]));
        assert_eq!(result.candidates.len(), 10);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], ScanError::InvalidPattern { .. }));
    }

    #[test]
    fn test_pipeline_skips_pattern_over_candidate_limit() {
        let result = generate_candidates(
            "fixed",
            &strings(&["CCCCCCCC", "B"]),
            &strings(&[".com"]),
        );
        assert_eq!(result.candidates.len(), 10);
        assert_eq!(result.estimated_count, 10);
        assert_eq!(result.errors.len(), 1);
        match &result.errors[0] {
            ScanError::InvalidPattern { pattern, reason } => {
                assert_eq!(pattern, "CCCCCCCC");
                assert!(reason.contains("limit"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let result = generate_candidates("style", &strings(&["ABCDEFGHIJ"]), &strings(&[".com"]));
        assert!(result.candidates.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_pipeline_unknown_mode_skips_everything() {
        let result = generate_candidates("old", &strings(&["AB", "BB"]), &strings(&[".com"]));
        assert!(result.candidates.is_empty());
        assert_eq!(result.errors.len(), 2);
        assert!(result
            .errors
            .iter()
            .all(|e| matches!(e, ScanError::UnknownMode { .. })));
    }

    #[test]
    fn test_pipeline_all_patterns_fail() {
        let result = generate_candidates("style", &strings(&["12", ""]), &strings(&[".com"]));
        assert!(result.candidates.is_empty());
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_pipeline_style_repeats_hold_after_suffix() {
        let result = generate_candidates("style", &strings(&["AABB"]), &strings(&[".com"]));
        assert_eq!(result.candidates.len(), 1296);
        assert!(result.candidates.contains(&"xx77.com".to_string()));
        assert!(!result.candidates.contains(&"xy77.com".to_string()));
    }

    #[test]
    fn test_pipeline_no_suffixes() {
        let result = generate_candidates("literal", &strings(&["abc"]), &strings(&["  "]));
        assert!(result.candidates.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_odometer_visits_every_combination() {
        let mut seen = Vec::new();
        odometer(&[2, 3], |c| seen.push((c[0], c[1])));
        assert_eq!(seen, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);

        let mut count = 0;
        odometer(&[], |_| count += 1);
        odometer(&[3, 0], |_| count += 1);
        assert_eq!(count, 0);
    }
}
