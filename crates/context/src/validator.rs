//! Response Quality Validator - checks generated answers against their sources
//!
//! Provides:
//! - `[n]` citation extraction
//! - Coverage and validity percentages
//! - Penalty-based scoring with one issue per penalty

use regex_lite::Regex;
use scout_common::search::SearchResult;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MISSING_CITATIONS_PENALTY: i32 = 40;
const INVALID_CITATION_PENALTY: i32 = 20;
const LOW_COVERAGE_PENALTY: i32 = 15;
const PARTIAL_VALIDITY_PENALTY: i32 = 10;
const SHORT_RESPONSE_PENALTY: i32 = 10;
const LONG_UNCITED_PENALTY: i32 = 20;

const MIN_COVERAGE: u8 = 50;
const SHORT_RESPONSE_CHARS: usize = 100;
const LONG_RESPONSE_CHARS: usize = 1000;
const MIN_VALID_SCORE: u8 = 70;

/// Validation outcome for one generated answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckResult {
    pub is_valid: bool,
    /// 0..=100
    pub score: u8,
    pub issues: Vec<String>,
    /// Percentage of sources cited at least once
    pub citation_coverage: u8,
    /// Percentage of cited numbers that name a real source
    pub citation_validity: u8,
}

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("citation pattern is valid"))
}

/// Distinct citation numbers in ascending order. Numbers too large to
/// represent are kept as `usize::MAX` so they still count as invalid.
pub fn extract_citations(text: &str) -> Vec<usize> {
    let mut numbers: Vec<usize> = citation_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().parse().unwrap_or(usize::MAX))
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round().min(100.0) as u8
}

/// Score `response_text` by how well its `[n]` markers line up with `sources`
pub fn check_response_quality(response_text: &str, sources: &[SearchResult]) -> QualityCheckResult {
    let citations = extract_citations(response_text);
    let (valid, invalid): (Vec<usize>, Vec<usize>) = citations
        .iter()
        .copied()
        .partition(|&n| n >= 1 && n <= sources.len());

    let citation_coverage = percent(valid.len(), sources.len());
    let citation_validity = percent(valid.len(), citations.len());
    let length = response_text.chars().count();
    let has_sources = !sources.is_empty();

    let mut score: i32 = 100;
    let mut issues = Vec::new();

    if has_sources && citations.is_empty() {
        score -= MISSING_CITATIONS_PENALTY;
        issues.push(format!(
            "No citations found, although {} source(s) are available",
            sources.len()
        ));
    }

    if !invalid.is_empty() {
        score -= INVALID_CITATION_PENALTY;
        let listed: Vec<String> = invalid
            .iter()
            .map(|n| if *n == usize::MAX { "[overflow]".to_string() } else { format!("[{}]", n) })
            .collect();
        issues.push(format!(
            "Invalid citation number(s) {}; only {} source(s) exist",
            listed.join(", "),
            sources.len()
        ));
    }

    if has_sources && citation_coverage < MIN_COVERAGE {
        score -= LOW_COVERAGE_PENALTY;
        issues.push(format!("Low citation coverage: {}% of sources cited", citation_coverage));
    }

    if !citations.is_empty() && citation_validity < 100 {
        score -= PARTIAL_VALIDITY_PENALTY;
        issues.push(format!("Only {}% of citations reference a real source", citation_validity));
    }

    if has_sources && length < SHORT_RESPONSE_CHARS {
        score -= SHORT_RESPONSE_PENALTY;
        issues.push(format!("Response is very short ({} characters)", length));
    }

    if has_sources && citations.is_empty() && length > LONG_RESPONSE_CHARS {
        score -= LONG_UNCITED_PENALTY;
        issues.push(format!("Long response ({} characters) without any citations", length));
    }

    let score = score.clamp(0, 100) as u8;

    QualityCheckResult {
        is_valid: issues.is_empty() && score >= MIN_VALID_SCORE,
        score,
        issues,
        citation_coverage,
        citation_validity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result;

    fn sources(n: usize) -> Vec<SearchResult> {
        (1..=n)
            .map(|i| result(i, &format!("Source {}", i), &format!("https://docs.rs/s{}", i), "text"))
            .collect()
    }

    #[test]
    fn test_extract_citations() {
        assert_eq!(extract_citations("a [3] b [1][3] c [x] [2"), vec![1, 3]);
        assert_eq!(extract_citations("[99999999999999999999999]"), vec![usize::MAX]);
        assert!(extract_citations("none").is_empty());
    }

    #[test]
    fn test_empty_response_without_sources() {
        let check = check_response_quality("", &[]);
        assert_eq!(check.score, 100);
        assert!(check.is_valid);
        assert_eq!(check.citation_coverage, 0);
        assert_eq!(check.citation_validity, 0);
    }

    #[test]
    fn test_single_valid_citation() {
        let check = check_response_quality("See [1].", &sources(1));
        assert_eq!(check.citation_validity, 100);
        assert_eq!(check.citation_coverage, 100);
        // only the short-response penalty applies
        assert_eq!(check.score, 90);
        assert_eq!(check.issues.len(), 1);
    }

    #[test]
    fn test_out_of_range_citation() {
        let check = check_response_quality("See [5].", &sources(2));
        assert!(!check.is_valid);
        assert!(check.score <= 80);
        assert_eq!(check.score, 45);
        assert!(check.issues.iter().any(|i| i.contains("[5]")));
        assert_eq!(check.issues.len(), 4);
    }

    #[test]
    fn test_uncited_long_response() {
        let text = "word ".repeat(250);
        let check = check_response_quality(&text, &sources(3));
        // missing citations, low coverage, long and uncited
        assert_eq!(check.score, 100 - 40 - 15 - 20);
        assert_eq!(check.issues.len(), 3);
        assert!(!check.is_valid);
    }

    #[test]
    fn test_well_cited_response_is_valid() {
        let text = format!(
            "{} Rust guarantees memory safety [1]. Tokio schedules tasks cooperatively [2]. Both matter [1][3].",
            "Background. ".repeat(5)
        );
        let check = check_response_quality(&text, &sources(3));
        assert_eq!(check.citation_coverage, 100);
        assert_eq!(check.citation_validity, 100);
        assert_eq!(check.score, 100);
        assert!(check.is_valid);
    }

    #[test]
    fn test_coverage_rounding() {
        let check = check_response_quality(&format!("{} [1] [2]", "x".repeat(120)), &sources(3));
        assert_eq!(check.citation_coverage, 67);
        assert_eq!(check.score, 100);
    }
}
