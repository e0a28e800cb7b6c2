//! Retrieval Quality Filter - drops synthetic hits and re-ranks the rest
//!
//! Provides:
//! - Mock / placeholder result detection
//! - Heuristic quality and keyword relevance scoring
//! - Weighted ranking with a result cap
//! - Evidence sentence extraction

mod detection;
mod evidence;
mod scoring;

pub use detection::is_mock_result;
pub use evidence::extract_evidence;
pub use scoring::{quality_score, relevance_score};

use crate::text::{significant_words, slug};
use scout_common::config::QualityConfig;
use scout_common::metrics;
use scout_common::search::SearchResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Counters describing one filtering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Results received, before de-duplication
    pub candidates: usize,
    /// Results recognised as synthetic
    pub mock_flagged: usize,
    /// Results dropped for a negative quality score
    pub low_quality_dropped: usize,
    /// Results returned
    pub kept: usize,
}

/// Query text prepared once per filtering pass
#[derive(Debug, Clone)]
pub struct QueryBasis {
    /// Whole query, lowercased and trimmed
    pub query: String,
    /// Comparison basis; a word prefix for very long queries
    pub basis: String,
    /// Words of the basis longer than two characters
    pub keywords: Vec<String>,
    /// Words of the basis longer than three characters
    pub evidence_keywords: Vec<String>,
    /// Exact-title checks are skipped for long queries
    pub is_long: bool,
    pub hyphen_slug: String,
    pub underscore_slug: String,
}

impl QueryBasis {
    pub fn new(query: &str, config: &QualityConfig) -> Self {
        let query = query.trim().to_lowercase();
        let length = query.chars().count();

        let basis = if length > config.verbose_query_chars {
            query
                .split_whitespace()
                .take(config.verbose_query_prefix_words)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            query.clone()
        };

        Self {
            keywords: significant_words(&basis, 2),
            evidence_keywords: significant_words(&basis, 3),
            is_long: length > config.long_query_chars,
            hyphen_slug: slug(&basis, "-"),
            underscore_slug: slug(&basis, "_"),
            basis,
            query,
        }
    }
}

/// `domain` equals `entry` or is a subdomain of it
pub(crate) fn domain_matches(domain: &str, entry: &str) -> bool {
    let entry = entry.trim().to_lowercase();
    !entry.is_empty()
        && (domain == entry
            || domain
                .strip_suffix(entry.as_str())
                .is_some_and(|prefix| prefix.ends_with('.')))
}

pub(crate) fn domain_in(domain: &str, list: &[String]) -> bool {
    list.iter().any(|entry| domain_matches(domain, entry))
}

struct Scored {
    result: SearchResult,
    relevance: i32,
    combined: f64,
}

/// Filter and re-ranker for search results
#[derive(Debug, Clone)]
pub struct QualityFilter {
    config: QualityConfig,
}

impl QualityFilter {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Weighted combination of the two scores
    pub fn combined_score(&self, quality: i32, relevance: i32) -> f64 {
        self.config.quality_weight * quality as f64 + self.config.relevance_weight * relevance as f64
    }

    /// Rank `results` for `query`, returning at most `quality.max_results`
    pub fn rerank(&self, results: &[SearchResult], query: &str) -> Vec<SearchResult> {
        self.rerank_with_report(results, query).0
    }

    /// Same as [`rerank`](Self::rerank), also reporting what was dropped
    pub fn rerank_with_report(&self, results: &[SearchResult], query: &str) -> (Vec<SearchResult>, FilterReport) {
        let basis = QueryBasis::new(query, &self.config);
        let mut report = FilterReport {
            candidates: results.len(),
            ..FilterReport::default()
        };

        let mut seen_urls = HashSet::new();
        let mut scored = Vec::with_capacity(results.len());

        for result in results {
            if !seen_urls.insert(result.url.trim()) {
                continue;
            }

            if is_mock_result(result, &basis, &self.config) {
                debug!(url = %result.url, "Dropping synthetic result");
                report.mock_flagged += 1;
                continue;
            }

            let quality = quality_score(result, &basis, &self.config);
            if quality < 0 {
                report.low_quality_dropped += 1;
                continue;
            }

            let relevance = relevance_score(result, &basis, &self.config);
            scored.push(Scored {
                result: result.clone(),
                relevance,
                combined: self.combined_score(quality, relevance),
            });
        }

        scored.sort_by(|a, b| b.combined.partial_cmp(&a.combined).unwrap_or(Ordering::Equal));
        scored.truncate(self.config.max_results);

        let ranked: Vec<SearchResult> = scored
            .into_iter()
            .map(|s| {
                let mut result = s.result;
                let evidence = extract_evidence(
                    &result.snippet,
                    &basis.evidence_keywords,
                    self.config.evidence_fallback_chars,
                );
                result.evidence = (!evidence.is_empty()).then_some(evidence);
                result.relevance_score = Some(s.relevance as f64);
                result
            })
            .collect();

        report.kept = ranked.len();
        metrics::record_filter(report.mock_flagged, report.kept);
        debug!(
            candidates = report.candidates,
            mock_flagged = report.mock_flagged,
            low_quality = report.low_quality_dropped,
            kept = report.kept,
            "Results re-ranked"
        );

        (ranked, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result;

    fn filter() -> QualityFilter {
        QualityFilter::new(QualityConfig::default())
    }

    #[test]
    fn test_domain_matching() {
        assert!(domain_matches("wikipedia.org", "wikipedia.org"));
        assert!(domain_matches("en.wikipedia.org", "wikipedia.org"));
        assert!(!domain_matches("notwikipedia.org", "wikipedia.org"));
        assert!(!domain_matches("example.com", ""));
    }

    #[test]
    fn test_query_basis_for_verbose_queries() {
        let config = QualityConfig::default();
        let long = "word ".repeat(40);
        let basis = QueryBasis::new(&long, &config);

        assert!(basis.is_long);
        assert_eq!(basis.basis.split_whitespace().count(), 10);

        let short = QueryBasis::new("Rust Ownership", &config);
        assert!(!short.is_long);
        assert_eq!(short.hyphen_slug, "rust-ownership");
        assert_eq!(short.underscore_slug, "rust_ownership");
    }

    #[test]
    fn test_lone_placeholder_result_filtered() {
        let results = vec![result(
            1,
            "Understanding Rust Ownership",
            "https://example.com/rust-ownership/1",
            "Rust ownership is a set of rules that govern how a Rust program manages memory.",
        )];

        let (ranked, report) = filter().rerank_with_report(&results, "rust ownership");
        assert!(ranked.is_empty());
        assert_eq!(report.mock_flagged, 1);
        assert_eq!(report.kept, 0);
    }

    #[test]
    fn test_ranking_order_and_cap() {
        let f = filter();
        let query = "rust async runtime";
        let results: Vec<SearchResult> = (0..12)
            .map(|i| {
                let domain = if i % 3 == 0 { "mit.edu" } else if i % 3 == 1 { "github.com" } else { "blog.site.io" };
                result(
                    i,
                    &format!("Post {} about async runtime", i),
                    &format!("https://{}/posts/{}", domain, i),
                    &"The rust async runtime drives futures to completion. ".repeat(1 + i % 4),
                )
            })
            .collect();

        let ranked = f.rerank(&results, query);
        assert_eq!(ranked.len(), 7);

        let basis = QueryBasis::new(query, f.config());
        let combined: Vec<f64> = ranked
            .iter()
            .map(|r| f.combined_score(quality_score(r, &basis, f.config()), relevance_score(r, &basis, f.config())))
            .collect();
        assert!(combined.windows(2).all(|w| w[0] >= w[1]));
        assert!(ranked.iter().all(|r| r.relevance_score.is_some() && r.evidence.is_some()));
    }

    #[test]
    fn test_never_returns_blacklisted_domains() {
        let results = vec![
            result(1, "Local dev", "http://localhost:3000/rust", "A page served from a development machine somewhere."),
            result(2, "Loopback", "http://127.0.0.1/rust", "Another page served from a development machine here."),
            result(3, "Rust language", "https://www.rust-lang.org/learn", "Rust is a language empowering everyone to build reliable software."),
        ];

        let ranked = filter().rerank(&results, "rust");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].domain, "rust-lang.org");
    }

    #[test]
    fn test_duplicate_urls_collapsed() {
        let first = result(1, "Tokio tutorial: getting started", "https://tokio.rs/tokio/tutorial", "Tokio is an asynchronous runtime for the Rust programming language.");
        let mut second = first.clone();
        second.id = "r2".to_string();

        let (ranked, report) = filter().rerank_with_report(&[first, second], "tokio tutorial");
        assert_eq!(report.candidates, 2);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "r1");
    }

    #[test]
    fn test_stable_for_equal_scores() {
        let snippet = "Identical snippet text that is long enough to be scored normally.";
        let results = vec![
            result(1, "Alpha", "https://blog.one.io/a", snippet),
            result(2, "Alpha", "https://blog.two.io/a", snippet),
        ];

        let ranked = filter().rerank(&results, "unrelated words");
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }
}
