//! Heuristic quality and relevance scores

use super::{domain_in, QueryBasis};
use scout_common::config::QualityConfig;
use scout_common::search::SearchResult;

/// Credibility, URL, snippet and title signals summed into one score
pub fn quality_score(result: &SearchResult, basis: &QueryBasis, config: &QualityConfig) -> i32 {
    let signals = &config.signals;
    let domain = result.domain.as_str();
    let mut score = 0;

    score += if config
        .institutional_suffixes
        .iter()
        .any(|suffix| !suffix.is_empty() && domain.ends_with(suffix.as_str()))
    {
        signals.institutional_domain
    } else if domain_in(domain, &config.trusted_domains) {
        signals.trusted_domain
    } else if domain_in(domain, &config.blacklisted_domains) {
        signals.blacklisted_domain
    } else {
        signals.other_domain
    };

    score += if is_placeholder_url(result, basis, config) {
        signals.placeholder_url
    } else {
        signals.valid_url
    };

    let snippet_chars = result.snippet.trim().chars().count();
    score += if snippet_chars < config.min_snippet_chars {
        signals.short_snippet
    } else {
        let points = snippet_chars / config.snippet_chars_per_point.max(1);
        (points as i32).min(config.max_snippet_points)
    };

    let title = result.title.trim().to_lowercase();
    if !basis.keywords.is_empty() {
        let matched = basis.keywords.iter().filter(|w| title.contains(w.as_str())).count();
        if matched * 2 >= basis.keywords.len() {
            score += signals.title_match;
        }
    }
    if !basis.is_long && title == basis.query {
        score += signals.exact_title;
    }

    score
}

/// Keyword hits in title and snippet, plus a bonus for trusted domains
pub fn relevance_score(result: &SearchResult, basis: &QueryBasis, config: &QualityConfig) -> i32 {
    let signals = &config.signals;
    let title = result.title.to_lowercase();
    let snippet = result.snippet.to_lowercase();

    let mut score: i32 = basis
        .keywords
        .iter()
        .map(|word| {
            let mut hits = 0;
            if title.contains(word.as_str()) {
                hits += signals.title_keyword;
            }
            if snippet.contains(word.as_str()) {
                hits += signals.snippet_keyword;
            }
            hits
        })
        .sum();

    if domain_in(&result.domain, &config.trusted_domains) {
        score += signals.trusted_relevance;
    }

    score
}

/// Unparseable URLs, and placeholder hosts whose path is just the query slug
fn is_placeholder_url(result: &SearchResult, basis: &QueryBasis, config: &QualityConfig) -> bool {
    if result.domain.is_empty() {
        return true;
    }
    domain_in(&result.domain, &config.placeholder_domains)
        && !basis.hyphen_slug.is_empty()
        && result.url.to_lowercase().contains(&basis.hyphen_slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result;

    fn scores(title: &str, url: &str, snippet: &str, query: &str) -> (i32, i32) {
        let config = QualityConfig::default();
        let basis = QueryBasis::new(query, &config);
        let r = result(1, title, url, snippet);
        (quality_score(&r, &basis, &config), relevance_score(&r, &basis, &config))
    }

    #[test]
    fn test_domain_credibility() {
        let snippet = "x".repeat(60);
        let (edu, _) = scores("Other", "https://cs.stanford.edu/p", &snippet, "zzz");
        let (trusted, _) = scores("Other", "https://github.com/p", &snippet, "zzz");
        let (plain, _) = scores("Other", "https://blog.site.io/p", &snippet, "zzz");

        // domain + valid url (+2) + snippet (+1)
        assert_eq!(edu, 5 + 2 + 1);
        assert_eq!(trusted, 3 + 2 + 1);
        assert_eq!(plain, 1 + 2 + 1);
    }

    #[test]
    fn test_snippet_points() {
        let (short, _) = scores("Other", "https://blog.site.io/p", "tiny", "zzz");
        let (long, _) = scores("Other", "https://blog.site.io/p", &"y".repeat(400), "zzz");
        assert_eq!(short, 1 + 2 - 2);
        assert_eq!(long, 1 + 2 + 3);
    }

    #[test]
    fn test_title_relevance() {
        let snippet = "y".repeat(60);
        let (half, _) = scores("Tokio internals", "https://blog.site.io/p", &snippet, "tokio scheduler");
        let (none, _) = scores("Unrelated", "https://blog.site.io/p", &snippet, "tokio scheduler");
        let (exact, _) = scores("Tokio Scheduler", "https://blog.site.io/p", &snippet, "tokio scheduler");

        assert_eq!(half, none + 2);
        assert_eq!(exact, none + 2 - 1);
    }

    #[test]
    fn test_long_query_exact_title_not_penalised() {
        let query = "how does the tokio runtime schedule asynchronous tasks across worker threads when every local queue is full";
        assert!(query.len() > 100 && query.len() <= 150);

        let (score, _) = scores(query, "https://blog.site.io/p", &"y".repeat(60), query);
        // domain +1, url +2, snippet +1, title match +2, no exact-title penalty
        assert_eq!(score, 6);
    }

    #[test]
    fn test_verbose_query_uses_word_prefix() {
        let query = "alpha bravo charlie delta echo foxtrot golf hotel india juliet \
            kilo lima mike november oscar papa quebec romeo sierra tango uniform victor whiskey xray yankee";
        assert!(query.len() > 150);

        let basis = QueryBasis::new(query, &QualityConfig::default());
        assert_eq!(basis.basis, "alpha bravo charlie delta echo foxtrot golf hotel india juliet");
        assert_eq!(basis.keywords.len(), 10);

        let (_, inside) = scores("Alpha bravo", "https://blog.site.io/p", "", query);
        let (_, outside) = scores("Kilo lima", "https://blog.site.io/p", "", query);
        assert_eq!(inside, 4);
        assert_eq!(outside, 0);
    }

    #[test]
    fn test_unparseable_url_penalised() {
        let (score, _) = scores("Other", "not a url", &"y".repeat(60), "zzz");
        assert_eq!(score, 1 - 3 + 1);
    }

    #[test]
    fn test_relevance_score() {
        let (_, relevance) = scores(
            "Tokio scheduler deep dive",
            "https://github.com/tokio-rs/tokio",
            "How the tokio runtime schedules tasks",
            "tokio scheduler",
        );
        // tokio: title +2, snippet +1; scheduler: title +2; trusted +2
        assert_eq!(relevance, 7);
    }
}
