//! Synthetic result detection

use super::{domain_in, QueryBasis};
use scout_common::config::QualityConfig;
use scout_common::search::SearchResult;

/// Whether `result` looks like placeholder or fallback data rather than a real page
pub fn is_mock_result(result: &SearchResult, basis: &QueryBasis, config: &QualityConfig) -> bool {
    let domain = result.domain.as_str();
    if domain_in(domain, &config.blacklisted_domains) {
        return true;
    }

    let title = result.title.trim().to_lowercase();
    let url = result.url.to_lowercase();

    // Encyclopedia article whose title and path are just the query
    if domain_in(domain, &config.reference_domains)
        && title == basis.query
        && !basis.underscore_slug.is_empty()
        && url.contains(&basis.underscore_slug)
    {
        return true;
    }

    if domain_in(domain, &config.placeholder_domains)
        && !basis.hyphen_slug.is_empty()
        && url.contains(&basis.hyphen_slug)
    {
        return true;
    }

    if basis.is_long || basis.query.is_empty() {
        return false;
    }

    title == basis.query
        || config
            .mock_title_templates
            .iter()
            .any(|template| template.to_lowercase().replace("{query}", &basis.query) == title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result;

    fn check(title: &str, url: &str, query: &str) -> bool {
        let config = QualityConfig::default();
        let basis = QueryBasis::new(query, &config);
        is_mock_result(&result(1, title, url, "snippet"), &basis, &config)
    }

    #[test]
    fn test_blacklisted_domains() {
        assert!(check("Anything", "https://example.com/a", "rust"));
        assert!(check("Anything", "https://sub.example.org/a", "rust"));
        assert!(check("Anything", "http://localhost:8080/", "rust"));
        assert!(check("Anything", "https://mock-search.local/x", "rust"));
        assert!(!check("Anything", "https://rust-lang.org/", "rust"));
    }

    #[test]
    fn test_reference_article_echoing_query() {
        assert!(check("rust ownership", "https://en.wikipedia.org/wiki/Rust_Ownership", "Rust Ownership"));
        assert!(!check("Ownership (Rust)", "https://en.wikipedia.org/wiki/Ownership_(Rust)", "Rust Ownership"));
    }

    #[test]
    fn test_placeholder_domain_with_slug() {
        assert!(check("Some page", "https://demo.com/rust-ownership", "rust ownership"));
        assert!(!check("Some page", "https://demo.com/about", "rust ownership"));
    }

    #[test]
    fn test_templated_titles() {
        assert!(check("Rust Ownership - Wikipedia", "https://blog.site.io/a", "rust ownership"));
        assert!(check("Latest news about rust ownership", "https://news.site.io/a", "rust ownership"));
        assert!(check("Rust Ownership", "https://blog.site.io/a", "rust ownership"));
        assert!(!check("Rust Ownership explained", "https://blog.site.io/a", "rust ownership"));
    }

    #[test]
    fn test_exact_title_ignored_for_long_queries() {
        let query = "how does the rust ownership model interact with async tasks that are moved between worker threads at runtime";
        assert!(query.len() > 100);
        assert!(!check(query, "https://blog.site.io/a", query));
    }
}
