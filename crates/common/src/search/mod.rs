//! Search provider abstraction
//!
//! Provides a unified interface over web search backends:
//! - SearXNG-compatible JSON endpoints
//! - A simulated provider used when no backend is configured

mod simulated;
mod web;

pub use simulated::SimulatedSearchProvider;
pub use web::WebSearchProvider;

use crate::config::{SearchConfig, SearchProviderKind};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider-assigned identifier
    pub id: String,

    /// Page title
    pub title: String,

    /// Page URL
    pub url: String,

    /// Text excerpt returned by the provider
    pub snippet: String,

    /// Host name without a leading `www.`
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    /// Most query-relevant sentence, attached by the quality filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,

    /// Keyword relevance, attached by the quality filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl SearchResult {
    /// Build a result, deriving `domain` from the URL
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let domain = domain_of(&url);

        Self {
            id: id.into(),
            title: title.into(),
            url,
            snippet: snippet.into(),
            domain,
            favicon: None,
            published_date: None,
            evidence: None,
            relevance_score: None,
        }
    }

    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }

    pub fn with_favicon(mut self, favicon: impl Into<String>) -> Self {
        self.favicon = Some(favicon.into());
        self
    }
}

/// Response from a search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked results
    pub results: Vec<SearchResult>,

    /// Query as sent to the provider
    pub query: String,

    /// Provider-side processing time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_time_ms: Option<u64>,

    /// Engine name
    pub engine: String,

    /// Whether the provider served fallback or simulated data
    #[serde(default)]
    pub is_mock_search: bool,
}

impl SearchResponse {
    /// An empty response from the named engine
    pub fn empty(query: &str, engine: &str) -> Self {
        Self {
            results: Vec::new(),
            query: query.to_string(),
            search_time_ms: None,
            engine: engine.to_string(),
            is_mock_search: false,
        }
    }
}

/// Trait for web search backends
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, asking for up to `count` results
    async fn search(&self, query: &str, count: usize) -> Result<SearchResponse>;

    /// Engine name used in logs and metrics
    fn name(&self) -> &str;
}

/// Build the configured search provider
pub fn create_search_provider(config: &SearchConfig) -> Result<Arc<dyn SearchProvider>> {
    match config.provider {
        SearchProviderKind::Searxng => Ok(Arc::new(WebSearchProvider::new(config)?)),
        SearchProviderKind::Simulated => {
            tracing::warn!("No search backend configured, serving simulated results");
            Ok(Arc::new(SimulatedSearchProvider::new()))
        }
    }
}

/// Extract the lowercase host of a URL, without a leading `www.`
pub fn domain_of(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_default()
}
