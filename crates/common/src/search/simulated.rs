//! Placeholder search backend for development without a search endpoint.
//!
//! Every response is flagged `is_mock_search`, and the results use placeholder
//! domains so the retrieval filter removes them before they reach a prompt.

use super::{SearchProvider, SearchResponse, SearchResult};
use crate::errors::Result;
use async_trait::async_trait;

const ENGINE: &str = "simulated";
const MAX_RESULTS: usize = 3;

#[derive(Debug, Default, Clone)]
pub struct SimulatedSearchProvider;

impl SimulatedSearchProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchProvider for SimulatedSearchProvider {
    async fn search(&self, query: &str, count: usize) -> Result<SearchResponse> {
        let topic = query.trim().to_lowercase();
        let slug = topic.split_whitespace().collect::<Vec<_>>().join("-");

        let templates = [
            ("Understanding {}", "A beginner friendly explanation of {}."),
            ("{} - Overview", "Key facts and background about {}."),
            ("Latest news about {}", "Recent developments related to {}."),
        ];

        let results = templates
            .iter()
            .take(count.min(MAX_RESULTS))
            .enumerate()
            .map(|(i, (title, snippet))| {
                SearchResult::new(
                    format!("simulated-{}", i + 1),
                    title.replace("{}", &topic),
                    format!("https://example.com/{}/{}", slug, i + 1),
                    snippet.replace("{}", &topic),
                )
            })
            .collect();

        Ok(SearchResponse {
            results,
            query: query.to_string(),
            search_time_ms: Some(0),
            engine: ENGINE.to_string(),
            is_mock_search: true,
        })
    }

    fn name(&self) -> &str {
        ENGINE
    }
}
