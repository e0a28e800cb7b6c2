//! SearXNG-compatible web search client

use super::{SearchProvider, SearchResponse, SearchResult};
use crate::config::SearchConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

const ENGINE: &str = "searxng";

/// Web search client with retry on transient failures
pub struct WebSearchProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry_budget: Duration,
}

#[derive(Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Deserialize)]
struct SearxResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default, rename = "publishedDate")]
    published_date: Option<String>,
}

impl WebSearchProvider {
    /// Create a new client from configuration
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "search.base_url is required for the searxng provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            retry_budget: Duration::from_secs(config.retry_budget_secs),
        })
    }

    async fn fetch(&self, query: &str) -> std::result::Result<SearxResponse, backoff::Error<AppError>> {
        let url = format!("{}/search", self.base_url);

        let mut request = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")]);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            let err = AppError::SearchProvider {
                message: format!("Request failed: {}", e),
            };
            if e.is_timeout() || e.is_connect() {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::SearchProvider {
                message: format!("API error {}: {}", status, body),
            };
            return if status.is_server_error() || status.as_u16() == 429 {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        response.json::<SearxResponse>().await.map_err(|e| {
            backoff::Error::permanent(AppError::SearchProvider {
                message: format!("Failed to parse response: {}", e),
            })
        })
    }
}

#[async_trait]
impl SearchProvider for WebSearchProvider {
    async fn search(&self, query: &str, count: usize) -> Result<SearchResponse> {
        let start = Instant::now();

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.retry_budget))
            .build();

        let outcome = backoff::future::retry(policy, || async {
            let attempt = self.fetch(query).await;
            if let Err(backoff::Error::Transient { err, .. }) = &attempt {
                tracing::warn!(error = %err, query = %query, "Transient search failure, retrying");
            }
            attempt
        })
        .await;

        let elapsed = start.elapsed();
        metrics::record_search(elapsed.as_secs_f64(), ENGINE, outcome.is_ok());

        let payload = outcome?;
        let results = payload
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(count)
            .map(|r| {
                let mut result = SearchResult::new(Uuid::new_v4().to_string(), r.title, r.url, r.content);
                if !result.domain.is_empty() {
                    let favicon = format!("https://{}/favicon.ico", result.domain);
                    result = result.with_favicon(favicon);
                }
                match r.published_date {
                    Some(date) => result.with_published_date(date),
                    None => result,
                }
            })
            .collect();

        Ok(SearchResponse {
            results,
            query: query.to_string(),
            search_time_ms: Some(elapsed.as_millis() as u64),
            engine: ENGINE.to_string(),
            is_mock_search: false,
        })
    }

    fn name(&self) -> &str {
        ENGINE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_searx_payload() {
        let body = r#"{
            "query": "rust ownership",
            "results": [
                {"url": "https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html",
                 "title": "What is Ownership?",
                 "content": "Ownership is a set of rules that govern memory.",
                 "publishedDate": null},
                {"url": "https://example.org/x", "title": "x"}
            ]
        }"#;

        let parsed: SearxResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].content, "");
        assert!(parsed.results[0].published_date.is_none());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = SearchConfig {
            provider: crate::config::SearchProviderKind::Searxng,
            base_url: Some("http://search.local/".to_string()),
            ..SearchConfig::default()
        };
        let provider = WebSearchProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "http://search.local");
    }
}
