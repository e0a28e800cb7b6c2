//! Scripted in-memory providers for unit tests

use async_trait::async_trait;
use scout_common::errors::{AppError, Result};
use scout_common::llm::{GenerationRequest, LanguageModel, TokenSink};
use scout_common::search::{SearchProvider, SearchResponse, SearchResult};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub fn result(n: usize, title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult::new(format!("r{}", n), title, url, snippet)
}

/// Search provider that replays queued responses and records every query.
/// Once the queue is drained it answers with empty result sets.
pub struct ScriptedSearchProvider {
    responses: Mutex<VecDeque<Result<SearchResponse>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearchProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn then_results(self, results: Vec<SearchResult>) -> Self {
        self.push(Ok(SearchResponse {
            results,
            ..SearchResponse::empty("", "scripted")
        }))
    }

    pub fn then_mock_results(self, results: Vec<SearchResult>) -> Self {
        self.push(Ok(SearchResponse {
            results,
            is_mock_search: true,
            ..SearchResponse::empty("", "scripted")
        }))
    }

    pub fn then_empty(self) -> Self {
        self.then_results(Vec::new())
    }

    pub fn then_error(self) -> Self {
        self.push(Err(AppError::SearchProvider {
            message: "scripted outage".to_string(),
        }))
    }

    fn push(self, response: Result<SearchResponse>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearchProvider {
    async fn search(&self, query: &str, _count: usize) -> Result<SearchResponse> {
        self.queries.lock().unwrap().push(query.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(SearchResponse::empty(query, "scripted")))
            .map(|mut response| {
                response.query = query.to_string();
                response
            })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Generation service returning a fixed reply, streamed word by word
pub struct ScriptedModel {
    reply: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &GenerationRequest, on_token: &TokenSink<'_>) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.reply.clone().ok_or_else(|| AppError::Generation {
            message: "scripted failure".to_string(),
        })?;

        for token in reply.split_inclusive(' ') {
            on_token(token);
        }
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}
