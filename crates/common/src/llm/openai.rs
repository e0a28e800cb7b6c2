//! OpenAI-compatible chat-completions client with SSE streaming

use super::{GenerationRequest, LanguageModel, TokenSink};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Chat-completions client
pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of one SSE line
#[derive(Debug, PartialEq)]
enum SseLine {
    Token(String),
    Done,
    Skip,
}

impl OpenAiCompatibleModel {
    /// Create a client for `model` using the endpoint settings in `config`
    pub fn new(config: &LlmConfig, model: &str) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    fn build_messages<'a>(request: &'a GenerationRequest) -> Vec<ChatMessage<'a>> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: &request.system,
        }];

        if let Some(context) = &request.context {
            messages.push(ChatMessage {
                role: "system",
                content: context,
            });
        }

        for turn in &request.history {
            messages.push(ChatMessage {
                role: turn.role.as_str(),
                content: &turn.content,
            });
        }

        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        messages
    }

    fn parse_sse_line(line: &str) -> Result<SseLine> {
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(SseLine::Skip);
        };
        let data = data.trim();
        if data == "[DONE]" {
            return Ok(SseLine::Done);
        }
        if data.is_empty() {
            return Ok(SseLine::Skip);
        }

        let chunk: StreamChunk = serde_json::from_str(data)?;
        Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|t| !t.is_empty())
            .map(SseLine::Token)
            .unwrap_or(SseLine::Skip))
    }

    /// Text produced when no API key is configured
    fn offline_response(request: &GenerationRequest) -> String {
        format!(
            "The language model is not configured, so no answer was generated for \"{}\". \
            [Offline response - API key not configured]",
            request.prompt.trim()
        )
    }

    async fn stream_completion(&self, api_key: &str, request: &GenerationRequest, on_token: &TokenSink<'_>) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::build_messages(request),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.unwrap_or(self.temperature),
            stream: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::GenerationTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::Generation {
                        message: format!("LLM API request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut text = String::new();

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::Generation {
                message: format!("LLM stream interrupted: {}", e),
            })?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match Self::parse_sse_line(&line)? {
                    SseLine::Token(token) => {
                        on_token(&token);
                        text.push_str(&token);
                    }
                    SseLine::Done => break 'outer,
                    SseLine::Skip => {}
                }
            }
        }

        if text.is_empty() {
            return Err(AppError::Generation {
                message: "Empty response from LLM".to_string(),
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn generate(&self, request: &GenerationRequest, on_token: &TokenSink<'_>) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            let text = Self::offline_response(request);
            on_token(&text);
            return Ok(text);
        };

        let start = Instant::now();
        let outcome = self.stream_completion(api_key, request, on_token).await;
        metrics::record_generation(start.elapsed().as_secs_f64(), &self.model, outcome.is_ok());

        outcome
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatTurn;
    use std::sync::Mutex;

    #[test]
    fn test_parse_sse_lines() {
        let token = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(
            OpenAiCompatibleModel::parse_sse_line(token).unwrap(),
            SseLine::Token("Hello".to_string())
        );
        assert_eq!(OpenAiCompatibleModel::parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(OpenAiCompatibleModel::parse_sse_line(": keep-alive").unwrap(), SseLine::Skip);
        assert_eq!(
            OpenAiCompatibleModel::parse_sse_line(r#"data: {"choices":[{"delta":{}}]}"#).unwrap(),
            SseLine::Skip
        );
        assert!(OpenAiCompatibleModel::parse_sse_line("data: {broken").is_err());
    }

    #[test]
    fn test_message_order() {
        let request = GenerationRequest::new("be brief", "what is rust?")
            .with_context("[1] The Rust Book")
            .with_history(vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")]);

        let messages = OpenAiCompatibleModel::build_messages(&request);
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();

        assert_eq!(roles, vec!["system", "system", "user", "assistant", "user"]);
        assert_eq!(messages.last().unwrap().content, "what is rust?");
    }

    #[tokio::test]
    async fn test_offline_notice_carries_no_citations() {
        let model = OpenAiCompatibleModel::new(&LlmConfig::default(), "gpt-4o-mini").unwrap();
        let seen = Mutex::new(Vec::new());
        let sink = |t: &str| seen.lock().unwrap().push(t.to_string());

        let request = GenerationRequest::new("sys", "rust").with_context("[1] Source");
        let text = model.generate(&request, &sink).await.unwrap();

        assert!(text.contains("API key not configured"));
        assert!(!text.contains("[1]"));
        assert_eq!(seen.lock().unwrap().concat(), text);
    }
}
