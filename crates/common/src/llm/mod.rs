//! Language-generation service abstraction
//!
//! The pipeline talks to generation backends only through [`LanguageModel`]:
//! one streaming call per request, tokens pushed to a caller-supplied sink,
//! full text returned on completion.

mod openai;

pub use openai::OpenAiCompatibleModel;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a prior conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Input to a generation call
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// System instruction
    pub system: String,

    /// Prior turns, oldest first
    pub history: Vec<ChatTurn>,

    /// Aggregated retrieval context
    pub context: Option<String>,

    /// The current user message
    pub prompt: String,

    /// Overrides the client's default temperature
    pub temperature: Option<f32>,

    /// Overrides the client's default output budget
    pub max_tokens: Option<usize>,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Receives generated text incrementally
pub type TokenSink<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Trait for generation backends
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Stream a completion, pushing each token to `on_token`; returns the full text
    async fn generate(&self, request: &GenerationRequest, on_token: &TokenSink<'_>) -> Result<String>;

    /// Non-streaming completion
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.generate(request, &|_: &str| {}).await
    }

    /// Get the model name
    fn model_name(&self) -> &str;
}
