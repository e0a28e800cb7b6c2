//! Configuration management for Scout services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values
//!
//! Every heuristic table used by the retrieval filter (domain lists, title templates,
//! thresholds, score weights) lives here so it can be tuned without a rebuild.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Search provider configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Language-generation service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Multi-hop pipeline thresholds
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Retrieval quality filter tables and weights
    #[serde(default)]
    pub quality: QualityConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Longest query accepted by the API
    #[serde(default = "default_max_request_query_chars")]
    pub max_query_chars: u64,
}

/// Which search backend to talk to
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchProviderKind {
    /// SearXNG-compatible JSON endpoint
    Searxng,
    /// Built-in placeholder results, flagged as mock search
    Simulated,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Provider backend
    #[serde(default = "default_search_provider")]
    pub provider: SearchProviderKind,

    /// Base URL of the search endpoint
    pub base_url: Option<String>,

    /// Optional bearer token for the endpoint
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Total time budget for retrying transient failures, in seconds
    #[serde(default = "default_search_retry_budget")]
    pub retry_budget_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (empty means offline mode)
    pub api_key: Option<String>,

    /// Model used for answer generation
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Model used for query analysis (defaults to `model`)
    pub analysis_model: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

/// Task ordering strategy for the multi-hop engine
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Run tasks in planner order; unmet dependencies only produce a warning
    #[default]
    ListOrder,
    /// Run tasks in a dependency-respecting topological order
    DependencyOrder,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Task ordering strategy
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Maximum number of planned tasks
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Results requested from the provider per search call
    #[serde(default = "default_results_per_search")]
    pub results_per_search: usize,

    /// Search queries are bounded to this many characters
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,

    /// A word-boundary cut is only used when it lies past this offset
    #[serde(default = "default_min_truncation_offset")]
    pub min_truncation_offset: usize,

    /// Empty hops are retried only for queries longer than this
    #[serde(default = "default_retry_min_query_chars")]
    pub retry_min_query_chars: usize,

    /// Number of words kept in a simplified retry query
    #[serde(default = "default_simplified_query_words")]
    pub simplified_query_words: usize,

    /// Size of `final_results`
    #[serde(default = "default_final_results_limit")]
    pub final_results_limit: usize,

    /// Time allowed for the analyzer's generation call before falling back
    #[serde(default = "default_analyzer_timeout")]
    pub analyzer_timeout_secs: u64,

    /// Character budget for the assembled source context
    #[serde(default = "default_context_char_budget")]
    pub context_char_budget: usize,
}

/// Additive score contributions used by the quality filter
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalWeights {
    #[serde(default = "default_institutional_domain")]
    pub institutional_domain: i32,
    #[serde(default = "default_trusted_domain")]
    pub trusted_domain: i32,
    #[serde(default = "default_blacklisted_domain")]
    pub blacklisted_domain: i32,
    #[serde(default = "default_other_domain")]
    pub other_domain: i32,
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: i32,
    #[serde(default = "default_valid_url")]
    pub valid_url: i32,
    #[serde(default = "default_short_snippet")]
    pub short_snippet: i32,
    #[serde(default = "default_title_match")]
    pub title_match: i32,
    #[serde(default = "default_exact_title")]
    pub exact_title: i32,
    #[serde(default = "default_title_keyword")]
    pub title_keyword: i32,
    #[serde(default = "default_snippet_keyword")]
    pub snippet_keyword: i32,
    #[serde(default = "default_trusted_relevance")]
    pub trusted_relevance: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualityConfig {
    /// Results kept after re-ranking
    #[serde(default = "default_max_ranked_results")]
    pub max_results: usize,

    /// Weight of the quality score in the combined score
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f64,

    /// Weight of the relevance score in the combined score
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,

    /// Placeholder and loopback domains; results from these are always dropped
    #[serde(default = "default_blacklisted_domains")]
    pub blacklisted_domains: Vec<String>,

    /// Domains whose query-slug URLs indicate generated results
    #[serde(default = "default_placeholder_domains")]
    pub placeholder_domains: Vec<String>,

    /// Reference-encyclopedia domains checked for underscore-joined placeholder URLs
    #[serde(default = "default_reference_domains")]
    pub reference_domains: Vec<String>,

    /// Curated trusted domains
    #[serde(default = "default_trusted_domains")]
    pub trusted_domains: Vec<String>,

    /// Institutional top-level suffixes
    #[serde(default = "default_institutional_suffixes")]
    pub institutional_suffixes: Vec<String>,

    /// Templated titles produced by fallback providers; `{query}` is substituted
    #[serde(default = "default_mock_title_templates")]
    pub mock_title_templates: Vec<String>,

    /// Queries longer than this skip exact-title checks
    #[serde(default = "default_long_query_chars")]
    pub long_query_chars: usize,

    /// Queries longer than this are compared through a word prefix
    #[serde(default = "default_verbose_query_chars")]
    pub verbose_query_chars: usize,

    /// Length of that word prefix
    #[serde(default = "default_verbose_query_prefix_words")]
    pub verbose_query_prefix_words: usize,

    /// Snippets shorter than this are penalised
    #[serde(default = "default_min_snippet_chars")]
    pub min_snippet_chars: usize,

    /// Snippet characters per quality point
    #[serde(default = "default_snippet_chars_per_point")]
    pub snippet_chars_per_point: usize,

    /// Cap on snippet quality points
    #[serde(default = "default_max_snippet_points")]
    pub max_snippet_points: i32,

    /// Length of the evidence fallback excerpt
    #[serde(default = "default_evidence_fallback_chars")]
    pub evidence_fallback_chars: usize,

    /// Score contributions
    #[serde(default)]
    pub signals: SignalWeights,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_request_query_chars() -> u64 { 2000 }
fn default_search_provider() -> SearchProviderKind { SearchProviderKind::Simulated }
fn default_search_timeout() -> u64 { 15 }
fn default_search_retry_budget() -> u64 { 10 }
fn default_llm_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_llm_timeout() -> u64 { 120 }
fn default_temperature() -> f32 { 0.3 }
fn default_max_tokens() -> usize { 1500 }
fn default_max_steps() -> usize { 5 }
fn default_results_per_search() -> usize { 10 }
fn default_max_query_chars() -> usize { 100 }
fn default_min_truncation_offset() -> usize { 50 }
fn default_retry_min_query_chars() -> usize { 20 }
fn default_simplified_query_words() -> usize { 4 }
fn default_final_results_limit() -> usize { 10 }
fn default_analyzer_timeout() -> u64 { 15 }
fn default_context_char_budget() -> usize { 12_000 }
fn default_institutional_domain() -> i32 { 5 }
fn default_trusted_domain() -> i32 { 3 }
fn default_blacklisted_domain() -> i32 { -5 }
fn default_other_domain() -> i32 { 1 }
fn default_placeholder_url() -> i32 { -3 }
fn default_valid_url() -> i32 { 2 }
fn default_short_snippet() -> i32 { -2 }
fn default_title_match() -> i32 { 2 }
fn default_exact_title() -> i32 { -1 }
fn default_title_keyword() -> i32 { 2 }
fn default_snippet_keyword() -> i32 { 1 }
fn default_trusted_relevance() -> i32 { 2 }
fn default_max_ranked_results() -> usize { 7 }
fn default_quality_weight() -> f64 { 0.6 }
fn default_relevance_weight() -> f64 { 0.4 }
fn default_long_query_chars() -> usize { 100 }
fn default_verbose_query_chars() -> usize { 150 }
fn default_verbose_query_prefix_words() -> usize { 10 }
fn default_min_snippet_chars() -> usize { 30 }
fn default_snippet_chars_per_point() -> usize { 50 }
fn default_max_snippet_points() -> i32 { 3 }
fn default_evidence_fallback_chars() -> usize { 200 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "scout".to_string() }

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_blacklisted_domains() -> Vec<String> {
    strings(&[
        "example.com",
        "example.org",
        "example.net",
        "localhost",
        "127.0.0.1",
        "0.0.0.0",
        "test.com",
        "placeholder.com",
        "mock-search.local",
    ])
}

fn default_placeholder_domains() -> Vec<String> {
    strings(&["example.com", "example.org", "sample.com", "demo.com", "test.com"])
}

fn default_reference_domains() -> Vec<String> {
    strings(&["wikipedia.org"])
}

fn default_trusted_domains() -> Vec<String> {
    strings(&[
        "wikipedia.org",
        "britannica.com",
        "github.com",
        "stackoverflow.com",
        "arxiv.org",
        "nature.com",
        "science.org",
        "acm.org",
        "ieee.org",
        "developer.mozilla.org",
        "rust-lang.org",
        "docs.rs",
        "python.org",
        "reuters.com",
        "apnews.com",
        "bbc.com",
        "nytimes.com",
        "who.int",
    ])
}

fn default_institutional_suffixes() -> Vec<String> {
    strings(&[".edu", ".gov"])
}

fn default_mock_title_templates() -> Vec<String> {
    strings(&[
        "{query} - wikipedia",
        "understanding {query}",
        "introduction to {query}",
        "{query}: a complete guide",
        "{query} - overview",
        "latest news about {query}",
    ])
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_query_chars: default_max_request_query_chars(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            base_url: None,
            api_key: None,
            timeout_secs: default_search_timeout(),
            retry_budget_secs: default_search_retry_budget(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            analysis_model: None,
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            max_steps: default_max_steps(),
            results_per_search: default_results_per_search(),
            max_query_chars: default_max_query_chars(),
            min_truncation_offset: default_min_truncation_offset(),
            retry_min_query_chars: default_retry_min_query_chars(),
            simplified_query_words: default_simplified_query_words(),
            final_results_limit: default_final_results_limit(),
            analyzer_timeout_secs: default_analyzer_timeout(),
            context_char_budget: default_context_char_budget(),
        }
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            institutional_domain: default_institutional_domain(),
            trusted_domain: default_trusted_domain(),
            blacklisted_domain: default_blacklisted_domain(),
            other_domain: default_other_domain(),
            placeholder_url: default_placeholder_url(),
            valid_url: default_valid_url(),
            short_snippet: default_short_snippet(),
            title_match: default_title_match(),
            exact_title: default_exact_title(),
            title_keyword: default_title_keyword(),
            snippet_keyword: default_snippet_keyword(),
            trusted_relevance: default_trusted_relevance(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_ranked_results(),
            quality_weight: default_quality_weight(),
            relevance_weight: default_relevance_weight(),
            blacklisted_domains: default_blacklisted_domains(),
            placeholder_domains: default_placeholder_domains(),
            reference_domains: default_reference_domains(),
            trusted_domains: default_trusted_domains(),
            institutional_suffixes: default_institutional_suffixes(),
            mock_title_templates: default_mock_title_templates(),
            long_query_chars: default_long_query_chars(),
            verbose_query_chars: default_verbose_query_chars(),
            verbose_query_prefix_words: default_verbose_query_prefix_words(),
            min_snippet_chars: default_min_snippet_chars(),
            snippet_chars_per_point: default_snippet_chars_per_point(),
            max_snippet_points: default_max_snippet_points(),
            evidence_fallback_chars: default_evidence_fallback_chars(),
            signals: SignalWeights::default(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__LLM__MODEL=gpt-4o
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a single config file (extension optional), then environment overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Model used by the query analyzer
    pub fn analysis_model(&self) -> &str {
        self.llm.analysis_model.as_deref().unwrap_or(&self.llm.model)
    }
}

impl PipelineConfig {
    /// Get the analyzer timeout as Duration
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pipeline.max_query_chars, 100);
        assert_eq!(config.quality.max_results, 7);
        assert_eq!(config.pipeline.execution_mode, ExecutionMode::ListOrder);
        assert!(config.quality.blacklisted_domains.contains(&"example.com".to_string()));
    }

    #[test]
    fn test_analysis_model_fallback() {
        let mut config = AppConfig::default();
        assert_eq!(config.analysis_model(), "gpt-4o-mini");

        config.llm.analysis_model = Some("gpt-4o".to_string());
        assert_eq!(config.analysis_model(), "gpt-4o");
    }

    #[test]
    fn test_shipped_default_file_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default");
        let config = AppConfig::from_file(path).unwrap();

        assert_eq!(config.search.provider, SearchProviderKind::Simulated);
        assert_eq!(config.pipeline.execution_mode, ExecutionMode::ListOrder);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml = r#"
            [pipeline]
            execution_mode = "dependency_order"
            max_steps = 3

            [quality.signals]
            trusted_domain = 4
        "#;

        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.pipeline.execution_mode, ExecutionMode::DependencyOrder);
        assert_eq!(config.pipeline.max_steps, 3);
        assert_eq!(config.pipeline.results_per_search, 10);
        assert_eq!(config.quality.signals.trusted_domain, 4);
        assert_eq!(config.quality.signals.institutional_domain, 5);
        assert_eq!(config.search.provider, SearchProviderKind::Simulated);
    }
}
