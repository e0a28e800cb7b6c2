//! Query Complexity Analyzer - decides whether a query needs decomposition
//!
//! Provides:
//! - Classification through the generation service (JSON answer)
//! - Brace-balanced JSON extraction from free-form model output
//! - Deterministic heuristic fallback on any failure

use regex_lite::Regex;
use scout_common::config::PipelineConfig;
use scout_common::errors::{AppError, Result};
use scout_common::llm::{GenerationRequest, LanguageModel};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Complexity tier of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "simple" => Some(Complexity::Simple),
            "moderate" => Some(Complexity::Moderate),
            "complex" => Some(Complexity::Complex),
            _ => None,
        }
    }
}

/// Result of analyzing one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Whether the query should be decomposed into several searches
    pub needs_multi_step: bool,

    /// Complexity tier
    pub complexity: Complexity,

    /// Ordered sub-steps; empty unless `needs_multi_step`
    pub suggested_steps: Vec<String>,

    /// Short explanation of the decision
    pub reasoning: String,
}

impl QueryAnalysis {
    /// Analysis for a query answered by a single search
    pub fn simple(reasoning: impl Into<String>) -> Self {
        Self {
            needs_multi_step: false,
            complexity: Complexity::Simple,
            suggested_steps: Vec::new(),
            reasoning: reasoning.into(),
        }
    }
}

/// Which path produced an analysis
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Decoded from the generation service's answer
    Parsed(QueryAnalysis),
    /// Produced by the heuristic classifier
    Fallback(QueryAnalysis),
}

impl AnalysisOutcome {
    pub fn analysis(&self) -> &QueryAnalysis {
        match self {
            AnalysisOutcome::Parsed(a) | AnalysisOutcome::Fallback(a) => a,
        }
    }

    pub fn into_analysis(self) -> QueryAnalysis {
        match self {
            AnalysisOutcome::Parsed(a) | AnalysisOutcome::Fallback(a) => a,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AnalysisOutcome::Fallback(_))
    }
}

/// Wire shape expected from the model. Field names follow the prompt.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(alias = "needs_multi_step")]
    needs_multi_step: bool,
    complexity: String,
    #[serde(default, alias = "suggested_steps")]
    suggested_steps: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

const SYSTEM_PROMPT: &str = "You classify web research questions. Decide whether answering \
the question needs several separate searches (comparisons, multiple topics, multi-step \
processes) or a single search. Reply with one JSON object and nothing else.";

/// Analyzer for query complexity
pub struct QueryAnalyzer {
    model: Option<Arc<dyn LanguageModel>>,
    timeout: Duration,
    max_steps: usize,
}

impl QueryAnalyzer {
    /// Create an analyzer backed by a generation service
    pub fn new(model: Arc<dyn LanguageModel>, config: &PipelineConfig) -> Self {
        Self {
            model: Some(model),
            timeout: config.analyzer_timeout(),
            max_steps: config.max_steps,
        }
    }

    /// Create an analyzer that only uses the heuristic classifier
    pub fn heuristic_only(config: &PipelineConfig) -> Self {
        Self {
            model: None,
            timeout: config.analyzer_timeout(),
            max_steps: config.max_steps,
        }
    }

    /// Replace the generation service used for classification
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Analyze a query. Never fails: every error path ends in the heuristic fallback.
    pub async fn analyze(&self, query: &str) -> AnalysisOutcome {
        let Some(model) = &self.model else {
            return AnalysisOutcome::Fallback(heuristic_analysis(query));
        };

        let request = GenerationRequest::new(SYSTEM_PROMPT, build_prompt(query)).with_temperature(0.0);

        let text = match tokio::time::timeout(self.timeout, model.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "Query analysis call failed, using heuristic");
                return AnalysisOutcome::Fallback(heuristic_analysis(query));
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Query analysis timed out, using heuristic");
                return AnalysisOutcome::Fallback(heuristic_analysis(query));
            }
        };

        match parse_analysis(&text) {
            Ok(analysis) => {
                let analysis = self.normalize(analysis);
                debug!(
                    complexity = analysis.complexity.as_str(),
                    steps = analysis.suggested_steps.len(),
                    "Query analyzed"
                );
                AnalysisOutcome::Parsed(analysis)
            }
            Err(e) => {
                warn!(error = %e, "Unusable query analysis, using heuristic");
                AnalysisOutcome::Fallback(heuristic_analysis(query))
            }
        }
    }

    fn normalize(&self, mut analysis: QueryAnalysis) -> QueryAnalysis {
        if analysis.needs_multi_step {
            analysis.suggested_steps = analysis
                .suggested_steps
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(self.max_steps)
                .collect();
        } else {
            analysis.suggested_steps.clear();
        }
        analysis
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        "Question: {}\n\n\
        Respond with JSON of the form:\n\
        {{\"needsMultiStep\": true|false, \"complexity\": \"simple\"|\"moderate\"|\"complex\", \
        \"suggestedSteps\": [\"focused search step\", ...], \"reasoning\": \"one sentence\"}}\n\
        Leave suggestedSteps empty when needsMultiStep is false.",
        query.trim()
    )
}

/// Locate the first balanced `{...}` span, ignoring braces inside string literals
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strictly decode the first JSON object found in model output
pub fn parse_analysis(text: &str) -> Result<QueryAnalysis> {
    let span = extract_json_object(text).ok_or_else(|| AppError::InvalidFormat {
        message: "no JSON object in analysis response".to_string(),
    })?;

    let raw: RawAnalysis = serde_json::from_str(span)?;
    let complexity = Complexity::parse(&raw.complexity).ok_or_else(|| AppError::InvalidFormat {
        message: format!("unknown complexity '{}'", raw.complexity),
    })?;

    Ok(QueryAnalysis {
        needs_multi_step: raw.needs_multi_step,
        complexity,
        suggested_steps: raw.suggested_steps,
        reasoning: raw.reasoning,
    })
}

fn comparison_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(and|or|compare|versus|vs|difference between)\b")
            .expect("comparison pattern is valid")
    })
}

fn sequential_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(first|then|after|before|step|process)\b")
            .expect("sequential pattern is valid")
    })
}

/// Classify a query from marker words alone
pub fn heuristic_analysis(query: &str) -> QueryAnalysis {
    let comparison = comparison_pattern().is_match(query);
    let sequential = sequential_pattern().is_match(query);

    if comparison || sequential {
        let reasoning = match (comparison, sequential) {
            (true, true) => "Heuristic: comparison and sequential markers found",
            (true, false) => "Heuristic: comparison or multi-topic markers found",
            _ => "Heuristic: sequential markers found",
        };
        QueryAnalysis {
            needs_multi_step: true,
            complexity: Complexity::Moderate,
            suggested_steps: Vec::new(),
            reasoning: reasoning.to_string(),
        }
    } else {
        QueryAnalysis::simple("Heuristic: no decomposition markers found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    fn analyzer(model: ScriptedModel) -> QueryAnalyzer {
        QueryAnalyzer::new(Arc::new(model), &PipelineConfig::default())
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let text = "Sure! Here you go:\n{\"a\": {\"b\": \"}\"}, \"c\": 1} trailing {\"x\": 2}";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": \"}\"}, \"c\": 1}"));
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("{\"open\": true"), None);
    }

    #[test]
    fn test_parse_analysis_strict() {
        let ok = parse_analysis(
            r#"```json
            {"needsMultiStep": true, "complexity": "Complex",
             "suggestedSteps": ["rust ownership", "c++ raii"], "reasoning": "two topics"}
            ```"#,
        )
        .unwrap();
        assert!(ok.needs_multi_step);
        assert_eq!(ok.complexity, Complexity::Complex);
        assert_eq!(ok.suggested_steps.len(), 2);

        assert!(parse_analysis(r#"{"needsMultiStep": "yes", "complexity": "simple"}"#).is_err());
        assert!(parse_analysis(r#"{"needsMultiStep": false, "complexity": "trivial"}"#).is_err());
    }

    #[test]
    fn test_heuristic_markers() {
        assert!(heuristic_analysis("Compare React vs Vue").needs_multi_step);
        assert!(heuristic_analysis("How to install Rust, then set up cargo").needs_multi_step);
        assert!(heuristic_analysis("difference between TCP and UDP").needs_multi_step);

        let simple = heuristic_analysis("Who wrote Dune");
        assert!(!simple.needs_multi_step);
        assert_eq!(simple.complexity, Complexity::Simple);
        assert!(simple.suggested_steps.is_empty());

        // Whole words only: "android" contains "and", "orange" contains "or"
        assert!(!heuristic_analysis("android orange").needs_multi_step);
    }

    #[tokio::test]
    async fn test_fallback_when_service_fails() {
        let outcome = analyzer(ScriptedModel::failing()).analyze("Compare React vs Vue").await;

        assert!(outcome.is_fallback());
        let analysis = outcome.analysis();
        assert!(analysis.needs_multi_step);
        assert_eq!(analysis.complexity, Complexity::Moderate);
    }

    #[tokio::test]
    async fn test_fallback_on_malformed_json() {
        let outcome = analyzer(ScriptedModel::replying("I think it's complex!"))
            .analyze("weather in Paris")
            .await;

        assert!(outcome.is_fallback());
        assert!(!outcome.analysis().needs_multi_step);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_on_timeout() {
        let model = ScriptedModel::replying(r#"{"needsMultiStep": false, "complexity": "simple"}"#)
            .with_delay(Duration::from_secs(60));
        let outcome = analyzer(model).analyze("first boil water then add pasta").await;

        assert!(outcome.is_fallback());
        assert!(outcome.analysis().needs_multi_step);
    }

    #[tokio::test]
    async fn test_parsed_outcome_is_normalized() {
        let reply = r#"Analysis: {"needsMultiStep": true, "complexity": "moderate",
            "suggestedSteps": ["a", " ", "b", "c", "d", "e", "f", "g"], "reasoning": "many"}"#;
        let outcome = analyzer(ScriptedModel::replying(reply)).analyze("big question").await;

        match outcome {
            AnalysisOutcome::Parsed(analysis) => {
                assert_eq!(analysis.suggested_steps, vec!["a", "b", "c", "d", "e"]);
            }
            AnalysisOutcome::Fallback(_) => panic!("expected parsed analysis"),
        }

        let reply = r#"{"needsMultiStep": false, "complexity": "simple", "suggestedSteps": ["x"]}"#;
        let outcome = analyzer(ScriptedModel::replying(reply)).analyze("q").await;
        assert!(!outcome.is_fallback());
        assert!(outcome.analysis().suggested_steps.is_empty());
    }

    #[test]
    fn test_heuristic_only_analyzer() {
        let analyzer = QueryAnalyzer::heuristic_only(&PipelineConfig::default());
        let outcome = tokio_test::block_on(analyzer.analyze("Rust vs Go"));
        assert!(outcome.is_fallback());
        assert!(outcome.analysis().needs_multi_step);
    }
}
