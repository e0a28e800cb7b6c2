//! Research Pipeline - wires the stages together for one query
//!
//! analyze → plan/execute → filter → assemble → generate → validate,
//! reporting progress through an [`EventBus`].

use crate::analyzer::{QueryAnalysis, QueryAnalyzer};
use crate::assembler::ContextAssembler;
use crate::events::{EventBus, PipelineEvent};
use crate::executor::{HopRecord, MultiHopExecutor, StepProgress};
use crate::planner::Task;
use crate::quality::{FilterReport, QualityFilter};
use crate::validator::{check_response_quality, QualityCheckResult};
use scout_common::config::AppConfig;
use scout_common::errors::{AppError, Result};
use scout_common::llm::{ChatTurn, GenerationRequest, LanguageModel, OpenAiCompatibleModel};
use scout_common::metrics;
use scout_common::search::{create_search_provider, SearchProvider, SearchResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// A question plus the conversation so far
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,

    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history: Vec::new(),
        }
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchAnswer {
    pub query: String,
    pub analysis: QueryAnalysis,
    /// Whether the analysis came from the heuristic classifier
    pub analysis_fallback: bool,
    pub answer: String,
    /// Ranked sources, numbered as cited in `answer`
    pub sources: Vec<SearchResult>,
    pub execution_plan: Vec<Task>,
    pub hops: Vec<HopRecord>,
    pub has_mock_search: bool,
    pub filter: FilterReport,
    pub quality: QualityCheckResult,
}

/// The research pipeline. Immutable; share it behind an `Arc`.
pub struct ResearchPipeline {
    analyzer: QueryAnalyzer,
    executor: MultiHopExecutor,
    filter: QualityFilter,
    assembler: ContextAssembler,
    model: Arc<dyn LanguageModel>,
}

impl ResearchPipeline {
    /// Create a pipeline using `model` for both classification and answers
    pub fn new(search: Arc<dyn SearchProvider>, model: Arc<dyn LanguageModel>, config: &AppConfig) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(model.clone(), &config.pipeline),
            executor: MultiHopExecutor::new(search, &config.pipeline),
            filter: QualityFilter::new(config.quality.clone()),
            assembler: ContextAssembler::new(config.pipeline.context_char_budget),
            model,
        }
    }

    /// Use a separate generation service for query classification
    pub fn with_analysis_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.analyzer = self.analyzer.with_model(model);
        self
    }

    /// Build the pipeline and its provider clients from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let search = create_search_provider(&config.search)?;
        let model: Arc<dyn LanguageModel> =
            Arc::new(OpenAiCompatibleModel::new(&config.llm, &config.llm.model)?);

        let mut pipeline = Self::new(search, model, config);
        if config.analysis_model() != config.llm.model {
            let analysis_model = OpenAiCompatibleModel::new(&config.llm, config.analysis_model())?;
            pipeline = pipeline.with_analysis_model(Arc::new(analysis_model));
        }

        Ok(pipeline)
    }

    pub fn search_engine(&self) -> &str {
        self.executor.engine()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Answer `request`, emitting progress on `events`. Any failure is reported
    /// as a single `Error` event before being returned.
    #[instrument(skip_all, fields(query_len = request.query.len()))]
    pub async fn run(&self, request: &ResearchRequest, events: &EventBus) -> Result<ResearchAnswer> {
        match self.execute(request, events).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                if e.is_server_error() {
                    error!(error = %e, code = ?e.code(), "Research run failed");
                } else {
                    warn!(error = %e, code = ?e.code(), "Research request rejected");
                }
                events.emit(PipelineEvent::Error {
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &ResearchRequest, events: &EventBus) -> Result<ResearchAnswer> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(AppError::Validation {
                message: "Query must not be empty".to_string(),
                field: Some("query".to_string()),
            });
        }

        events.emit(PipelineEvent::thinking("Analyzing query complexity"));
        let outcome = self.analyzer.analyze(query).await;
        let analysis_fallback = outcome.is_fallback();
        let analysis = outcome.into_analysis();
        metrics::record_query(analysis.complexity.as_str(), analysis_fallback);

        events.emit(PipelineEvent::thinking(analysis.reasoning.clone()));
        if analysis.needs_multi_step {
            let details = (!analysis.suggested_steps.is_empty()).then(|| analysis.suggested_steps.join("; "));
            events.emit(PipelineEvent::progress("Planning multi-step research", details));
        }

        events.emit(PipelineEvent::ToolCall {
            name: self.executor.engine().to_string(),
            params: serde_json::json!({
                "query": query,
                "mode": if analysis.needs_multi_step { "multi_hop" } else { "single" },
            }),
        });

        let mut report_step = |progress: StepProgress<'_>| {
            events.emit(PipelineEvent::StepResult {
                step_index: progress.step_index,
                task: progress.task.clone(),
                results: progress.results.to_vec(),
            });
            events.emit(PipelineEvent::StepComplete {
                step_index: progress.step_index,
                summary: format!(
                    "Step {}/{}: {} result(s) for \"{}\"",
                    progress.step_index + 1,
                    progress.total_steps,
                    progress.results.len(),
                    progress.task.search_query
                ),
            });
        };
        let search = self
            .executor
            .execute_multi_hop_search(query, &analysis, &mut report_step)
            .await?;

        events.emit(PipelineEvent::progress(
            "Filtering results",
            Some(format!("{} candidate(s)", search.all_results.len())),
        ));
        let (ranked, filter) = self.filter.rerank_with_report(&search.all_results, query);
        let has_mock_search = search.has_mock_search || filter.mock_flagged > 0;

        events.emit(PipelineEvent::SourcesUpdate { results: ranked.clone() });
        events.emit(PipelineEvent::MockDetected { detected: has_mock_search });

        let context = self.assembler.assemble(&ranked);
        let mut sources = ranked;
        sources.truncate(context.sources_included);

        let mut generation = GenerationRequest::new(self.assembler.system_instruction(sources.len()), query)
            .with_history(request.history.clone());
        if !context.text.is_empty() {
            generation = generation.with_context(context.text);
        }

        events.emit(PipelineEvent::progress("Generating answer", None));
        let on_token = |token: &str| {
            events.emit(PipelineEvent::Token {
                text: token.to_string(),
            })
        };
        let answer = self.model.generate(&generation, &on_token).await?;

        let quality = check_response_quality(&answer, &sources);
        metrics::record_quality(quality.score, quality.is_valid);
        events.emit(PipelineEvent::progress(
            "Answer validated",
            Some(format!("score {}/100", quality.score)),
        ));

        info!(
            complexity = analysis.complexity.as_str(),
            tasks = search.execution_plan.len(),
            sources = sources.len(),
            has_mock_search,
            quality_score = quality.score,
            events = events.emitted(),
            "Research run complete"
        );

        Ok(ResearchAnswer {
            query: query.to_string(),
            analysis,
            analysis_fallback,
            answer,
            sources,
            execution_plan: search.execution_plan,
            hops: search.hops,
            has_mock_search,
            filter,
            quality,
        })
    }
}
