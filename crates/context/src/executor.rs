//! Multi-hop Executor - runs planned searches one after another
//!
//! Provides:
//! - Single-search path with a shortened retry
//! - Sequential task execution with soft dependencies
//! - Query bounding and keyword simplification on empty hits
//! - Per-task progress reporting

use crate::analyzer::QueryAnalysis;
use crate::planner::{Task, TaskPlanner};
use crate::scheduler::execution_order;
use scout_common::config::PipelineConfig;
use scout_common::errors::Result;
use scout_common::metrics;
use scout_common::search::{SearchProvider, SearchResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a multi-hop run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiHopResult {
    /// Most recent results, capped by `pipeline.final_results_limit`
    pub final_results: Vec<SearchResult>,

    /// Every hop's results in execution order
    pub all_results: Vec<SearchResult>,

    /// Tasks as actually run, with rewritten queries
    pub execution_plan: Vec<Task>,

    /// Analysis the run was based on
    pub analysis: QueryAnalysis,

    /// Whether any provider response was flagged as simulated
    pub has_mock_search: bool,

    /// One record per executed task
    pub hops: Vec<HopRecord>,
}

/// Bookkeeping for one executed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopRecord {
    pub task_id: String,
    pub query: String,
    pub result_count: usize,
    pub retried: bool,
    pub failed: bool,
    pub is_mock_search: bool,
}

/// Progress notification, delivered once per task before the next one starts
#[derive(Debug, Clone, Copy)]
pub struct StepProgress<'a> {
    /// Zero-based position in execution order
    pub step_index: usize,
    pub total_steps: usize,
    pub task: &'a Task,
    pub results: &'a [SearchResult],
}

/// Receiver for [`StepProgress`] notifications
pub type ProgressCallback<'a> = dyn FnMut(StepProgress<'_>) + Send + 'a;

/// One provider call, failures folded into an empty set
struct Attempt {
    results: Vec<SearchResult>,
    is_mock: bool,
    failed: bool,
}

/// Executor for multi-hop search
pub struct MultiHopExecutor {
    search: Arc<dyn SearchProvider>,
    planner: TaskPlanner,
    config: PipelineConfig,
}

impl MultiHopExecutor {
    /// Create an executor over a search provider
    pub fn new(search: Arc<dyn SearchProvider>, config: &PipelineConfig) -> Self {
        Self {
            search,
            planner: TaskPlanner::new(config.max_steps),
            config: config.clone(),
        }
    }

    /// Name of the underlying search engine
    pub fn engine(&self) -> &str {
        self.search.name()
    }

    /// Execute the search strategy chosen by `analysis`
    pub async fn execute_multi_hop_search(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<MultiHopResult> {
        let (execution_plan, all_results, hops) = if analysis.needs_multi_step {
            self.run_plan(query, analysis, on_progress).await?
        } else {
            self.run_single(query, on_progress).await
        };

        let has_mock_search = hops.iter().any(|h| h.is_mock_search);
        let keep_from = all_results.len().saturating_sub(self.config.final_results_limit);
        let final_results = all_results[keep_from..].to_vec();

        info!(
            tasks = execution_plan.len(),
            total_results = all_results.len(),
            final_results = final_results.len(),
            has_mock_search,
            "Multi-hop search complete"
        );

        Ok(MultiHopResult {
            final_results,
            all_results,
            execution_plan,
            analysis: analysis.clone(),
            has_mock_search,
            hops,
        })
    }

    async fn run_single(
        &self,
        query: &str,
        on_progress: &mut ProgressCallback<'_>,
    ) -> (Vec<Task>, Vec<SearchResult>, Vec<HopRecord>) {
        let query = query.trim();
        let mut task = Task::new(0, query, query);
        let mut attempt = self.attempt(query).await;
        let mut retried = false;

        if attempt.results.is_empty() {
            let shortened = query.split([':', '?']).next().unwrap_or_default().trim();
            if !shortened.is_empty() && shortened != query {
                debug!(original = query, retry = shortened, "Empty search, retrying shortened query");
                let retry = self.attempt(shortened).await;
                retried = true;
                let any_mock = attempt.is_mock || retry.is_mock;
                if !retry.results.is_empty() {
                    task.search_query = shortened.to_string();
                    attempt = retry;
                }
                attempt.is_mock = any_mock;
            }
        }

        let hop = self.hop_record(&task, &attempt, retried);
        on_progress(StepProgress {
            step_index: 0,
            total_steps: 1,
            task: &task,
            results: &attempt.results,
        });

        (vec![task], attempt.results, vec![hop])
    }

    async fn run_plan(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<(Vec<Task>, Vec<SearchResult>, Vec<HopRecord>)> {
        let tasks = self.planner.plan_tasks(query, &analysis.suggested_steps)?;
        Ok(self.run_tasks(&tasks, on_progress).await)
    }

    /// Run `tasks` one hop at a time in the configured execution order
    async fn run_tasks(
        &self,
        tasks: &[Task],
        on_progress: &mut ProgressCallback<'_>,
    ) -> (Vec<Task>, Vec<SearchResult>, Vec<HopRecord>) {
        let order = execution_order(tasks, self.config.execution_mode);
        let total_steps = order.len();

        let mut recorded: HashMap<String, usize> = HashMap::new();
        let mut all_results = Vec::new();
        let mut plan = Vec::with_capacity(total_steps);
        let mut hops = Vec::with_capacity(total_steps);

        for (step_index, &index) in order.iter().enumerate() {
            let mut task = tasks[index].clone();

            let unmet: Vec<&str> = task
                .depends_on
                .iter()
                .filter(|id| recorded.get(id.as_str()).map_or(true, |&count| count == 0))
                .map(String::as_str)
                .collect();
            if !unmet.is_empty() {
                warn!(task_id = %task.id, unmet = ?unmet, "Running task with unmet dependencies");
            }

            task.search_query = bound_query(
                &task.search_query,
                self.config.max_query_chars,
                self.config.min_truncation_offset,
            );

            let mut attempt = self.attempt(&task.search_query).await;
            let mut retried = false;

            if attempt.results.is_empty()
                && task.search_query.chars().count() > self.config.retry_min_query_chars
            {
                let simplified = simplify_keywords(&task.search_query, self.config.simplified_query_words);
                if !simplified.is_empty() && simplified != task.search_query {
                    debug!(task_id = %task.id, retry = %simplified, "Empty hop, retrying with keywords");
                    let retry = self.attempt(&simplified).await;
                    retried = true;
                    let any_mock = attempt.is_mock || retry.is_mock;
                    if !retry.results.is_empty() {
                        task.search_query = simplified;
                        attempt = retry;
                    }
                    attempt.is_mock = any_mock;
                }
            }

            info!(
                task_id = %task.id,
                step = step_index + 1,
                total_steps,
                results = attempt.results.len(),
                "Hop complete"
            );

            recorded.insert(task.id.clone(), attempt.results.len());
            hops.push(self.hop_record(&task, &attempt, retried));
            on_progress(StepProgress {
                step_index,
                total_steps,
                task: &task,
                results: &attempt.results,
            });

            all_results.extend(attempt.results);
            plan.push(task);
        }

        (plan, all_results, hops)
    }

    async fn attempt(&self, query: &str) -> Attempt {
        match self.search.search(query, self.config.results_per_search).await {
            Ok(response) => Attempt {
                results: response.results,
                is_mock: response.is_mock_search,
                failed: false,
            },
            Err(e) => {
                warn!(error = %e, query, engine = self.search.name(), "Search failed, treating as empty");
                Attempt {
                    results: Vec::new(),
                    is_mock: false,
                    failed: true,
                }
            }
        }
    }

    fn hop_record(&self, task: &Task, attempt: &Attempt, retried: bool) -> HopRecord {
        let outcome = match (attempt.failed, attempt.results.is_empty(), retried) {
            (true, true, _) => "failed",
            (_, true, _) => "empty",
            (_, false, true) => "retried",
            _ => "ok",
        };
        metrics::record_hop(outcome);

        HopRecord {
            task_id: task.id.clone(),
            query: task.search_query.clone(),
            result_count: attempt.results.len(),
            retried,
            failed: attempt.failed && attempt.results.is_empty(),
            is_mock_search: attempt.is_mock,
        }
    }
}

/// Limit a query to `max_chars`, preferring a word boundary past `min_offset`
pub fn bound_query(query: &str, max_chars: usize, min_offset: usize) -> String {
    let query = query.trim();
    if query.chars().count() <= max_chars {
        return query.to_string();
    }

    let head: String = query.chars().take(max_chars).collect();
    match head.rfind(char::is_whitespace) {
        Some(pos) if head[..pos].chars().count() > min_offset => head[..pos].trim_end().to_string(),
        _ => head,
    }
}

/// First `count` words longer than two characters, punctuation trimmed
pub fn simplify_keywords(query: &str, count: usize) -> String {
    query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2)
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}
