//! Task Planner - turns a complex query into focused search tasks
//!
//! Provides:
//! - Step-seeded plans from analyzer suggestions
//! - Comparison and sequence decomposition of raw query text
//! - Soft dependency links between tasks

use regex_lite::Regex;
use scout_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// One focused search within a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within a plan; never rewritten
    pub id: String,

    /// Human-readable intent of the task
    pub description: String,

    /// Query sent to the search provider; the executor may shorten it
    pub search_query: String,

    /// Ids of tasks this one builds on
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl Task {
    pub(crate) fn new(index: usize, description: impl Into<String>, search_query: impl Into<String>) -> Self {
        Self {
            id: task_id(index),
            description: description.into(),
            search_query: search_query.into(),
            depends_on: Vec::new(),
        }
    }

    pub(crate) fn depending_on(mut self, ids: Vec<String>) -> Self {
        self.depends_on = ids;
        self
    }
}

fn task_id(index: usize) -> String {
    format!("task_{}", index + 1)
}

/// Planner for multi-step research
#[derive(Debug, Clone)]
pub struct TaskPlanner {
    max_tasks: usize,
}

impl TaskPlanner {
    /// Create a planner producing at most `max_tasks` step or sequence tasks
    pub fn new(max_tasks: usize) -> Self {
        Self { max_tasks: max_tasks.max(1) }
    }

    /// Build an ordered task list for `query`, seeded by `suggested_steps` when present
    pub fn plan_tasks(&self, query: &str, suggested_steps: &[String]) -> Result<Vec<Task>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Planning {
                message: "query is empty".to_string(),
            });
        }

        let mut tasks = self.plan_from_steps(suggested_steps);
        if tasks.is_empty() {
            tasks = self.decompose(query);
        }

        if tasks.is_empty() {
            return Err(AppError::Planning {
                message: format!("no searchable task could be derived from '{}'", query),
            });
        }

        validate_plan(&tasks)?;
        Ok(tasks)
    }

    fn plan_from_steps(&self, steps: &[String]) -> Vec<Task> {
        let mut tasks: Vec<Task> = Vec::new();

        for step in steps.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if tasks.len() == self.max_tasks {
                break;
            }
            let search_query = focus_query(step);
            if search_query.is_empty() {
                continue;
            }

            let depends_on = match tasks.last() {
                None => Vec::new(),
                Some(_) if synthesis_pattern().is_match(step) => {
                    tasks.iter().map(|t| t.id.clone()).collect()
                }
                Some(previous) => vec![previous.id.clone()],
            };

            let task = Task::new(tasks.len(), step, search_query).depending_on(depends_on);
            tasks.push(task);
        }

        tasks
    }

    fn decompose(&self, query: &str) -> Vec<Task> {
        if let Some((left, right)) = split_comparison(query) {
            return comparison_plan(&left, &right);
        }

        let parts = split_sequence(query);
        if parts.len() > 1 {
            return parts
                .into_iter()
                .map(|part| {
                    let search_query = focus_query(&part);
                    (part, search_query)
                })
                .filter(|(_, search_query)| !search_query.is_empty())
                .take(self.max_tasks)
                .enumerate()
                .map(|(i, (part, search_query))| {
                    let depends_on = if i == 0 { Vec::new() } else { vec![task_id(i - 1)] };
                    Task::new(i, part, search_query).depending_on(depends_on)
                })
                .collect();
        }

        let search_query = focus_query(query);
        if search_query.is_empty() {
            return Vec::new();
        }
        vec![Task::new(0, query, search_query)]
    }
}

fn comparison_plan(left: &str, right: &str) -> Vec<Task> {
    let first = Task::new(0, format!("Research {}", left), left);
    let second = Task::new(1, format!("Research {}", right), right);
    let compare = Task::new(
        2,
        format!("Compare {} and {}", left, right),
        format!("{} vs {} comparison", left, right),
    )
    .depending_on(vec![first.id.clone(), second.id.clone()]);

    vec![first, second, compare]
}

fn validate_plan(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(AppError::Planning {
                message: format!("duplicate task id '{}'", task.id),
            });
        }
    }
    Ok(())
}

fn leading_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:step\s*\d+\s*[:.)\-]?\s*|\d+\s*[.):\-]\s*|[-*]\s+|(?:first|second|third|then|finally|lastly),?\s+)",
        )
        .expect("leading marker pattern is valid")
    })
}

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:search (?:the web )?for|find (?:information|info|details|data) (?:about|on)|find out(?: about)?|look up|look for|research|investigate|find)\s+",
        )
        .expect("directive pattern is valid")
    })
}

fn synthesis_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(compare|contrast|summari[sz]e|combine|synthesi[sz]e)\b")
            .expect("synthesis pattern is valid")
    })
}

fn comparison_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^(?:what(?:'s| is| are)?\s+)?(?:the\s+)?differences?\s+between\s+(.+?)\s+and\s+(.+)$",
            r"(?i)^compare\s+(.+?)\s+(?:and|with|to|vs\.?|versus)\s+(.+)$",
            r"(?i)^(.+?)\s+(?:vs\.?|versus)\s+(.+)$",
        ]
        .map(|p| Regex::new(p).expect("comparison pattern is valid"))
    })
}

fn sequence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\s*(?:;|,?\s+then\s+|,?\s+after that,?\s+|,?\s+finally,?\s+)\s*")
            .expect("sequence pattern is valid")
    })
}

fn trim_subject(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '?' | '.' | '!' | ',' | ';' | ':'))
        .trim()
}

/// Split "X vs Y", "compare X and Y" and "difference between X and Y" into subjects
fn split_comparison(query: &str) -> Option<(String, String)> {
    let query = trim_subject(query);

    comparison_patterns().iter().find_map(|pattern| {
        let caps = pattern.captures(query)?;
        let left = trim_subject(caps.get(1)?.as_str());
        let right = trim_subject(caps.get(2)?.as_str());
        (!left.is_empty() && !right.is_empty()).then(|| (left.to_string(), right.to_string()))
    })
}

/// Split "first X then Y" style and `;`-separated queries into ordered parts
fn split_sequence(query: &str) -> Vec<String> {
    sequence_pattern()
        .split(query)
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Rephrase a step as a search query: numbering, directives and trailing punctuation removed
pub fn focus_query(step: &str) -> String {
    let without_marker = leading_marker_pattern().replace(step.trim(), "");
    let without_directive = directive_pattern().replace(without_marker.trim(), "");
    trim_subject(&without_directive).to_string()
}
