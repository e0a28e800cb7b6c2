//! Context Assembler - renders ranked sources for the generation step
//!
//! Provides:
//! - Numbered source blocks aligned with `[n]` citations
//! - Character budget management
//! - Citation-aware system instruction

use crate::text::truncate_chars;
use scout_common::search::SearchResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest remainder worth filling with a trimmed block
const MIN_PARTIAL_BLOCK_CHARS: usize = 200;

/// Rendered context handed to the generation service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Numbered source blocks
    pub text: String,

    /// How many leading sources made it into `text`
    pub sources_included: usize,

    /// Character count of `text`
    pub char_count: usize,
}

/// Assembler for retrieval context
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    char_budget: usize,
}

impl ContextAssembler {
    pub fn new(char_budget: usize) -> Self {
        Self { char_budget }
    }

    /// Render `sources` in order until the budget is spent
    pub fn assemble(&self, sources: &[SearchResult]) -> AssembledContext {
        let mut text = String::new();
        let mut used = 0usize;
        let mut included = 0usize;

        for (i, source) in sources.iter().enumerate() {
            let block = Self::render_block(i + 1, source);
            let separator = if text.is_empty() { 0 } else { 2 };
            let block_chars = block.chars().count();

            if used + separator + block_chars <= self.char_budget {
                if separator > 0 {
                    text.push_str("\n\n");
                }
                text.push_str(&block);
                used += separator + block_chars;
                included += 1;
                continue;
            }

            let remaining = self.char_budget.saturating_sub(used + separator);
            if remaining > MIN_PARTIAL_BLOCK_CHARS {
                if separator > 0 {
                    text.push_str("\n\n");
                }
                text.push_str(&truncate_chars(&block, remaining));
                used += separator + remaining;
                included += 1;
            }
            break;
        }

        debug!(
            sources = sources.len(),
            included,
            chars = used,
            "Context assembled"
        );

        AssembledContext {
            text,
            sources_included: included,
            char_count: used,
        }
    }

    fn render_block(number: usize, source: &SearchResult) -> String {
        let mut block = format!("[{}] {}\nURL: {}", number, source.title.trim(), source.url);
        if let Some(date) = &source.published_date {
            block.push_str(&format!("\nPublished: {}", date));
        }
        if let Some(evidence) = &source.evidence {
            block.push_str(&format!("\nEvidence: {}", evidence));
        }
        if !source.snippet.trim().is_empty() {
            block.push_str(&format!("\nExcerpt: {}", source.snippet.trim()));
        }
        block
    }

    /// System instruction matching the numbering produced by [`assemble`](Self::assemble)
    pub fn system_instruction(&self, sources_included: usize) -> String {
        if sources_included == 0 {
            return "You are a careful research assistant. No web sources were found for this \
                question. Answer from general knowledge, say clearly that no sources were \
                available, and do not invent citations."
                .to_string();
        }

        format!(
            "You are a careful research assistant. Answer the user's question using the \
            {} numbered sources provided in the context. Cite every claim that relies on a \
            source with its number in square brackets, e.g. [1] or [2][3]. Only cite numbers \
            between 1 and {}. If the sources do not cover part of the question, say so.",
            sources_included, sources_included
        )
    }
}
