//! Scout Context Engine
//!
//! The research layer between a user question and a generated answer:
//! - Query complexity analysis
//! - Task planning and multi-hop search execution
//! - Retrieval quality filtering and re-ranking
//! - Context assembly and citation validation
//! - Progress events for streaming clients

pub mod analyzer;
pub mod assembler;
pub mod events;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod quality;
pub mod scheduler;
pub mod validator;

mod text;

#[cfg(test)]
mod testing;

pub use analyzer::{AnalysisOutcome, Complexity, QueryAnalysis, QueryAnalyzer};
pub use assembler::{AssembledContext, ContextAssembler};
pub use events::{EventBus, EventEnvelope, EventRecorder, EventSink, PipelineEvent};
pub use executor::{HopRecord, MultiHopExecutor, MultiHopResult, StepProgress};
pub use pipeline::{ResearchAnswer, ResearchPipeline, ResearchRequest};
pub use planner::{Task, TaskPlanner};
pub use quality::{FilterReport, QualityFilter};
pub use validator::{check_response_quality, QualityCheckResult};
