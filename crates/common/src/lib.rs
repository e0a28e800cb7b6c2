//! Scout Common Library
//!
//! Shared code for the Scout research pipeline including:
//! - Search provider abstraction and clients
//! - Language-generation client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod search;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::LanguageModel;
pub use search::{SearchProvider, SearchResponse, SearchResult};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
