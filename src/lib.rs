//! MoodMatch
//!
//! Mood-based music recommendations: a free-text mood is embedded, matched
//! against an index of the listener's saved tracks, and handed to a chat model
//! that explains the matches and suggests new songs.

pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod mood;
pub mod parse;
pub mod pipeline;
pub mod retry;
pub mod server;
pub mod storage;
pub mod types;

pub use config::{AppConfig, PipelineMode, StorageMode};
pub use error::AppError;
pub use pipeline::{MoodSearchPipeline, PipelineError, SearchOutcome};
