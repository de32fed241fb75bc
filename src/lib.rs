//! Toolsmith - tool synthesis service
//!
//! Turns a natural-language request into a browser-side JavaScript function,
//! validates the generated specification against a versioned schema, and
//! stores it for later listing and deletion. The library exposes the pipeline
//! components so they can be driven directly by integration tests.

pub mod config;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod orchestrator;
pub mod persistence;
pub mod schema;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use generation::{CompletionProvider, GenerationAdapter, GenerationRequest, PromptBuilder};
pub use orchestrator::SynthesisOrchestrator;
pub use persistence::{SqliteToolRepository, ToolRepository};
pub use schema::{SchemaRegistry, ToolRecord, ToolSpecification};
pub use state::AppState;
