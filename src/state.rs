use crate::config::Config;
use crate::error::Result;
use crate::generation::{GenerationAdapter, OpenAiCompatibleProvider, PromptBuilder};
use crate::orchestrator::SynthesisOrchestrator;
use crate::persistence::SqliteToolRepository;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all request handlers.
pub struct AppState {
    pub orchestrator: Arc<SynthesisOrchestrator>,
}

impl AppState {
    /// Build the pipeline from a validated configuration.
    ///
    /// Order: schema contract, storage, completion client, orchestrator.
    pub fn new(config: &Config) -> Result<Self> {
        let prompts = PromptBuilder::new(config.schema_version)?;
        tracing::info!(schema_version = config.schema_version, "Schema contract loaded");

        let repository = SqliteToolRepository::open(&config.database_url)?;

        let provider = OpenAiCompatibleProvider::new(&config.llm)?;
        tracing::info!(model = %config.llm.model, "Completion client configured");

        let generator = GenerationAdapter::new(
            Arc::new(provider),
            Duration::from_secs(config.llm.timeout_secs),
        );

        Ok(Self::with_orchestrator(SynthesisOrchestrator::new(
            prompts,
            generator,
            Arc::new(repository),
        )))
    }

    /// Wrap an already assembled orchestrator.
    pub fn with_orchestrator(orchestrator: SynthesisOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Ready while the tool store answers a round trip.
    pub async fn is_ready(&self) -> bool {
        match self.orchestrator.check_storage().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                false
            }
        }
    }
}
