//! Synthesis pipeline: prompt, generate, validate, persist.

use crate::error::Result;
use crate::generation::{GenerationAdapter, PromptBuilder};
use crate::persistence::ToolRepository;
use crate::schema::ToolRecord;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Coordinates one query through the pipeline and forwards list/delete calls.
///
/// The only state held is the schema version chosen at startup.
pub struct SynthesisOrchestrator {
    prompts: PromptBuilder,
    generator: GenerationAdapter,
    repository: Arc<dyn ToolRepository>,
}

impl SynthesisOrchestrator {
    pub fn new(
        prompts: PromptBuilder,
        generator: GenerationAdapter,
        repository: Arc<dyn ToolRepository>,
    ) -> Self {
        Self {
            prompts,
            generator,
            repository,
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.prompts.contract().version
    }

    /// Generate a tool for `query` and store it.
    ///
    /// Every component failure is returned unchanged. The repository is only
    /// touched once a fully validated candidate exists.
    pub async fn synthesize(&self, query: &str) -> Result<ToolRecord> {
        let request_id = Uuid::new_v4();
        let start = Instant::now();
        metrics::counter!("synthesize_requests_total").increment(1);

        let result = self.run_pipeline(query).await;

        match &result {
            Ok(record) => tracing::info!(
                %request_id,
                tool_id = record.id,
                function = %record.function_name,
                schema_version = record.schema_version,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Tool synthesized"
            ),
            Err(e) => {
                metrics::counter!("synthesize_failures_total", "kind" => e.kind()).increment(1);
                tracing::warn!(
                    %request_id,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Tool synthesis failed"
                );
            }
        }

        result
    }

    async fn run_pipeline(&self, query: &str) -> Result<ToolRecord> {
        let request = self.prompts.build(query)?;
        let spec = self.generator.generate(&request).await?;
        self.repository.create(spec, request.schema_version).await
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolRecord>> {
        self.repository.list().await
    }

    pub async fn check_storage(&self) -> Result<()> {
        self.repository.ping().await
    }

    /// Returns `false` when no tool had `id`; that is not an error.
    pub async fn delete_tool(&self, id: i64) -> Result<bool> {
        let removed = self.repository.delete_by_id(id).await?;
        if removed {
            metrics::counter!("tools_deleted_total").increment(1);
        }
        tracing::debug!(id, removed, "Delete requested");
        Ok(removed)
    }
}
