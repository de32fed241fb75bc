//! Calls the completion collaborator and validates what comes back.
//!
//! Nothing here retries: unavailable backends and invalid candidates are both
//! terminal for the current request.

use crate::error::{AppError, Result};
use crate::generation::prompt::GenerationRequest;
use crate::generation::provider::CompletionProvider;
use crate::schema::registry::{FIELD_CATEGORY, FIELD_INPUTS};
use crate::schema::{SchemaContract, SchemaRegistry, ToolSpecification};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

static FUNCTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("function name pattern is valid")
});

static OPTION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[_-][a-z0-9]+)*$").expect("option value pattern is valid")
});

pub struct GenerationAdapter {
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
}

impl GenerationAdapter {
    pub fn new(provider: Arc<dyn CompletionProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Run one generation round trip and validate the candidate.
    ///
    /// # Errors
    /// - `GenerationUnavailableError` if the provider fails, times out, or
    ///   returns no content.
    /// - `MalformedOutputError` if the content does not satisfy the contract.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<ToolSpecification> {
        let contract = SchemaRegistry::specification_for(request.schema_version)?;
        let start = Instant::now();

        let content = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                AppError::GenerationUnavailableError(format!(
                    "Generation timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        metrics::histogram!("generation_latency_ms").record(start.elapsed().as_millis() as f64);

        let content = match content {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                return Err(AppError::GenerationUnavailableError(
                    "Completion returned no content".to_string(),
                ))
            }
        };

        tracing::debug!(
            bytes = content.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );

        validate_candidate(&content, &contract)
    }
}

/// Parse raw model output and check it against `contract`.
pub fn validate_candidate(raw: &str, contract: &SchemaContract) -> Result<ToolSpecification> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| malformed(format!("output is not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| malformed("output is not a JSON object".to_string()))?;

    let missing: Vec<&str> = contract
        .required_fields
        .iter()
        .copied()
        .filter(|field| object.get(*field).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(malformed(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    // A null `options` would deserialize to `None` and vanish.
    if let Some(inputs) = object.get(FIELD_INPUTS).and_then(Value::as_array) {
        if let Some(index) = inputs
            .iter()
            .position(|input| input.get("options").is_some_and(Value::is_null))
        {
            return Err(malformed(format!(
                "inputs[{}]: options must be omitted or a list, not null",
                index
            )));
        }
    }

    let spec: ToolSpecification = serde_json::from_value(value)
        .map_err(|e| malformed(format!("output does not match the tool shape: {}", e)))?;

    check_spec(&spec, contract)?;
    Ok(spec)
}

fn check_spec(spec: &ToolSpecification, contract: &SchemaContract) -> Result<()> {
    if !FUNCTION_NAME.is_match(&spec.function_name) {
        return Err(malformed(format!(
            "'{}' is not a valid function identifier",
            spec.function_name
        )));
    }

    if let Some(category) = spec.category {
        if contract.requires(FIELD_CATEGORY) && !contract.categories.contains(&category) {
            return Err(malformed(format!(
                "category '{}' is not allowed in schema v{}",
                category, contract.version
            )));
        }
    }

    for (index, input) in spec.inputs.iter().enumerate() {
        if !contract.allows_kind(input.kind) {
            return Err(malformed(format!(
                "inputs[{}]: type '{}' is not allowed in schema v{}",
                index, input.kind, contract.version
            )));
        }

        match (&input.options, contract.is_multi_choice(input.kind)) {
            (None, true) => {
                return Err(malformed(format!(
                    "inputs[{}]: '{}' input requires options",
                    index, input.kind
                )))
            }
            (Some(options), true) => {
                if options.is_empty() {
                    return Err(malformed(format!(
                        "inputs[{}]: '{}' input has an empty options list",
                        index, input.kind
                    )));
                }
                if let Some(bad) = options.iter().find(|o| !OPTION_VALUE.is_match(&o.value)) {
                    return Err(malformed(format!(
                        "inputs[{}]: option value '{}' must be a lowercase token",
                        index, bad.value
                    )));
                }
            }
            (Some(_), false) => {
                return Err(malformed(format!(
                    "inputs[{}]: '{}' input cannot carry options",
                    index, input.kind
                )))
            }
            (None, false) => {}
        }
    }

    Ok(())
}

/// Strip a single surrounding Markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

fn malformed(message: String) -> AppError {
    AppError::MalformedOutputError(message)
}
