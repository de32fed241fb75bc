//! Deterministic construction of generation requests.
//!
//! The instruction text encodes every constraint the active schema enforces;
//! the response shape is the registry's JSON Schema for the same version.

use crate::error::{AppError, Result};
use crate::schema::registry::{
    FIELD_CATEGORY, FIELD_CODE, FIELD_DESCRIPTION, FIELD_FUNCTION, FIELD_INPUTS,
    FIELD_MANUAL_RUN, FIELD_OUTPUT, FIELD_TITLE,
};
use crate::schema::{SchemaContract, SchemaRegistry};
use serde_json::Value;

/// A prompt plus the structured-output constraint for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub schema_version: u32,
    pub instructions: String,
    pub response_shape: Value,
}

const CODE_RULES: &str = "\
Write a complete browser-safe JavaScript function based on the user's query. The function must follow these rules:

1. Dynamically load any required external libraries by injecting a `<script>` tag into the document.
   - Only inject the script if it is not already loaded.
   - For example, to load QRCode.js: `https://cdn.jsdelivr.net/gh/davidshimjs/qrcodejs/qrcode.min.js`
   - Use the global object (e.g. `window.QRCode`) to access libraries.

2. Do not use or require an element ID input.
   - The function must not depend on or modify the DOM unless absolutely necessary.
   - If a visual result (image, chart) must be created, use a temporary off-screen element or canvas internally.

3. The function must return meaningful, serializable output:
   - For visual elements such as QR codes or charts, return the image or canvas content as a `data:image/png;base64,...` string using `.toDataURL()`.
   - For calculations or text generation, return the result as a string, number, or array.
   - If an error occurs, return a string like `\"Error: ...\"` instead of throwing.

4. Only use browser-safe JavaScript.
   - Do not use `require()`, `import`, `fs`, or any Node.js-specific features.
   - The code must run in a browser context.

5. Handle all async operations (loading scripts, rendering canvases) with `await` or `Promise`.

Always write clean, readable JavaScript with useful return values. Do not inject content into the page unless explicitly instructed.
";

/// Builds generation requests for a fixed schema version.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    contract: SchemaContract,
}

impl PromptBuilder {
    pub fn new(schema_version: u32) -> Result<Self> {
        Ok(Self {
            contract: SchemaRegistry::specification_for(schema_version)?,
        })
    }

    pub fn contract(&self) -> &SchemaContract {
        &self.contract
    }

    /// Build the request for `query`.
    ///
    /// # Errors
    /// `InvalidQueryError` when the query is empty or whitespace.
    pub fn build(&self, query: &str) -> Result<GenerationRequest> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidQueryError(
                "Query cannot be empty".to_string(),
            ));
        }

        Ok(GenerationRequest {
            schema_version: self.contract.version,
            instructions: self.instructions(query),
            response_shape: self.contract.response_shape(),
        })
    }

    fn instructions(&self, query: &str) -> String {
        let contract = &self.contract;
        let mut text = format!("Analyze the query: {}\n\n", query);
        text.push_str(CODE_RULES);

        text.push_str("\nInputs:\n");
        let kinds: Vec<&str> = contract.input_kinds.iter().map(|k| k.as_str()).collect();
        text.push_str(&format!(
            "- Each input has a `type` (one of: {}) and a `human_readable_title`.\n",
            kinds.join(", ")
        ));
        text.push_str("- The function takes its arguments in the same order as `inputs`.\n");
        if contract.supports_options {
            let multi: Vec<&str> = contract
                .multi_choice_kinds
                .iter()
                .map(|k| k.as_str())
                .collect();
            text.push_str(&format!(
                "- Inputs of type {} must include a non-empty `options` list of {{`label`, `value`}} pairs; \
                 each `value` is a short lowercase token (letters, digits, `-` or `_`).\n",
                multi.join(" or ")
            ));
            text.push_str("- No other input type may include `options`.\n");
        }

        text.push_str("\nRequired return format:\n");
        let fields: Vec<String> = contract
            .required_fields
            .iter()
            .map(|field| format!("- `{}`: {}\n", field, self.describe(field)))
            .collect();
        text.push_str(&fields.concat());

        text
    }

    fn describe(&self, field: &str) -> String {
        match field {
            FIELD_TITLE => "a short human readable title for the tool".to_string(),
            FIELD_FUNCTION => {
                "the exact name of the function, a valid JavaScript identifier used in `code`"
                    .to_string()
            }
            FIELD_DESCRIPTION => "a short explanation of what the function does".to_string(),
            FIELD_CODE => "the complete and functional JavaScript function".to_string(),
            FIELD_INPUTS => "list of inputs required by the function".to_string(),
            FIELD_OUTPUT => {
                "expected result, a string or integer (example: \"QR code generated!\")"
                    .to_string()
            }
            FIELD_CATEGORY => {
                let names: Vec<&str> = self.contract.categories.iter().map(|c| c.as_str()).collect();
                format!("the tool category, one of: {}", names.join(", "))
            }
            FIELD_MANUAL_RUN => {
                "true if the tool cannot produce its result unattended (for example it needs a \
                 file upload, a button press, or a user permission prompt), otherwise false"
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::new(3).unwrap();
        let a = builder.build("convert celsius to fahrenheit").unwrap();
        let b = builder.build("convert celsius to fahrenheit").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_rejects_blank_queries() {
        let builder = PromptBuilder::new(3).unwrap();
        for query in ["", "   ", "\n\t"] {
            assert!(matches!(
                builder.build(query),
                Err(AppError::InvalidQueryError(_))
            ));
        }
    }

    #[test]
    fn test_instructions_name_every_required_field() {
        for version in SchemaRegistry::VERSIONS {
            let builder = PromptBuilder::new(version).unwrap();
            let request = builder.build("make a qr code").unwrap();
            assert_eq!(request.schema_version, version);
            assert!(request.instructions.contains("Analyze the query: make a qr code"));
            for field in &builder.contract().required_fields {
                assert!(
                    request.instructions.contains(&format!("`{}`", field)),
                    "v{} prompt misses {}",
                    version,
                    field
                );
            }
        }
    }

    #[test]
    fn test_instructions_encode_browser_constraints() {
        let request = PromptBuilder::new(2).unwrap().build("draw a chart").unwrap();
        assert!(request.instructions.contains("browser-safe"));
        assert!(request.instructions.contains("element ID"));
        assert!(request.instructions.contains("<script>"));
        assert!(request.instructions.contains("Images & Videos"));
        assert!(!request.instructions.contains("`options`"));
    }

    #[test]
    fn test_v3_mentions_options() {
        let request = PromptBuilder::new(3).unwrap().build("pick a unit").unwrap();
        assert!(request.instructions.contains("select or radio"));
        assert!(request.instructions.contains("requires_manual_run"));
    }

    #[test]
    fn test_return_format_has_one_line_per_field() {
        let builder = PromptBuilder::new(1).unwrap();
        let request = builder.build("reverse a string").unwrap();
        let (_, format) = request
            .instructions
            .split_once("Required return format:\n")
            .unwrap();

        let lines: Vec<&str> = format.lines().collect();
        assert_eq!(lines.len(), builder.contract().required_fields.len());
        assert!(lines[0].starts_with("- `human_readable_function_title`: "));
        assert!(request.instructions.ends_with('\n'));
    }

    #[test]
    fn test_unknown_version() {
        assert!(matches!(
            PromptBuilder::new(7),
            Err(AppError::SchemaNotFoundError(7))
        ));
    }
}
