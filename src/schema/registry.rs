//! Versioned contracts for generated tool specifications.
//!
//! Each version is a superset of the previous one: required fields only grow,
//! and no input kind or category is ever withdrawn. Fields that a later
//! version requires are tolerated as optional by earlier ones, so records
//! generated under different versions can coexist in storage.

use crate::error::{AppError, Result};
use crate::schema::types::{InputKind, ToolCategory};
use serde_json::{json, Value};

pub const FIELD_TITLE: &str = "human_readable_function_title";
pub const FIELD_FUNCTION: &str = "function_title";
pub const FIELD_DESCRIPTION: &str = "function_description";
pub const FIELD_CODE: &str = "code";
pub const FIELD_INPUTS: &str = "inputs";
pub const FIELD_OUTPUT: &str = "output";
pub const FIELD_CATEGORY: &str = "tool_type";
pub const FIELD_MANUAL_RUN: &str = "requires_manual_run";

/// All top-level attributes known to any version, in prompt order.
const ALL_FIELDS: [&str; 8] = [
    FIELD_TITLE,
    FIELD_FUNCTION,
    FIELD_DESCRIPTION,
    FIELD_CODE,
    FIELD_INPUTS,
    FIELD_OUTPUT,
    FIELD_CATEGORY,
    FIELD_MANUAL_RUN,
];

/// Scalar kinds of the first schema: the legacy `int`/`string` pair and
/// their HTML spellings.
const V1_KINDS: [InputKind; 4] = [
    InputKind::Int,
    InputKind::String,
    InputKind::Text,
    InputKind::Number,
];

const HTML_KINDS: [InputKind; 20] = [
    InputKind::Button,
    InputKind::Checkbox,
    InputKind::Color,
    InputKind::Date,
    InputKind::DatetimeLocal,
    InputKind::Email,
    InputKind::File,
    InputKind::Hidden,
    InputKind::Image,
    InputKind::Month,
    InputKind::Password,
    InputKind::Radio,
    InputKind::Range,
    InputKind::Reset,
    InputKind::Search,
    InputKind::Submit,
    InputKind::Tel,
    InputKind::Time,
    InputKind::Url,
    InputKind::Week,
];

const V3_KINDS: [InputKind; 2] = [InputKind::Select, InputKind::Switch];

const MULTI_CHOICE_KINDS: [InputKind; 2] = [InputKind::Select, InputKind::Radio];

/// Attribute contract for one schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContract {
    pub version: u32,
    pub required_fields: Vec<&'static str>,
    pub optional_fields: Vec<&'static str>,
    pub input_kinds: Vec<InputKind>,
    /// Kinds that must carry a non-empty `options` list. Empty when the
    /// version has no notion of options.
    pub multi_choice_kinds: Vec<InputKind>,
    pub categories: Vec<ToolCategory>,
    pub supports_options: bool,
}

impl SchemaContract {
    pub fn requires(&self, field: &str) -> bool {
        self.required_fields.contains(&field)
    }

    pub fn allows_kind(&self, kind: InputKind) -> bool {
        self.input_kinds.contains(&kind)
    }

    pub fn is_multi_choice(&self, kind: InputKind) -> bool {
        self.multi_choice_kinds.contains(&kind)
    }

    /// JSON Schema describing the response shape for this version.
    ///
    /// Handed to the completion collaborator as a structured-output constraint.
    pub fn response_shape(&self) -> Value {
        let kinds: Vec<&str> = self.input_kinds.iter().map(InputKind::as_str).collect();

        let mut input_properties = json!({
            "type": { "type": "string", "enum": kinds },
            "human_readable_title": { "type": "string" },
        });
        if self.supports_options {
            input_properties["options"] = json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "value": { "type": "string" },
                    },
                    "required": ["label", "value"],
                },
            });
        }

        let mut properties = json!({
            FIELD_TITLE: { "type": "string" },
            FIELD_FUNCTION: { "type": "string" },
            FIELD_DESCRIPTION: { "type": "string" },
            FIELD_CODE: { "type": "string" },
            FIELD_INPUTS: {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": input_properties,
                    "required": ["type", "human_readable_title"],
                },
            },
            FIELD_OUTPUT: { "anyOf": [{ "type": "string" }, { "type": "integer" }] },
        });
        if self.requires(FIELD_CATEGORY) {
            let categories: Vec<&str> = self.categories.iter().map(ToolCategory::as_str).collect();
            properties[FIELD_CATEGORY] = json!({ "type": "string", "enum": categories });
        }
        if self.requires(FIELD_MANUAL_RUN) {
            properties[FIELD_MANUAL_RUN] = json!({ "type": "boolean" });
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_fields,
        })
    }
}

/// Lookup for the registered schema versions.
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub const VERSIONS: [u32; 3] = [1, 2, 3];
    pub const LATEST: u32 = 3;

    /// Contract for `version`, or `SchemaNotFoundError`.
    pub fn specification_for(version: u32) -> Result<SchemaContract> {
        if !Self::VERSIONS.contains(&version) {
            return Err(AppError::SchemaNotFoundError(version));
        }

        let mut required_fields = vec![
            FIELD_TITLE,
            FIELD_FUNCTION,
            FIELD_DESCRIPTION,
            FIELD_CODE,
            FIELD_INPUTS,
            FIELD_OUTPUT,
        ];
        let mut input_kinds = V1_KINDS.to_vec();
        let mut categories = Vec::new();

        if version >= 2 {
            required_fields.push(FIELD_CATEGORY);
            input_kinds.extend(HTML_KINDS);
            categories.extend(ToolCategory::ALL);
        }
        if version >= 3 {
            required_fields.push(FIELD_MANUAL_RUN);
            input_kinds.extend(V3_KINDS);
        }

        let supports_options = version >= 3;
        let optional_fields = ALL_FIELDS
            .into_iter()
            .filter(|f| !required_fields.contains(f))
            .collect();

        Ok(SchemaContract {
            version,
            required_fields,
            optional_fields,
            input_kinds,
            multi_choice_kinds: if supports_options {
                MULTI_CHOICE_KINDS.to_vec()
            } else {
                Vec::new()
            },
            categories,
            supports_options,
        })
    }
}
