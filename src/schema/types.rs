use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every input kind any schema version has ever allowed.
///
/// Which subset is valid is decided per version by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    Int,
    String,
    Button,
    Checkbox,
    Color,
    Date,
    DatetimeLocal,
    Email,
    File,
    Hidden,
    Image,
    Month,
    Number,
    Password,
    Radio,
    Range,
    Reset,
    Search,
    Submit,
    Tel,
    Text,
    Time,
    Url,
    Week,
    Select,
    Switch,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Int => "int",
            InputKind::String => "string",
            InputKind::Button => "button",
            InputKind::Checkbox => "checkbox",
            InputKind::Color => "color",
            InputKind::Date => "date",
            InputKind::DatetimeLocal => "datetime-local",
            InputKind::Email => "email",
            InputKind::File => "file",
            InputKind::Hidden => "hidden",
            InputKind::Image => "image",
            InputKind::Month => "month",
            InputKind::Number => "number",
            InputKind::Password => "password",
            InputKind::Radio => "radio",
            InputKind::Range => "range",
            InputKind::Reset => "reset",
            InputKind::Search => "search",
            InputKind::Submit => "submit",
            InputKind::Tel => "tel",
            InputKind::Text => "text",
            InputKind::Time => "time",
            InputKind::Url => "url",
            InputKind::Week => "week",
            InputKind::Select => "select",
            InputKind::Switch => "switch",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of tool categories (`tool_type` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolCategory {
    Crypto,
    Converter,
    Web,
    #[serde(rename = "Images & Videos")]
    ImagesVideos,
    Development,
    Network,
    Math,
    Measurement,
    Text,
    Data,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 10] = [
        ToolCategory::Crypto,
        ToolCategory::Converter,
        ToolCategory::Web,
        ToolCategory::ImagesVideos,
        ToolCategory::Development,
        ToolCategory::Network,
        ToolCategory::Math,
        ToolCategory::Measurement,
        ToolCategory::Text,
        ToolCategory::Data,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Crypto => "Crypto",
            ToolCategory::Converter => "Converter",
            ToolCategory::Web => "Web",
            ToolCategory::ImagesVideos => "Images & Videos",
            ToolCategory::Development => "Development",
            ToolCategory::Network => "Network",
            ToolCategory::Math => "Math",
            ToolCategory::Measurement => "Measurement",
            ToolCategory::Text => "Text",
            ToolCategory::Data => "Data",
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ToolCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown tool category '{}'", s))
    }
}

/// One choice of a multi-choice input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputField {
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub human_readable_title: String,
    /// `None` means the field was absent, which is distinct from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ToolOption>>,
}

/// Declared return value of a generated tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Integer(i64),
    Text(String),
}

impl ToolOutput {
    /// Text form used by storage. Integers lose their numeric type here.
    pub fn to_storage_text(&self) -> String {
        match self {
            ToolOutput::Integer(n) => n.to_string(),
            ToolOutput::Text(s) => s.clone(),
        }
    }
}

/// A validated generation candidate, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpecification {
    #[serde(rename = "human_readable_function_title")]
    pub human_readable_title: String,
    #[serde(rename = "function_title")]
    pub function_name: String,
    #[serde(rename = "function_description")]
    pub description: String,
    pub code: String,
    pub inputs: Vec<InputField>,
    pub output: ToolOutput,
    #[serde(rename = "tool_type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ToolCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_manual_run: Option<bool>,
}

/// A stored tool. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: i64,
    /// Schema version in force when the tool was generated.
    pub schema_version: u32,
    #[serde(rename = "human_readable_function_title")]
    pub human_readable_title: String,
    #[serde(rename = "function_title")]
    pub function_name: String,
    #[serde(rename = "function_description")]
    pub description: String,
    pub code: String,
    pub inputs: Vec<InputField>,
    pub output: String,
    #[serde(rename = "tool_type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ToolCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_manual_run: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_kind_wire_names_match_as_str() {
        for kind in [
            InputKind::Int,
            InputKind::DatetimeLocal,
            InputKind::Select,
            InputKind::Text,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_category_round_trips_through_text() {
        for category in ToolCategory::ALL {
            assert_eq!(category.as_str().parse::<ToolCategory>(), Ok(category));
            assert_eq!(serde_json::to_value(category).unwrap(), json!(category.as_str()));
        }
        assert!("Cooking".parse::<ToolCategory>().is_err());
    }

    #[test]
    fn test_output_accepts_string_or_integer_only() {
        assert_eq!(
            serde_json::from_value::<ToolOutput>(json!(7)).unwrap(),
            ToolOutput::Integer(7)
        );
        assert_eq!(
            serde_json::from_value::<ToolOutput>(json!("done")).unwrap(),
            ToolOutput::Text("done".into())
        );
        assert!(serde_json::from_value::<ToolOutput>(json!(1.5)).is_err());
        assert!(serde_json::from_value::<ToolOutput>(json!(["a"])).is_err());
    }

    #[test]
    fn test_output_storage_text() {
        assert_eq!(ToolOutput::Integer(42).to_storage_text(), "42");
        assert_eq!(ToolOutput::Text("ok".into()).to_storage_text(), "ok");
    }

    #[test]
    fn test_absent_options_are_not_serialized() {
        let field = InputField {
            kind: InputKind::Text,
            human_readable_title: "Name".into(),
            options: None,
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value, json!({"type": "text", "human_readable_title": "Name"}));

        let empty = InputField {
            options: Some(vec![]),
            ..field
        };
        assert_eq!(serde_json::to_value(&empty).unwrap()["options"], json!([]));
    }
}
