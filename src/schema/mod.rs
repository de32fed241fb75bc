//! Schema registry and the data model of generated tools.

pub mod registry;
pub mod types;

pub use registry::{SchemaContract, SchemaRegistry};
pub use types::{
    InputField, InputKind, ToolCategory, ToolOption, ToolOutput, ToolRecord, ToolSpecification,
};
