pub mod health;
pub mod tools;

pub use health::{health_handler, ready_handler, root_handler};
pub use tools::{delete_tool_handler, list_tools_handler, send_handler};
