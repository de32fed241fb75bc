pub mod adapter;
pub mod prompt;
pub mod provider;

pub use adapter::{validate_candidate, GenerationAdapter};
pub use prompt::{GenerationRequest, PromptBuilder};
pub use provider::{CompletionProvider, OpenAiCompatibleProvider};
