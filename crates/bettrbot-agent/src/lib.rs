pub mod gemini;
pub mod intent;
pub mod pipeline;
pub mod provider;
pub mod runtime;
pub mod sanitize;

pub use pipeline::{ChatReply, Coach};
pub use provider::{LlmProvider, ProviderError};
pub use runtime::AgentRuntime;
