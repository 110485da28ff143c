pub mod gemini;
pub mod pipeline;
pub mod provider;
pub mod runtime;
pub mod session;

pub use gemini::GeminiClient;
pub use provider::{Generation, GenerationClient, ProviderError};
pub use runtime::AgentRuntime;
pub use session::ConversationSession;
