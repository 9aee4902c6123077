pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{CompletionProvider, CompletionRequest, ProviderError};
pub use providers::{GeminiProvider, OpenRouterProvider};
pub use types::{Context, ContextSegment, Source, StreamChunk};
