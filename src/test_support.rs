//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

use crate::core::auth::AuthService;
use crate::core::library::ScriptLibrary;
use crate::core::state::App;
use crate::core::store::Store;
use crate::inference::{CompletionProvider, CompletionRequest, ProviderError, StreamChunk};

/// A no-op provider for tests that don't need real API calls.
pub struct NoopProvider;

#[async_trait]
impl CompletionProvider for NoopProvider {
    fn name(&self) -> &str {
        "noop"
    }

    async fn stream_completion(
        &self,
        _request: CompletionRequest<'_>,
        _sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Creates a test App with a NoopProvider.
pub fn test_app() -> App {
    App::new(Arc::new(NoopProvider), "test-model".to_string(), "You write Luau.")
}

/// Auth and library services sharing one in-memory store.
pub fn test_services() -> (AuthService, ScriptLibrary) {
    let store = Arc::new(Store::in_memory());
    (AuthService::new(store.clone()), ScriptLibrary::new(store))
}
